use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use log::info;
use std::sync::Arc;
use tablestore::{
    ConnectionConfig, DocumentConfig, DocumentStore, SqliteConnection, StorageEngine, Value,
};

#[derive(Parser)]
#[command(name = "tablestore")]
#[command(about = "Document storage on a relational table")]
struct Cli {
    /// Database URL: `sqlite://path`, a bare path or `sqlite::memory:`
    #[arg(long, default_value = "sqlite::memory:")]
    database: String,

    #[arg(long, default_value = "documents")]
    table: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the document table if absent
    Setup,
    /// Drop the document table
    Teardown,
    /// Remove every document
    Truncate,
    /// Store a JSON object under a fresh key and print the key
    Store { document: String },
    /// Print the document stored under a key
    Get {
        key: String,
        /// Include key and timestamps
        #[arg(long)]
        full: bool,
    },
    /// Delete the document stored under a key
    Delete { key: String },
    /// Exit with status 1 when no document has the key
    Exists { key: String },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let config = ConnectionConfig::from_url(&cli.database)
        .map_err(|err| anyhow!("invalid database url '{}': {}", cli.database, err))?;
    let connection = Arc::new(
        SqliteConnection::open(config)
            .with_context(|| format!("failed to open '{}'", cli.database))?,
    );
    let store = DocumentStore::new(DocumentConfig::new(&cli.table), connection)?;

    match cli.command {
        Command::Setup => {
            if !store.setup()? {
                bail!("table '{}' is unusable after setup", cli.table);
            }
            info!("Table '{}' ready", cli.table);
        }
        Command::Teardown => store.teardown()?,
        Command::Truncate => store.truncate()?,
        Command::Store { document } => {
            let document: serde_json::Value =
                serde_json::from_str(&document).context("document is not valid JSON")?;
            store.ensure_table()?;
            println!("{}", store.store(document)?);
        }
        Command::Get { key, full } => {
            let key = Value::from(key);
            let output = if full {
                store.get_document(&key)?.map(serde_json::to_value).transpose()?
            } else {
                store.get(&key)?
            };
            match output {
                Some(document) => println!("{}", serde_json::to_string_pretty(&document)?),
                None => bail!("no document with key '{}'", key),
            }
        }
        Command::Delete { key } => match store.delete(&Value::from(key.as_str()))? {
            Some(true) => println!("deleted"),
            Some(false) => bail!("document '{}' was not removed", key),
            None => bail!("no document with key '{}'", key),
        },
        Command::Exists { key } => {
            if !store.exists(&Value::from(key))? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
