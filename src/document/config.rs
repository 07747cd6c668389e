use crate::core::{Result, StorageError};
use crate::storage::{ColumnDef, TableConfig};
use serde::{Deserialize, Serialize};

/// Layout of a document table: a key, two timestamps and a body.
///
/// Every column has a default, so a config can be as small as the table name:
///
/// ```
/// use tablestore::DocumentConfig;
///
/// let config: DocumentConfig = serde_json::from_str(r#"{"table": "notes"}"#).unwrap();
/// assert_eq!(config.primary_key.name, "id");
/// assert_eq!(config.max_store_attempts, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentConfig {
    pub table: String,

    #[serde(default = "default_primary_key")]
    pub primary_key: ColumnDef,

    #[serde(default = "default_created")]
    pub created: ColumnDef,

    #[serde(default = "default_updated")]
    pub updated: ColumnDef,

    #[serde(default = "default_body")]
    pub body: ColumnDef,

    /// Fresh keys tried by `store` before a collision is reported. 1 disables retries.
    #[serde(default = "default_max_store_attempts")]
    pub max_store_attempts: u32,
}

fn default_primary_key() -> ColumnDef {
    ColumnDef::new("id", "CHAR(32) NOT NULL")
}

fn default_created() -> ColumnDef {
    ColumnDef::new("created", "BIGINT NOT NULL")
}

fn default_updated() -> ColumnDef {
    ColumnDef::new("updated", "BIGINT NOT NULL")
}

fn default_body() -> ColumnDef {
    ColumnDef::new("body", "TEXT NOT NULL")
}

const fn default_max_store_attempts() -> u32 {
    3
}

impl DocumentConfig {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            primary_key: default_primary_key(),
            created: default_created(),
            updated: default_updated(),
            body: default_body(),
            max_store_attempts: default_max_store_attempts(),
        }
    }

    pub fn primary_key(mut self, column: ColumnDef) -> Self {
        self.primary_key = column;
        self
    }

    pub fn created(mut self, column: ColumnDef) -> Self {
        self.created = column;
        self
    }

    pub fn updated(mut self, column: ColumnDef) -> Self {
        self.updated = column;
        self
    }

    pub fn body(mut self, column: ColumnDef) -> Self {
        self.body = column;
        self
    }

    pub fn max_store_attempts(mut self, attempts: u32) -> Self {
        self.max_store_attempts = attempts;
        self
    }

    /// Table binding for the four document columns, with both timestamps indexed.
    pub fn to_table_config(&self) -> TableConfig {
        TableConfig::new(&self.table, self.primary_key.clone())
            .column(self.created.clone())
            .column(self.updated.clone())
            .column(self.body.clone())
            .index(&self.created.name)
            .index(&self.updated.name)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_store_attempts == 0 {
            return Err(StorageError::Configuration(
                "max_store_attempts must be > 0".to_string(),
            ));
        }

        self.to_table_config().validate()
    }
}
