use super::column::ColumnDescriptor;
use super::query::QueryBuilder;
use crate::connection::{Connection, Dialect};
use crate::core::{Result, StorageError};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Table and column names are spliced into SQL, so they are restricted to
/// plain identifiers.
pub fn validate_identifier(name: &str) -> Result<()> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(StorageError::InvalidIdentifier(name.to_string()))
    }
}

/// Declarative description of one table: its name, primary key, the other
/// columns and which of them get a secondary index.
#[derive(Debug, Clone)]
pub struct TableConfig {
    pub table: String,
    pub primary_key: Arc<dyn ColumnDescriptor>,
    pub columns: Vec<Arc<dyn ColumnDescriptor>>,
    pub indexes: Vec<String>,
}

impl TableConfig {
    pub fn new(table: &str, primary_key: impl ColumnDescriptor + 'static) -> Self {
        Self {
            table: table.to_string(),
            primary_key: Arc::new(primary_key),
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Add a column
    pub fn column(mut self, column: impl ColumnDescriptor + 'static) -> Self {
        self.columns.push(Arc::new(column));
        self
    }

    /// Declare a secondary index on an already declared column
    pub fn index(mut self, column: &str) -> Self {
        self.indexes.push(column.to_string());
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.table)?;

        let mut seen = HashSet::new();
        for column in std::iter::once(&self.primary_key).chain(self.columns.iter()) {
            validate_identifier(column.name())?;

            if column.describe().trim().is_empty() {
                return Err(StorageError::Configuration(format!(
                    "Column '{}' of table '{}' has no definition",
                    column.name(),
                    self.table
                )));
            }

            if !seen.insert(column.name()) {
                return Err(StorageError::Configuration(format!(
                    "Column '{}' is declared twice in table '{}'",
                    column.name(),
                    self.table
                )));
            }
        }

        for index in &self.indexes {
            if !seen.contains(index.as_str()) {
                return Err(StorageError::Configuration(format!(
                    "Index on undeclared column '{}' in table '{}'",
                    index, self.table
                )));
            }
        }

        Ok(())
    }
}

/// A validated table configuration bound to a connection.
///
/// The dialect is resolved from the connection once, at bind time.
#[derive(Clone)]
pub struct TableBinding {
    config: TableConfig,
    connection: Arc<dyn Connection>,
    dialect: Dialect,
}

impl TableBinding {
    pub fn new(config: TableConfig, connection: Arc<dyn Connection>) -> Result<Self> {
        config.validate()?;
        let dialect = connection.dialect()?;

        Ok(Self {
            config,
            connection,
            dialect,
        })
    }

    pub fn table(&self) -> &str {
        &self.config.table
    }

    pub fn primary_key(&self) -> &dyn ColumnDescriptor {
        self.config.primary_key.as_ref()
    }

    pub fn columns(&self) -> &[Arc<dyn ColumnDescriptor>] {
        &self.config.columns
    }

    pub fn indexes(&self) -> &[String] {
        &self.config.indexes
    }

    pub fn connection(&self) -> &dyn Connection {
        self.connection.as_ref()
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self.dialect, self.table(), self.primary_key().name())
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }
}

impl fmt::Debug for TableBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableBinding")
            .field("table", &self.config.table)
            .field("primary_key", &self.config.primary_key.name())
            .field("dialect", &self.dialect)
            .finish()
    }
}
