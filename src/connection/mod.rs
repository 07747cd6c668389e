pub mod config;
pub mod dialect;
pub mod sqlite;

use crate::core::{Record, Result, Value};

pub use config::ConnectionConfig;
pub use dialect::Dialect;
pub use sqlite::SqliteConnection;

/// Driver attributes a connection can report.
///
/// Mirrors the handful of driver attributes the storage engine branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    /// Driver identifier such as `mysql`, `pgsql` or `sqlite`
    DriverName,
    ServerVersion,
    ClientVersion,
}

/// Database connection handle
///
/// Executes parameterized statements against a backing relational store.
/// Placeholders are written as `?` regardless of the driver; implementations
/// translate them when the driver expects another syntax.
///
/// Every method may fail and implementations report backing-store errors
/// instead of swallowing them. A primary-key or unique violation must be
/// reported as [`StorageError::ConstraintViolation`](crate::StorageError::ConstraintViolation)
/// so the storage engine can treat it as "already exists".
pub trait Connection: Send + Sync {
    /// Execute a statement that returns no rows, returning the affected row count.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Execute a query and collect every row keyed by column name.
    fn fetch(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>>;

    /// Retrieve a driver attribute.
    fn attribute(&self, attribute: Attribute) -> Result<Value>;

    /// Identifier generated by the most recent insert on this connection.
    fn last_insert_id(&self) -> Result<Value>;

    /// Resolve the SQL dialect from the reported driver name.
    fn dialect(&self) -> Result<Dialect> {
        let driver = self.attribute(Attribute::DriverName)?;
        Dialect::from_driver_name(&driver.to_string())
    }
}
