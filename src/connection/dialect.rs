use crate::core::{Result, StorageError, Value};
use std::fmt;

/// SQL dialect spoken by the backing store.
///
/// Resolved once per table binding from the connection's driver name and used
/// wherever the generated SQL differs between stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    MySql,
    Postgres,
    Sqlite,
}

impl Dialect {
    pub fn from_driver_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "pgsql" | "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            other => Err(StorageError::Configuration(format!(
                "Unsupported driver '{}'",
                other
            ))),
        }
    }

    pub fn driver_name(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "pgsql",
            Self::Sqlite => "sqlite",
        }
    }

    /// Quote an identifier. Callers validate identifiers before they get here.
    pub fn quote(&self, identifier: &str) -> String {
        match self {
            Self::MySql => format!("`{}`", identifier),
            Self::Postgres | Self::Sqlite => format!("\"{}\"", identifier),
        }
    }

    /// Whether inserts report the generated key inline with `RETURNING`
    /// instead of a separate last-insert-id lookup.
    pub fn uses_returning(&self) -> bool {
        matches!(self, Self::Postgres | Self::Sqlite)
    }

    /// Whether secondary indexes are declared inside `CREATE TABLE`.
    pub fn inline_indexes(&self) -> bool {
        matches!(self, Self::MySql)
    }

    /// Statement probing for a table by name. Returns one row when it exists.
    pub fn table_probe(&self, table: &str) -> (String, Vec<Value>) {
        let sql = match self {
            Self::MySql => "SHOW TABLES LIKE ?",
            Self::Postgres => {
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name = ?"
            }
            Self::Sqlite => "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
        };
        (sql.to_string(), vec![Value::from(table)])
    }

    /// Statement describing a table's columns.
    ///
    /// MySQL and PostgreSQL rows carry `Field`, `Type`, `Key` and `Extra`;
    /// SQLite rows are `PRAGMA table_info` rows.
    pub fn describe(&self, table: &str) -> (String, Vec<Value>) {
        match self {
            Self::MySql => (format!("DESCRIBE {}", self.quote(table)), Vec::new()),
            Self::Postgres => (
                "SELECT c.column_name AS \"Field\", c.data_type AS \"Type\", \
                 CASE WHEN k.column_name IS NOT NULL THEN 'PRI' ELSE '' END AS \"Key\", \
                 CASE WHEN c.column_default LIKE 'nextval(%' OR c.is_identity = 'YES' \
                 THEN 'auto_increment' ELSE '' END AS \"Extra\" \
                 FROM information_schema.columns c \
                 LEFT JOIN information_schema.table_constraints tc \
                 ON tc.table_schema = c.table_schema AND tc.table_name = c.table_name \
                 AND tc.constraint_type = 'PRIMARY KEY' \
                 LEFT JOIN information_schema.key_column_usage k \
                 ON k.constraint_name = tc.constraint_name AND k.table_schema = c.table_schema \
                 AND k.column_name = c.column_name \
                 WHERE c.table_schema = current_schema() AND c.table_name = ? \
                 ORDER BY c.ordinal_position"
                    .to_string(),
                vec![Value::from(table)],
            ),
            Self::Sqlite => (format!("PRAGMA table_info({})", self.quote(table)), Vec::new()),
        }
    }

    pub fn truncate(&self, table: &str) -> String {
        match self {
            Self::MySql => format!("TRUNCATE {}", self.quote(table)),
            Self::Postgres => format!("TRUNCATE TABLE {}", self.quote(table)),
            Self::Sqlite => format!("DELETE FROM {}", self.quote(table)),
        }
    }

    pub fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote(table))
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.driver_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_names() {
        assert_eq!(Dialect::from_driver_name("pgsql").unwrap(), Dialect::Postgres);
        assert_eq!(Dialect::from_driver_name("MySQL").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::from_driver_name("sqlite").unwrap(), Dialect::Sqlite);
        assert!(Dialect::from_driver_name("oracle").is_err());
    }

    #[test]
    fn test_quoting() {
        assert_eq!(Dialect::MySql.quote("docs"), "`docs`");
        assert_eq!(Dialect::Postgres.quote("docs"), "\"docs\"");
    }

    #[test]
    fn test_returning_support() {
        assert!(Dialect::Postgres.uses_returning());
        assert!(!Dialect::MySql.uses_returning());
    }

    #[test]
    fn test_table_probe_binds_name() {
        let (sql, params) = Dialect::MySql.table_probe("docs");
        assert_eq!(sql, "SHOW TABLES LIKE ?");
        assert_eq!(params, vec![Value::from("docs")]);
    }
}
