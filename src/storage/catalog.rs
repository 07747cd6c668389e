use crate::connection::Dialect;
use crate::core::{Record, Result, StorageError, Value};
use std::collections::BTreeMap;

/// Metadata for one live column, as reported by schema introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub data_type: String,
    pub primary_key: bool,
    pub auto_increment: bool,
}

/// Known columns of a live table.
///
/// Built once from introspection rows and never modified afterwards; the
/// engine holds it behind an `Arc` and shares it between callers.
#[derive(Debug, Clone)]
pub struct SchemaCache {
    table: String,
    columns: BTreeMap<String, ColumnMeta>,
    primary_key: String,
    auto_increment: bool,
}

impl SchemaCache {
    /// Parse introspection rows and check the live primary key against the
    /// configured one. A mismatch is a configuration error.
    pub fn from_rows(
        dialect: Dialect,
        table: &str,
        expected_primary_key: &str,
        rows: &[Record],
    ) -> Result<Self> {
        if rows.is_empty() {
            return Err(StorageError::Configuration(format!(
                "Failed to describe table '{}'",
                table
            )));
        }

        let mut columns = match dialect {
            Dialect::MySql | Dialect::Postgres => rows
                .iter()
                .map(|row| Self::parse_describe_row(table, row))
                .collect::<Result<Vec<_>>>()?,
            Dialect::Sqlite => rows
                .iter()
                .map(|row| Self::parse_table_info_row(table, row))
                .collect::<Result<Vec<_>>>()?,
        };

        let keys: Vec<&ColumnMeta> = columns.iter().filter(|c| c.primary_key).collect();
        let primary_key = match keys.as_slice() {
            [key] if key.name == expected_primary_key => key.name.clone(),
            [] => {
                return Err(StorageError::Configuration(format!(
                    "Table '{}' has no primary key, expected '{}'",
                    table, expected_primary_key
                )));
            }
            _ => {
                let live: Vec<&str> = keys.iter().map(|c| c.name.as_str()).collect();
                return Err(StorageError::Configuration(format!(
                    "Primary key mismatch on table '{}': configured '{}', database has '{}'",
                    table,
                    expected_primary_key,
                    live.join(", ")
                )));
            }
        };

        // SQLite only auto-generates a single INTEGER primary key (rowid alias)
        if dialect == Dialect::Sqlite {
            for column in columns.iter_mut().filter(|c| c.primary_key) {
                column.auto_increment = column.data_type.eq_ignore_ascii_case("INTEGER");
            }
        }

        let auto_increment = columns
            .iter()
            .any(|c| c.primary_key && c.auto_increment);

        Ok(Self {
            table: table.to_string(),
            columns: columns.into_iter().map(|c| (c.name.clone(), c)).collect(),
            primary_key,
            auto_increment,
        })
    }

    /// `DESCRIBE` shaped row: `Field`, `Type`, `Key`, `Extra`.
    fn parse_describe_row(table: &str, row: &Record) -> Result<ColumnMeta> {
        let text = |field: &str| row.get(field).map(Value::to_string).unwrap_or_default();
        let name = row
            .get("Field")
            .and_then(Value::as_str)
            .ok_or_else(|| Self::malformed(table, "Field"))?
            .to_string();

        Ok(ColumnMeta {
            name,
            data_type: text("Type"),
            primary_key: text("Key") == "PRI",
            auto_increment: text("Extra").contains("auto_increment"),
        })
    }

    /// `PRAGMA table_info` row: `name`, `type`, `pk`.
    fn parse_table_info_row(table: &str, row: &Record) -> Result<ColumnMeta> {
        let name = row
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Self::malformed(table, "name"))?
            .to_string();

        Ok(ColumnMeta {
            name,
            data_type: row.get("type").map(Value::to_string).unwrap_or_default(),
            primary_key: row.get("pk").and_then(Value::as_i64).unwrap_or(0) > 0,
            auto_increment: false,
        })
    }

    fn malformed(table: &str, field: &str) -> StorageError {
        StorageError::ExecutionError(format!(
            "Introspection row for table '{}' lacks '{}'",
            table, field
        ))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.get(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = &ColumnMeta> {
        self.columns.values()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Whether the store generates primary key values itself.
    pub fn primary_key_is_auto_increment(&self) -> bool {
        self.auto_increment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::testing::row;

    fn describe_rows() -> Vec<Record> {
        vec![
            row(&[
                ("Field", Value::from("id")),
                ("Type", Value::from("int(11)")),
                ("Key", Value::from("PRI")),
                ("Extra", Value::from("auto_increment")),
            ]),
            row(&[
                ("Field", Value::from("name")),
                ("Type", Value::from("varchar(64)")),
                ("Key", Value::from("")),
                ("Extra", Value::from("")),
            ]),
        ]
    }

    #[test]
    fn test_describe_rows() {
        let cache = SchemaCache::from_rows(Dialect::MySql, "users", "id", &describe_rows()).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains("name"));
        assert!(!cache.contains("email"));
        assert_eq!(cache.primary_key(), "id");
        assert!(cache.primary_key_is_auto_increment());
        assert_eq!(cache.column("name").unwrap().data_type, "varchar(64)");
    }

    #[test]
    fn test_primary_key_mismatch() {
        let err = SchemaCache::from_rows(Dialect::MySql, "users", "uuid", &describe_rows())
            .unwrap_err();
        match err {
            StorageError::Configuration(message) => assert!(message.contains("mismatch")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_describe() {
        let err = SchemaCache::from_rows(Dialect::MySql, "users", "id", &[]).unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));
    }

    #[test]
    fn test_sqlite_table_info() {
        let rows = vec![
            row(&[
                ("name", Value::from("id")),
                ("type", Value::from("INTEGER")),
                ("pk", Value::Integer(1)),
            ]),
            row(&[
                ("name", Value::from("body")),
                ("type", Value::from("TEXT")),
                ("pk", Value::Integer(0)),
            ]),
        ];

        let cache = SchemaCache::from_rows(Dialect::Sqlite, "docs", "id", &rows).unwrap();
        assert!(cache.primary_key_is_auto_increment());
        assert_eq!(cache.column_names(), vec!["body", "id"]);
    }

    #[test]
    fn test_sqlite_text_key_is_not_generated() {
        let rows = vec![row(&[
            ("name", Value::from("id")),
            ("type", Value::from("TEXT")),
            ("pk", Value::Integer(1)),
        ])];

        let cache = SchemaCache::from_rows(Dialect::Sqlite, "docs", "id", &rows).unwrap();
        assert!(!cache.primary_key_is_auto_increment());
    }
}
