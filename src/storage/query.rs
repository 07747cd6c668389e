use super::column::ColumnDescriptor;
use crate::connection::Dialect;
use crate::core::Value;
use std::sync::Arc;

/// SQL text plus the values bound to its `?` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    fn new(sql: String, params: Vec<Value>) -> Self {
        Self { sql, params }
    }
}

/// Builds the statements issued against one table.
///
/// Keys and field values are always bound, never spliced into the SQL text.
pub struct QueryBuilder<'a> {
    dialect: Dialect,
    table: &'a str,
    primary_key: &'a str,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(dialect: Dialect, table: &'a str, primary_key: &'a str) -> Self {
        Self {
            dialect,
            table,
            primary_key,
        }
    }

    fn table(&self) -> String {
        self.dialect.quote(self.table)
    }

    fn lookup(&self) -> String {
        format!("{} = ?", self.dialect.quote(self.primary_key))
    }

    pub fn exists(&self, key: &Value) -> Statement {
        Statement::new(
            format!(
                "SELECT EXISTS (SELECT 1 FROM {} WHERE {} LIMIT 1) AS _exists",
                self.table(),
                self.lookup()
            ),
            vec![key.clone()],
        )
    }

    /// Fetch by key. Limited to two rows so a duplicated key is detectable.
    pub fn select(&self, key: &Value) -> Statement {
        Statement::new(
            format!("SELECT * FROM {} WHERE {} LIMIT 2", self.table(), self.lookup()),
            vec![key.clone()],
        )
    }

    pub fn insert(&self, fields: Vec<(String, Value)>) -> Statement {
        let (columns, params): (Vec<String>, Vec<Value>) = fields
            .into_iter()
            .map(|(column, value)| (self.dialect.quote(&column), value))
            .unzip();

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table(),
            columns.join(", "),
            vec!["?"; params.len()].join(", ")
        );

        if self.dialect.uses_returning() {
            sql.push_str(&format!(" RETURNING {}", self.dialect.quote(self.primary_key)));
        }

        Statement::new(sql, params)
    }

    pub fn update(&self, fields: Vec<(String, Value)>, key: &Value) -> Statement {
        let (assignments, mut params): (Vec<String>, Vec<Value>) = fields
            .into_iter()
            .map(|(column, value)| (format!("{} = ?", self.dialect.quote(&column)), value))
            .unzip();
        params.push(key.clone());

        Statement::new(
            format!(
                "UPDATE {} SET {} WHERE {}",
                self.table(),
                assignments.join(", "),
                self.lookup()
            ),
            params,
        )
    }

    pub fn delete(&self, key: &Value) -> Statement {
        Statement::new(
            format!("DELETE FROM {} WHERE {}", self.table(), self.lookup()),
            vec![key.clone()],
        )
    }

    /// DDL creating the table if absent. MySQL declares indexes inline; the
    /// other dialects get one `CREATE INDEX` per index after the table.
    pub fn create_table(
        &self,
        primary_key: &dyn ColumnDescriptor,
        columns: &[Arc<dyn ColumnDescriptor>],
        indexes: &[String],
    ) -> Vec<String> {
        let q = |name: &str| self.dialect.quote(name);

        let mut definitions = vec![format!("{} {}", q(primary_key.name()), primary_key.describe())];
        definitions.extend(
            columns
                .iter()
                .map(|column| format!("{} {}", q(column.name()), column.describe())),
        );
        definitions.push(format!("PRIMARY KEY ({})", q(primary_key.name())));

        if self.dialect.inline_indexes() {
            for index in indexes {
                definitions.push(format!("KEY {} ({})", q(index), q(index)));
            }
        }

        let mut create = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table(),
            definitions.join(", ")
        );
        if self.dialect == Dialect::MySql {
            create.push_str(" ENGINE=InnoDB DEFAULT CHARSET=utf8mb4");
        }

        let mut statements = vec![create];
        if !self.dialect.inline_indexes() {
            statements.extend(indexes.iter().map(|index| {
                format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                    q(&format!("{}_{}", self.table, index)),
                    self.table(),
                    q(index)
                )
            }));
        }

        statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ColumnDef;

    fn fields() -> Vec<(String, Value)> {
        vec![
            ("body".to_string(), Value::from("{}")),
            ("id".to_string(), Value::from("abc")),
        ]
    }

    #[test]
    fn test_exists_shape() {
        let stmt = QueryBuilder::new(Dialect::MySql, "docs", "id").exists(&Value::from("abc"));
        assert_eq!(
            stmt.sql,
            "SELECT EXISTS (SELECT 1 FROM `docs` WHERE `id` = ? LIMIT 1) AS _exists"
        );
        assert_eq!(stmt.params, vec![Value::from("abc")]);
    }

    #[test]
    fn test_insert_mysql_has_no_returning() {
        let stmt = QueryBuilder::new(Dialect::MySql, "docs", "id").insert(fields());
        assert_eq!(stmt.sql, "INSERT INTO `docs` (`body`, `id`) VALUES (?, ?)");
        assert_eq!(stmt.params.len(), 2);
    }

    #[test]
    fn test_insert_postgres_returns_key() {
        let stmt = QueryBuilder::new(Dialect::Postgres, "docs", "id").insert(fields());
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"docs\" (\"body\", \"id\") VALUES (?, ?) RETURNING \"id\""
        );
    }

    #[test]
    fn test_update_binds_key_last() {
        let stmt = QueryBuilder::new(Dialect::MySql, "docs", "id")
            .update(fields(), &Value::from("abc"));
        assert_eq!(stmt.sql, "UPDATE `docs` SET `body` = ?, `id` = ? WHERE `id` = ?");
        assert_eq!(stmt.params.last(), Some(&Value::from("abc")));
        assert_eq!(stmt.params.len(), 3);
    }

    #[test]
    fn test_delete_shape() {
        let stmt = QueryBuilder::new(Dialect::Sqlite, "docs", "id").delete(&Value::Integer(4));
        assert_eq!(stmt.sql, "DELETE FROM \"docs\" WHERE \"id\" = ?");
    }

    #[test]
    fn test_create_table_mysql_inline_keys() {
        let columns: Vec<Arc<dyn ColumnDescriptor>> = vec![
            Arc::new(ColumnDef::new("created", "INT NOT NULL")),
            Arc::new(ColumnDef::new("body", "LONGTEXT")),
        ];
        let ddl = QueryBuilder::new(Dialect::MySql, "docs", "id").create_table(
            &ColumnDef::new("id", "CHAR(32) NOT NULL"),
            &columns,
            &["created".to_string()],
        );

        assert_eq!(ddl.len(), 1);
        assert_eq!(
            ddl[0],
            "CREATE TABLE IF NOT EXISTS `docs` (`id` CHAR(32) NOT NULL, `created` INT NOT NULL, \
             `body` LONGTEXT, PRIMARY KEY (`id`), KEY `created` (`created`)) \
             ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
        );
    }

    #[test]
    fn test_create_table_sqlite_separate_indexes() {
        let columns: Vec<Arc<dyn ColumnDescriptor>> =
            vec![Arc::new(ColumnDef::new("updated", "INTEGER NOT NULL"))];
        let ddl = QueryBuilder::new(Dialect::Sqlite, "docs", "id").create_table(
            &ColumnDef::new("id", "TEXT NOT NULL"),
            &columns,
            &["updated".to_string()],
        );

        assert_eq!(ddl.len(), 2);
        assert!(ddl[0].ends_with("PRIMARY KEY (\"id\"))"));
        assert_eq!(
            ddl[1],
            "CREATE INDEX IF NOT EXISTS \"docs_updated\" ON \"docs\" (\"updated\")"
        );
    }
}
