use super::binding::{TableBinding, TableConfig};
use super::catalog::SchemaCache;
use super::engine::StorageEngine;
use crate::connection::Connection;
use crate::core::{Record, Result, StorageError, Value};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, OnceLock};

/// Keyed record storage over one relational table.
///
/// Records are written column for column: fields that name a live column are
/// stored, anything else is dropped with a diagnostic. The live column set is
/// introspected once, on first write, and cached for the life of the value.
///
/// ```
/// use std::sync::Arc;
/// use tablestore::{ColumnDef, Record, SqliteConnection, StorageEngine, TableConfig, TableStorage, Value};
///
/// # fn main() -> tablestore::Result<()> {
/// let connection = Arc::new(SqliteConnection::open_in_memory()?);
/// let config = TableConfig::new("users", ColumnDef::new("id", "INTEGER"))
///     .column(ColumnDef::new("name", "TEXT"));
/// let users = TableStorage::open(config, connection)?;
///
/// let mut record = Record::new();
/// record.insert("name".into(), Value::from("alice"));
/// let id = users.add(None, record)?;
///
/// assert!(users.exists(&id)?);
/// # Ok(())
/// # }
/// ```
pub struct TableStorage {
    binding: TableBinding,
    /// Introspected schema, or the configuration error that poisoned it.
    schema: OnceLock<std::result::Result<Arc<SchemaCache>, String>>,
    init: Mutex<()>,
}

impl TableStorage {
    /// Bind a table without touching it. Configuration is validated here.
    pub fn new(config: TableConfig, connection: Arc<dyn Connection>) -> Result<Self> {
        Ok(Self::from_binding(TableBinding::new(config, connection)?))
    }

    pub fn from_binding(binding: TableBinding) -> Self {
        Self {
            binding,
            schema: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// Bind a table and create it if absent.
    pub fn open(config: TableConfig, connection: Arc<dyn Connection>) -> Result<Self> {
        let storage = Self::new(config, connection)?;
        if !storage.setup()? {
            return Err(StorageError::Configuration(format!(
                "Cannot set up table '{}'",
                storage.binding.table()
            )));
        }
        Ok(storage)
    }

    pub fn binding(&self) -> &TableBinding {
        &self.binding
    }

    fn connection(&self) -> &dyn Connection {
        self.binding.connection()
    }

    pub fn table_exists(&self) -> Result<bool> {
        let (sql, params) = self.binding.dialect().table_probe(self.binding.table());
        Ok(!self.connection().fetch(&sql, &params)?.is_empty())
    }

    /// Create the table and its indexes if absent. Returns whether the table
    /// is usable afterwards. Safe to call repeatedly.
    pub fn setup(&self) -> Result<bool> {
        if self.table_exists()? {
            debug!("Table '{}' already exists", self.binding.table());
            return Ok(true);
        }

        let ddl = self.binding.query().create_table(
            self.binding.primary_key(),
            self.binding.columns(),
            self.binding.indexes(),
        );
        for sql in &ddl {
            self.connection().execute(sql, &[])?;
        }

        let usable = self.table_exists()?;
        if usable {
            info!("Created table '{}'", self.binding.table());
        } else {
            error!("Table '{}' is missing after setup", self.binding.table());
        }
        Ok(usable)
    }

    /// Drop the table.
    pub fn teardown(&self) -> Result<()> {
        let sql = self.binding.dialect().drop_table(self.binding.table());
        self.connection().execute(&sql, &[])?;
        info!("Dropped table '{}'", self.binding.table());
        Ok(())
    }

    /// Remove every row.
    pub fn truncate(&self) -> Result<()> {
        let sql = self.binding.dialect().truncate(self.binding.table());
        self.connection().execute(&sql, &[])?;
        Ok(())
    }

    /// The live schema, introspected on first call.
    ///
    /// Concurrent first callers wait on a single introspection. A primary
    /// key that disagrees with the configuration is latched: every later call
    /// reports the same configuration error without asking the store again.
    pub fn schema(&self) -> Result<Arc<SchemaCache>> {
        if let Some(state) = self.schema.get() {
            return state.clone().map_err(StorageError::Configuration);
        }

        let _guard = self.init.lock()?;
        if let Some(state) = self.schema.get() {
            return state.clone().map_err(StorageError::Configuration);
        }

        let table = self.binding.table();
        let (sql, params) = self.binding.dialect().describe(table);
        let rows = self.connection().fetch(&sql, &params)?;

        // Not latched: the table may simply not be set up yet.
        if rows.is_empty() {
            return Err(StorageError::Configuration(format!(
                "Failed to describe table '{}'",
                table
            )));
        }

        let state = match SchemaCache::from_rows(
            self.binding.dialect(),
            table,
            self.binding.primary_key().name(),
            &rows,
        ) {
            Ok(cache) => {
                debug!("Introspected table '{}': {:?}", table, cache.column_names());
                Ok(Arc::new(cache))
            }
            Err(StorageError::Configuration(message)) => {
                error!("{}", message);
                Err(message)
            }
            Err(err) => return Err(err),
        };

        let _ = self.schema.set(state.clone());
        state.map_err(StorageError::Configuration)
    }

    /// Fetch a record by key, `None` when absent.
    pub fn get(&self, key: &Value) -> Result<Option<Record>> {
        if !self.exists(key)? {
            return Ok(None);
        }

        let stmt = self.binding.query().select(key);
        let mut rows = self.connection().fetch(&stmt.sql, &stmt.params)?;

        match rows.len() {
            // Deleted between the probe and the fetch
            0 => Ok(None),
            1 => Ok(rows.pop()),
            count => {
                warn!(
                    "`get()` failed for key '{}': {} rows in table '{}'",
                    key,
                    count,
                    self.binding.table()
                );
                Err(StorageError::Integrity(format!(
                    "Key '{}' matches {} rows in table '{}'",
                    key,
                    count,
                    self.binding.table()
                )))
            }
        }
    }

    /// Keep only fields naming a live column.
    fn filter_fields(&self, schema: &SchemaCache, record: Record) -> Vec<(String, Value)> {
        record
            .into_iter()
            .filter(|(field, _)| {
                let known = schema.contains(field);
                if !known {
                    info!(
                        "Cannot store values for unknown field `{}` in table `{}`, ignoring",
                        field,
                        self.binding.table()
                    );
                }
                known
            })
            .collect()
    }

    /// Execute an insert, returning the key reported by `RETURNING` if the
    /// dialect uses it.
    fn execute_insert(&self, fields: Vec<(String, Value)>) -> Result<Option<Value>> {
        let stmt = self.binding.query().insert(fields);

        if self.binding.dialect().uses_returning() {
            let rows = self.connection().fetch(&stmt.sql, &stmt.params)?;
            let primary_key = self.binding.primary_key().name();
            Ok(rows
                .into_iter()
                .next()
                .and_then(|mut row| row.remove(primary_key)))
        } else {
            self.connection().execute(&stmt.sql, &stmt.params)?;
            Ok(None)
        }
    }
}

impl StorageEngine for TableStorage {
    type Item = Record;

    fn table_name(&self) -> &str {
        self.binding.table()
    }

    fn exists(&self, key: &Value) -> Result<bool> {
        let stmt = self.binding.query().exists(key);
        let rows = self.connection().fetch(&stmt.sql, &stmt.params)?;

        rows.first()
            .and_then(|row| row.get("_exists"))
            .map(Value::as_bool)
            .ok_or_else(|| {
                StorageError::ExecutionError(format!(
                    "Existence probe on table '{}' returned no rows",
                    self.binding.table()
                ))
            })
    }

    fn insert(&self, key: Option<&Value>, mut record: Record) -> Result<Value> {
        let schema = self.schema()?;
        let primary_key = self.binding.primary_key().name();

        match key.filter(|k| !k.is_empty_key()) {
            Some(key) => {
                record.insert(primary_key.to_string(), key.clone());
            }
            None => {
                record.remove(primary_key);
                if !schema.primary_key_is_auto_increment() {
                    warn!(
                        "Insert into '{}' without a key, but `{}` is not generated by the store",
                        self.binding.table(),
                        primary_key
                    );
                    return Err(StorageError::MissingKey(self.binding.table().to_string()));
                }
            }
        }

        let supplied = record
            .get(primary_key)
            .filter(|k| !k.is_empty_key())
            .cloned();

        let fields = self.filter_fields(&schema, record);
        if fields.is_empty() {
            return Err(StorageError::NoColumns(self.binding.table().to_string()));
        }

        let returned = match self.execute_insert(fields) {
            Ok(returned) => returned,
            Err(StorageError::ConstraintViolation(message)) => {
                // The store's key constraint is authoritative when a
                // concurrent writer got there between probe and insert.
                if let Some(key) = &supplied {
                    if self.exists(key)? {
                        debug!("Insert into '{}' rejected: {}", self.binding.table(), message);
                        return Err(self.already_exists(key));
                    }
                }
                error!("Failed to insert into '{}': {}", self.binding.table(), message);
                return Err(StorageError::ConstraintViolation(message));
            }
            Err(err) => {
                error!("Failed to insert into '{}': {}", self.binding.table(), err);
                return Err(err);
            }
        };

        if let Some(key) = supplied {
            return Ok(key);
        }
        if let Some(key) = returned.filter(|k| !k.is_null()) {
            return Ok(key);
        }
        self.connection().last_insert_id()
    }

    fn update(&self, key: Option<&Value>, mut record: Record) -> Result<Value> {
        let Some(key) = key.filter(|k| !k.is_empty_key()) else {
            warn!("Update on '{}' requires a non-empty key", self.binding.table());
            return Err(StorageError::MissingKey(self.binding.table().to_string()));
        };

        let schema = self.schema()?;
        record.insert(self.binding.primary_key().name().to_string(), key.clone());

        let fields = self.filter_fields(&schema, record);
        if fields.is_empty() {
            return Err(StorageError::NoColumns(self.binding.table().to_string()));
        }

        let stmt = self.binding.query().update(fields, key);
        let affected = self
            .connection()
            .execute(&stmt.sql, &stmt.params)
            .inspect_err(|err| {
                error!(
                    "Failed to update key '{}' in '{}': {}",
                    key,
                    self.binding.table(),
                    err
                )
            })?;

        if affected == 0 {
            debug!("Update of '{}' in '{}' changed no rows", key, self.binding.table());
        }

        Ok(key.clone())
    }

    fn remove(&self, key: &Value) -> Result<bool> {
        let stmt = self.binding.query().delete(key);
        Ok(self.connection().execute(&stmt.sql, &stmt.params)? > 0)
    }
}
