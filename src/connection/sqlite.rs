use super::{Attribute, Connection, ConnectionConfig};
use crate::core::{Record, Result, StorageError, Value};
use log::debug;
use rusqlite::OpenFlags;
use rusqlite::params_from_iter;
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use std::sync::Mutex;

/// SQLite-backed [`Connection`]
///
/// A single `rusqlite::Connection` behind a mutex, so statements from
/// concurrent callers are serialized.
pub struct SqliteConnection {
    inner: Mutex<rusqlite::Connection>,
    config: ConnectionConfig,
}

impl SqliteConnection {
    pub fn open(config: ConnectionConfig) -> Result<Self> {
        config.validate().map_err(StorageError::Configuration)?;

        let mut flags = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if config.read_only {
            flags |= OpenFlags::SQLITE_OPEN_READ_ONLY;
        } else {
            flags |= OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        }

        let connection = rusqlite::Connection::open_with_flags(&config.path, flags)?;
        connection.busy_timeout(config.busy_timeout)?;
        connection.pragma_update(None, "foreign_keys", config.foreign_keys)?;

        debug!("Opened SQLite database {}", config.to_url());

        Ok(Self {
            inner: Mutex::new(connection),
            config,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(ConnectionConfig::in_memory())
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

impl Connection for SqliteConnection {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        debug!("Executing: {} with params: {:?}", sql, params);

        let connection = self.inner.lock()?;
        let mut statement = connection.prepare(sql)?;
        let affected = statement.execute(params_from_iter(params.iter()))?;

        Ok(affected as u64)
    }

    fn fetch(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>> {
        debug!("Fetching: {} with params: {:?}", sql, params);

        let connection = self.inner.lock()?;
        let mut statement = connection.prepare(sql)?;
        let columns: Vec<String> = statement
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = statement.query(params_from_iter(params.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (index, column) in columns.iter().enumerate() {
                record.insert(column.clone(), value_from_sql(row.get_ref(index)?));
            }
            records.push(record);
        }

        Ok(records)
    }

    fn attribute(&self, attribute: Attribute) -> Result<Value> {
        match attribute {
            Attribute::DriverName => Ok(Value::from("sqlite")),
            Attribute::ServerVersion | Attribute::ClientVersion => {
                Ok(Value::from(rusqlite::version()))
            }
        }
    }

    fn last_insert_id(&self) -> Result<Value> {
        let connection = self.inner.lock()?;
        Ok(Value::Integer(connection.last_insert_rowid()))
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*f)),
            Value::Boolean(b) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(i64::from(*b))),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

fn value_from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(text) => Value::Text(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => Value::Blob(blob.to_vec()),
    }
}
