use super::config::DocumentConfig;
use super::keygen::{KeyGenerator, UuidKeyGenerator};
use super::serializer::{JsonSerializer, Serializer};
use crate::connection::Connection;
use crate::core::{Record, Result, StorageError, Value};
use crate::storage::{StorageEngine, TableStorage};
use chrono::Utc;
use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use std::sync::Arc;

/// A document as stored: key, column timestamps and the full body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub key: String,
    pub created: i64,
    pub updated: i64,
    pub body: serde_json::Value,
}

/// Schemaless document storage on a four-column table.
///
/// Each document is a JSON object serialized into the body column next to a
/// generated key and `created`/`updated` timestamps (Unix seconds). The
/// columns always carry the time of the write. The key is also written into
/// the body, and the timestamps are written there when the document has no
/// such fields; [`get`](Self::get) strips them again.
pub struct DocumentStore<S = JsonSerializer> {
    table: TableStorage,
    config: DocumentConfig,
    serializer: S,
    keys: Box<dyn KeyGenerator>,
}

impl DocumentStore<JsonSerializer> {
    pub fn new(config: DocumentConfig, connection: Arc<dyn Connection>) -> Result<Self> {
        Self::with_serializer(config, connection, JsonSerializer)
    }

    /// Bind and create the table if absent.
    pub fn open(config: DocumentConfig, connection: Arc<dyn Connection>) -> Result<Self> {
        let store = Self::new(config, connection)?;
        store.ensure_table()?;
        Ok(store)
    }
}

impl<S: Serializer> DocumentStore<S> {
    pub fn with_serializer(
        config: DocumentConfig,
        connection: Arc<dyn Connection>,
        serializer: S,
    ) -> Result<Self> {
        config.validate()?;
        let table = TableStorage::new(config.to_table_config(), connection)?;

        Ok(Self {
            table,
            config,
            serializer,
            keys: Box::new(UuidKeyGenerator),
        })
    }

    pub fn key_generator(mut self, keys: impl KeyGenerator + 'static) -> Self {
        self.keys = Box::new(keys);
        self
    }

    /// Create the table if absent, failing when it stays unusable.
    pub fn ensure_table(&self) -> Result<()> {
        if self.setup()? {
            Ok(())
        } else {
            Err(StorageError::Configuration(format!(
                "Cannot set up table '{}'",
                self.config.table
            )))
        }
    }

    pub fn setup(&self) -> Result<bool> {
        self.table.setup()
    }

    pub fn teardown(&self) -> Result<()> {
        self.table.teardown()
    }

    pub fn truncate(&self) -> Result<()> {
        self.table.truncate()
    }

    pub fn table(&self) -> &TableStorage {
        &self.table
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// Store a document under a fresh key and return the key.
    ///
    /// A generated key that is already taken is replaced by a new one, up to
    /// `max_store_attempts` keys in total. The primary key field of the
    /// document is overwritten with the key.
    pub fn store(&self, document: serde_json::Value) -> Result<String> {
        let attempts = self.config.max_store_attempts.max(1);
        let mut attempt = 1;

        loop {
            let key = self.keys.generate();
            match self.add(Some(&Value::from(key.as_str())), document.clone()) {
                Ok(_) => return Ok(key),
                Err(StorageError::AlreadyExists(..)) if attempt < attempts => {
                    warn!(
                        "Generated key '{}' already exists in '{}' (attempt {}/{})",
                        key, self.config.table, attempt, attempts
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub fn store_as<T: Serialize>(&self, document: &T) -> Result<String> {
        self.store(serde_json::to_value(document)?)
    }

    /// The document as stored, without the fields the store wrote into it.
    ///
    /// The primary key field is always removed. `created` and `updated` are
    /// removed only when they hold the column timestamps, so values the
    /// caller stored under those names come back unchanged.
    pub fn get(&self, key: &Value) -> Result<Option<serde_json::Value>> {
        let Some(document) = self.get_document(key)? else {
            return Ok(None);
        };

        let mut body = document.body;
        if let serde_json::Value::Object(object) = &mut body {
            object.remove(&self.config.primary_key.name);
            for (field, written) in [
                (&self.config.created.name, document.created),
                (&self.config.updated.name, document.updated),
            ] {
                if object.get(field).and_then(serde_json::Value::as_i64) == Some(written) {
                    object.remove(field);
                }
            }
        }
        Ok(Some(body))
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &Value) -> Result<Option<T>> {
        self.get(key)?
            .map(|body| serde_json::from_value(body).map_err(StorageError::from))
            .transpose()
    }

    /// The stored row: key, column timestamps and the untouched body.
    pub fn get_document(&self, key: &Value) -> Result<Option<Document>> {
        let Some(row) = self.table.get(key)? else {
            return Ok(None);
        };

        let column = |name: &str| {
            row.get(name).ok_or_else(|| {
                StorageError::Integrity(format!(
                    "Document '{}' in '{}' has no '{}' column",
                    key, self.config.table, name
                ))
            })
        };
        let timestamp = |name: &str| -> Result<i64> {
            column(name)?.as_i64().ok_or_else(|| {
                StorageError::Integrity(format!(
                    "Document '{}' in '{}' has a non-integer '{}'",
                    key, self.config.table, name
                ))
            })
        };

        Ok(Some(Document {
            key: column(self.config.primary_key.name.as_str())?.to_string(),
            created: timestamp(self.config.created.name.as_str())?,
            updated: timestamp(self.config.updated.name.as_str())?,
            body: self.serializer.deserialize(column(self.config.body.name.as_str())?)?,
        }))
    }

    /// The live table must have exactly the four document columns.
    fn check_layout(&self) -> Result<()> {
        let schema = self.table.schema()?;
        let expected = [
            &self.config.primary_key.name,
            &self.config.created.name,
            &self.config.updated.name,
            &self.config.body.name,
        ];

        if schema.len() != expected.len() || expected.iter().any(|c| !schema.contains(c)) {
            return Err(StorageError::Configuration(format!(
                "Document table '{}' must have exactly the columns {:?}, found {:?}",
                self.config.table,
                expected,
                schema.column_names()
            )));
        }
        Ok(())
    }

    fn into_object(document: serde_json::Value) -> Result<Map<String, serde_json::Value>> {
        match document {
            serde_json::Value::Object(object) => Ok(object),
            other => Err(StorageError::TypeMismatch(format!(
                "Documents must be JSON objects, got {}",
                json_kind(&other)
            ))),
        }
    }
}

/// Set `field` to `now` unless the document already carries a value.
fn stamp(object: &mut Map<String, serde_json::Value>, field: &str, now: i64) {
    let entry = object
        .entry(field.to_string())
        .or_insert(serde_json::Value::Null);
    if entry.is_null() {
        *entry = now.into();
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

impl<S: Serializer> StorageEngine for DocumentStore<S> {
    type Item = serde_json::Value;

    fn table_name(&self) -> &str {
        &self.config.table
    }

    fn exists(&self, key: &Value) -> Result<bool> {
        self.table.exists(key)
    }

    /// Write all four columns, both timestamps set to now. Without a key a
    /// fresh one is generated.
    fn insert(&self, key: Option<&Value>, document: serde_json::Value) -> Result<Value> {
        let mut object = Self::into_object(document)?;
        self.check_layout()?;

        let key = match key.filter(|k| !k.is_empty_key()) {
            Some(key) => key.clone(),
            None => Value::from(self.keys.generate()),
        };

        let now = Utc::now().timestamp();
        object.insert(self.config.primary_key.name.clone(), key.to_json());
        stamp(&mut object, &self.config.created.name, now);
        stamp(&mut object, &self.config.updated.name, now);

        let mut record = Record::new();
        record.insert(self.config.primary_key.name.clone(), key.clone());
        record.insert(self.config.created.name.clone(), Value::Integer(now));
        record.insert(self.config.updated.name.clone(), Value::Integer(now));
        record.insert(
            self.config.body.name.clone(),
            self.serializer.serialize(&serde_json::Value::Object(object))?,
        );

        self.table.insert(Some(&key), record)
    }

    /// Write key, `updated` (now) and body. `created` is left as stored.
    fn update(&self, key: Option<&Value>, document: serde_json::Value) -> Result<Value> {
        let Some(key) = key.filter(|k| !k.is_empty_key()) else {
            return Err(StorageError::MissingKey(self.config.table.clone()));
        };
        let mut object = Self::into_object(document)?;
        self.check_layout()?;

        let now = Utc::now().timestamp();
        object.insert(self.config.primary_key.name.clone(), key.to_json());
        stamp(&mut object, &self.config.updated.name, now);

        let mut record = Record::new();
        record.insert(self.config.primary_key.name.clone(), key.clone());
        record.insert(self.config.updated.name.clone(), Value::Integer(now));
        record.insert(
            self.config.body.name.clone(),
            self.serializer.serialize(&serde_json::Value::Object(object))?,
        );

        self.table.update(Some(key), record)
    }

    fn remove(&self, key: &Value) -> Result<bool> {
        self.table.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stamp_fills_missing_and_null() {
        let mut object = Map::new();
        object.insert("updated".into(), serde_json::Value::Null);

        stamp(&mut object, "created", 100);
        stamp(&mut object, "updated", 100);
        assert_eq!(object["created"], json!(100));
        assert_eq!(object["updated"], json!(100));
    }

    #[test]
    fn test_stamp_keeps_caller_values() {
        let mut object = Map::new();
        object.insert("created".into(), json!(5));
        object.insert("updated".into(), json!("yesterday"));

        stamp(&mut object, "created", 100);
        stamp(&mut object, "updated", 100);
        assert_eq!(object["created"], json!(5));
        assert_eq!(object["updated"], json!("yesterday"));
    }

    #[test]
    fn test_json_kind() {
        assert_eq!(json_kind(&json!([1])), "an array");
        assert_eq!(json_kind(&json!("x")), "a string");
    }
}
