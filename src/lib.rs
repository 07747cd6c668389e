// ============================================================================
// tablestore Library
// ============================================================================

//! Keyed record storage on top of relational tables.
//!
//! [`TableStorage`] maps records column for column onto one table and offers
//! the existence-gated verbs of [`StorageEngine`]: `add` never overwrites,
//! `replace` never creates, `set` does whichever applies. [`DocumentStore`]
//! keeps whole JSON documents in a single body column with a generated key
//! and maintained timestamps.
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use tablestore::{DocumentConfig, DocumentStore, SqliteConnection, StorageEngine, Value};
//!
//! # fn main() -> tablestore::Result<()> {
//! let connection = Arc::new(SqliteConnection::open_in_memory()?);
//! let notes = DocumentStore::open(DocumentConfig::new("notes"), connection)?;
//!
//! let key = notes.store(json!({"title": "groceries", "items": ["milk", "eggs"]}))?;
//! assert_eq!(key.len(), 32);
//!
//! let key = Value::from(key);
//! assert_eq!(notes.get(&key)?, Some(json!({"title": "groceries", "items": ["milk", "eggs"]})));
//! assert_eq!(notes.delete(&key)?, Some(true));
//! assert_eq!(notes.get(&key)?, None);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod connection;
pub mod storage;
pub mod document;

// Re-export main types for convenience
pub use crate::core::{Record, Result, StorageError, Value};

pub use crate::connection::{Attribute, Connection, ConnectionConfig, Dialect, SqliteConnection};

pub use crate::storage::{
    ColumnDef, ColumnDescriptor, ColumnMeta, SchemaCache, StorageEngine, TableBinding,
    TableConfig, TableStorage,
};

pub use crate::document::{
    Document, DocumentConfig, DocumentStore, JsonSerializer, KeyGenerator, MessagePackSerializer,
    Serializer, UuidKeyGenerator,
};
