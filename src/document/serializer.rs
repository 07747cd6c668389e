use crate::core::{Result, StorageError, Value};

/// Converts document bodies to and from their stored column value.
pub trait Serializer: Send + Sync {
    fn serialize(&self, document: &serde_json::Value) -> Result<Value>;
    fn deserialize(&self, stored: &Value) -> Result<serde_json::Value>;
}

/// Stores bodies as JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, document: &serde_json::Value) -> Result<Value> {
        Ok(Value::Text(serde_json::to_string(document)?))
    }

    fn deserialize(&self, stored: &Value) -> Result<serde_json::Value> {
        let bytes = stored.as_bytes().ok_or_else(|| unreadable(stored))?;
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Stores bodies as MessagePack blobs, with field names kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePackSerializer;

impl Serializer for MessagePackSerializer {
    fn serialize(&self, document: &serde_json::Value) -> Result<Value> {
        Ok(Value::Blob(rmp_serde::to_vec_named(document)?))
    }

    fn deserialize(&self, stored: &Value) -> Result<serde_json::Value> {
        match stored {
            Value::Blob(bytes) => Ok(rmp_serde::from_slice(bytes)?),
            other => Err(unreadable(other)),
        }
    }
}

fn unreadable(stored: &Value) -> StorageError {
    StorageError::Serialization(format!("Cannot read a document body from {}", stored.type_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> serde_json::Value {
        json!({"name": "alice", "tags": ["a", "b"], "address": {"city": "Bratislava", "zip": 81101}})
    }

    #[test]
    fn test_json_body_is_text() {
        let stored = JsonSerializer.serialize(&document()).unwrap();
        assert!(matches!(stored, Value::Text(_)));
        assert_eq!(JsonSerializer.deserialize(&stored).unwrap(), document());
    }

    #[test]
    fn test_json_reads_blob_bodies() {
        let stored = Value::Blob(br#"{"a":1}"#.to_vec());
        assert_eq!(JsonSerializer.deserialize(&stored).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_msgpack_body_is_blob() {
        let stored = MessagePackSerializer.serialize(&document()).unwrap();
        assert!(matches!(stored, Value::Blob(_)));
        assert_eq!(MessagePackSerializer.deserialize(&stored).unwrap(), document());
    }

    #[test]
    fn test_unreadable_bodies() {
        assert!(matches!(
            JsonSerializer.deserialize(&Value::Integer(1)),
            Err(StorageError::Serialization(_))
        ));
        assert!(matches!(
            MessagePackSerializer.deserialize(&Value::from("{}")),
            Err(StorageError::Serialization(_))
        ));
        assert!(JsonSerializer.deserialize(&Value::from("{not json")).is_err());
    }
}
