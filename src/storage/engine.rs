use crate::core::{Result, StorageError, Value};
use log::debug;

/// Existence-gated keyed storage.
///
/// Implementors supply the primitives (`exists`, `insert`, `update`,
/// `remove`); `add`, `set`, `replace` and `delete` are defined on top of them
/// so the overwrite semantics live in one place for every store.
///
/// The existence probe and the write are separate round-trips. Implementors
/// must report a key collision during `insert` as
/// [`StorageError::AlreadyExists`], which makes the backing store's
/// primary-key constraint the final word when two writers race.
pub trait StorageEngine: Send + Sync {
    type Item: Clone;

    fn table_name(&self) -> &str;

    /// Whether a record with this key exists.
    fn exists(&self, key: &Value) -> Result<bool>;

    /// Write a new record. Not gated: callers establish absence first.
    /// `None` lets the store generate the key, or fails with
    /// [`StorageError::MissingKey`] when it cannot.
    fn insert(&self, key: Option<&Value>, item: Self::Item) -> Result<Value>;

    /// Overwrite an existing record. Fails without a key.
    fn update(&self, key: Option<&Value>, item: Self::Item) -> Result<Value>;

    /// Delete unconditionally, returning whether a row was removed.
    fn remove(&self, key: &Value) -> Result<bool>;

    /// Insert only if the key is free.
    fn add(&self, key: Option<&Value>, item: Self::Item) -> Result<Value> {
        if let Some(key) = key {
            if self.exists(key)? {
                return Err(self.already_exists(key));
            }
        }

        self.insert(key, item)
    }

    /// Insert or overwrite.
    fn set(&self, key: Option<&Value>, item: Self::Item) -> Result<Value> {
        let Some(key) = key else {
            return self.insert(None, item);
        };

        if self.exists(key)? {
            return self.update(Some(key), item);
        }

        match self.insert(Some(key), item.clone()) {
            Err(StorageError::AlreadyExists(..)) => {
                debug!(
                    "Insert of '{}' into '{}' lost a race, updating instead",
                    key,
                    self.table_name()
                );
                self.update(Some(key), item)
            }
            result => result,
        }
    }

    /// Overwrite only if the key is taken.
    fn replace(&self, key: Option<&Value>, item: Self::Item) -> Result<Value> {
        let Some(key) = key else {
            return Err(StorageError::MissingKey(self.table_name().to_string()));
        };

        if !self.exists(key)? {
            return Err(StorageError::NotFound(
                key.to_string(),
                self.table_name().to_string(),
            ));
        }

        self.update(Some(key), item)
    }

    /// `None` when there is nothing to delete, otherwise whether the store
    /// removed the row.
    fn delete(&self, key: &Value) -> Result<Option<bool>> {
        if !self.exists(key)? {
            return Ok(None);
        }

        self.remove(key).map(Some)
    }

    fn already_exists(&self, key: &Value) -> StorageError {
        StorageError::AlreadyExists(key.to_string(), self.table_name().to_string())
    }
}
