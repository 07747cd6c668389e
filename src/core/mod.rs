pub mod error;
pub mod types;
pub mod value;

pub use error::{Result, StorageError};
pub use types::Record;
pub use value::Value;
