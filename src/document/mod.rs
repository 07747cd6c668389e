pub mod config;
pub mod keygen;
pub mod serializer;
pub mod store;

pub use config::DocumentConfig;
pub use keygen::{KeyGenerator, UuidKeyGenerator};
pub use serializer::{JsonSerializer, MessagePackSerializer, Serializer};
pub use store::{Document, DocumentStore};
