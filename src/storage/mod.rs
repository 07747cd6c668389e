pub mod binding;
pub mod catalog;
pub mod column;
pub mod engine;
pub mod query;
pub mod table;

pub use binding::{TableBinding, TableConfig, validate_identifier};
pub use catalog::{ColumnMeta, SchemaCache};
pub use column::{ColumnDef, ColumnDescriptor};
pub use engine::StorageEngine;
pub use query::{QueryBuilder, Statement};
pub use table::TableStorage;
