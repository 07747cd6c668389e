use serde::{Deserialize, Serialize};
use std::fmt;

/// Describes one column of a bound table.
///
/// `describe` returns the full DDL fragment following the column name, used
/// verbatim in `CREATE TABLE`.
pub trait ColumnDescriptor: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;
    fn describe(&self) -> &str;
}

/// Plain column definition, e.g. `ColumnDef::new("id", "CHAR(32) NOT NULL")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub definition: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
        }
    }
}

impl ColumnDescriptor for ColumnDef {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> &str {
        &self.definition
    }
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.definition)
    }
}
