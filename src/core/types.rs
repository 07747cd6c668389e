use super::Value;
use std::collections::BTreeMap;

/// A row keyed by column name. Ordered so generated statements are stable.
pub type Record = BTreeMap<String, Value>;
