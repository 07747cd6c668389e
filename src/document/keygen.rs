use uuid::Uuid;

/// Source of fresh document keys.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random (v4) UUIDs rendered as 32 lowercase hex digits without dashes.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidKeyGenerator;

impl KeyGenerator for UuidKeyGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}
