//! Submission identifiers.

use uuid::Uuid;

/// Produces the immutable id of each submission record.
///
/// Called exactly once per submission; the result becomes the suffix of the
/// record key and of the detail-view route.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random (v4) UUIDs in hyphenated form.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
