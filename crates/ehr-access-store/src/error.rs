//! Store-specific error types and conversions.

use ehr_access_core::error::AccessError;

/// Storage-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store lock poisoned by a panicking writer")]
    Poisoned,

    #[error("Seed data invalid: {0}")]
    Seed(String),

    #[error("Seed parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => AccessError::NotFound { entity, id },
            other => AccessError::Storage(other.to_string()),
        }
    }
}
