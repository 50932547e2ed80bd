//! Error types for the access permission system.

use thiserror::Error;
use uuid::Uuid;

use crate::models::actor::ActorId;
use crate::models::permission::PermissionStatus;

#[derive(Debug, Error)]
pub enum AccessError {
    /// A live (pending or granted) record already exists for the pair.
    #[error("Live permission already exists for patient {patient_id} and provider {provider_id}")]
    Conflict {
        patient_id: ActorId,
        provider_id: ActorId,
        existing_id: Uuid,
    },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// The actor has no authority for the attempted transition.
    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    /// The transition is not legal from the record's current status.
    #[error("Cannot {action} permission {id} in status {status}")]
    InvalidState {
        id: Uuid,
        status: PermissionStatus,
        action: String,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Opaque persistence-layer failure, passed through uninterpreted.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl AccessError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

pub type AccessResult<T> = Result<T, AccessError>;

/// Failure reported by a notification sink.
///
/// Sinks are best-effort; the store logs these and carries on.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification sink unavailable: {0}")]
    Unavailable(String),

    #[error("Notification rejected: {0}")]
    Rejected(String),
}
