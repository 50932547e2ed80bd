//! Permission transition events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::actor::{Actor, ActorId, ActorRole};
use super::permission::{PermissionRecord, PermissionStatus};

/// Emitted once for every successful status transition, including
/// creation (where `from_status` is `None`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionEvent {
    pub permission_id: Uuid,
    pub patient_id: ActorId,
    pub provider_id: ActorId,
    pub from_status: Option<PermissionStatus>,
    pub to_status: PermissionStatus,
    pub actor_id: ActorId,
    pub actor_role: ActorRole,
    pub timestamp: DateTime<Utc>,
}

impl PermissionEvent {
    /// Build the event for `record` after it moved out of `from_status`.
    pub fn transition(
        record: &PermissionRecord,
        from_status: Option<PermissionStatus>,
        actor: &Actor,
    ) -> Self {
        Self {
            permission_id: record.id,
            patient_id: record.patient_id.clone(),
            provider_id: record.provider_id.clone(),
            from_status,
            to_status: record.status,
            actor_id: actor.id.clone(),
            actor_role: actor.role,
            timestamp: record.date_modified,
        }
    }

    pub fn is_creation(&self) -> bool {
        self.from_status.is_none()
    }
}
