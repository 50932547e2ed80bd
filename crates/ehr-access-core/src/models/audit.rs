//! Audit log domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::actor::{ActorId, ActorRole};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Request,
    Grant,
    Revoke,
    /// A lapsed grant materialized as revoked by the expiry sweep.
    Expire,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub actor_id: ActorId,
    pub actor_role: ActorRole,
    pub permission_id: Uuid,
    pub patient_id: ActorId,
    pub provider_id: ActorId,
    /// Human-readable summary shown on the patient's audit page.
    pub details: String,
}
