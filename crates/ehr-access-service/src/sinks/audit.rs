//! Append-only audit trail of permission transitions.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use ehr_access_core::error::NotifyError;
use ehr_access_core::models::actor::{ActorId, ActorRole};
use ehr_access_core::models::audit::{AuditAction, AuditLogEntry};
use ehr_access_core::models::event::PermissionEvent;
use ehr_access_core::models::permission::PermissionStatus;
use ehr_access_core::notify::NotificationSink;
use uuid::Uuid;

/// Query filters for audit log entries.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub patient_id: Option<ActorId>,
    pub actor_id: Option<ActorId>,
    pub action: Option<AuditAction>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl AuditFilter {
    fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.patient_id.as_ref().is_none_or(|id| &entry.patient_id == id)
            && self.actor_id.as_ref().is_none_or(|id| &entry.actor_id == id)
            && self.action.is_none_or(|a| entry.action == a)
            && self.from.is_none_or(|from| entry.timestamp >= from)
            && self.to.is_none_or(|to| entry.timestamp <= to)
    }
}

/// In-memory audit log. Entries are appended, never changed.
#[derive(Debug, Default)]
pub struct AuditTrail {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matching entries, oldest first.
    pub fn entries(&self, filter: &AuditFilter) -> Result<Vec<AuditLogEntry>, NotifyError> {
        Ok(self
            .lock()?
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    pub fn len(&self) -> Result<usize, NotifyError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, NotifyError> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<AuditLogEntry>>, NotifyError> {
        self.entries
            .lock()
            .map_err(|_| NotifyError::Unavailable("audit trail lock poisoned".into()))
    }
}

fn classify(event: &PermissionEvent) -> (AuditAction, String) {
    let provider = &event.provider_id;
    let patient = &event.patient_id;
    match (event.from_status, event.to_status, event.actor_role) {
        (None, PermissionStatus::Pending, _) => (
            AuditAction::Request,
            format!("Provider {provider} requested access to patient {patient}'s records"),
        ),
        (Some(PermissionStatus::Granted), PermissionStatus::Granted, _) => (
            AuditAction::Grant,
            format!("Patient {patient} renewed provider {provider}'s access"),
        ),
        (_, PermissionStatus::Granted, _) => (
            AuditAction::Grant,
            format!("Patient {patient} granted provider {provider} access"),
        ),
        (_, PermissionStatus::Revoked, ActorRole::System) => (
            AuditAction::Expire,
            format!("Access for provider {provider} to patient {patient}'s records expired"),
        ),
        (_, PermissionStatus::Revoked, ActorRole::Provider) => (
            AuditAction::Revoke,
            format!("Provider {provider} withdrew their access request"),
        ),
        (Some(PermissionStatus::Pending), PermissionStatus::Revoked, _) => (
            AuditAction::Revoke,
            format!("Patient {patient} declined provider {provider}'s access request"),
        ),
        (_, PermissionStatus::Revoked, _) => (
            AuditAction::Revoke,
            format!("Patient {patient} revoked provider {provider}'s access"),
        ),
        (_, PermissionStatus::Pending, _) => (
            AuditAction::Request,
            format!("Provider {provider} access request to patient {patient} is pending"),
        ),
    }
}

impl NotificationSink for AuditTrail {
    fn emit(&self, event: &PermissionEvent) -> Result<(), NotifyError> {
        let (action, details) = classify(event);
        let entry = AuditLogEntry {
            id: Uuid::new_v4(),
            timestamp: event.timestamp,
            action,
            actor_id: event.actor_id.clone(),
            actor_role: event.actor_role,
            permission_id: event.permission_id,
            patient_id: event.patient_id.clone(),
            provider_id: event.provider_id.clone(),
            details,
        };
        self.lock()?.push(entry);
        Ok(())
    }
}
