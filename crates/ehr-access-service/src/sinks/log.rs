//! Structured log sink.

use ehr_access_core::error::NotifyError;
use ehr_access_core::models::event::PermissionEvent;
use ehr_access_core::notify::NotificationSink;
use tracing::info;

/// Writes one `tracing` event per transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn emit(&self, event: &PermissionEvent) -> Result<(), NotifyError> {
        info!(
            target: "ehr_access::events",
            permission_id = %event.permission_id,
            patient_id = %event.patient_id,
            provider_id = %event.provider_id,
            from = ?event.from_status,
            to = %event.to_status,
            actor_id = %event.actor_id,
            actor_role = %event.actor_role,
            timestamp = %event.timestamp,
            "Permission transition"
        );
        Ok(())
    }
}
