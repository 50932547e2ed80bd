//! Per-user notification inbox.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use ehr_access_core::error::NotifyError;
use ehr_access_core::models::actor::{ActorId, ActorRole};
use ehr_access_core::models::event::PermissionEvent;
use ehr_access_core::models::notification::{Notification, NotificationKind};
use ehr_access_core::models::permission::PermissionStatus;
use ehr_access_core::notify::NotificationSink;
use uuid::Uuid;

/// Delivers one notification per transition to the counterparty of the
/// actor: patients hear about requests and withdrawals, providers about
/// grants, revocations and expiries.
#[derive(Debug, Default)]
pub struct NotificationInbox {
    by_user: Mutex<HashMap<ActorId, Vec<Notification>>>,
}

impl NotificationInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications for `user_id`, newest first.
    pub fn for_user(&self, user_id: &ActorId) -> Result<Vec<Notification>, NotifyError> {
        let inbox = self.lock()?;
        let mut out = inbox.get(user_id).cloned().unwrap_or_default();
        out.reverse();
        Ok(out)
    }

    pub fn unread_count(&self, user_id: &ActorId) -> Result<usize, NotifyError> {
        let inbox = self.lock()?;
        Ok(inbox
            .get(user_id)
            .map_or(0, |list| list.iter().filter(|n| !n.read).count()))
    }

    /// Returns false when the user has no such notification.
    pub fn mark_read(&self, user_id: &ActorId, notification_id: Uuid) -> Result<bool, NotifyError> {
        let mut inbox = self.lock()?;
        let target = inbox
            .get_mut(user_id)
            .and_then(|list| list.iter_mut().find(|n| n.id == notification_id));
        match target {
            Some(notification) => {
                notification.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn mark_all_read(&self, user_id: &ActorId) -> Result<(), NotifyError> {
        let mut inbox = self.lock()?;
        if let Some(list) = inbox.get_mut(user_id) {
            list.iter_mut().for_each(|n| n.read = true);
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<ActorId, Vec<Notification>>>, NotifyError> {
        self.by_user
            .lock()
            .map_err(|_| NotifyError::Unavailable("notification inbox lock poisoned".into()))
    }
}

/// Recipient, title and message for an event.
fn compose(event: &PermissionEvent) -> (ActorId, &'static str, String) {
    let provider = &event.provider_id;
    let patient = &event.patient_id;
    match (event.from_status, event.to_status, event.actor_role) {
        (_, PermissionStatus::Pending, _) => (
            patient.clone(),
            "New access request",
            format!("Provider {provider} has requested access to your medical records."),
        ),
        (Some(PermissionStatus::Granted), PermissionStatus::Granted, _) => (
            provider.clone(),
            "Access updated",
            format!("Patient {patient} updated your access to their records."),
        ),
        (_, PermissionStatus::Granted, _) => (
            provider.clone(),
            "Access granted",
            format!("Patient {patient} granted you access to their records."),
        ),
        (_, PermissionStatus::Revoked, ActorRole::Provider) => (
            patient.clone(),
            "Access request withdrawn",
            format!("Provider {provider} withdrew their request for access."),
        ),
        (_, PermissionStatus::Revoked, ActorRole::System) => (
            provider.clone(),
            "Access expired",
            format!("Your access to patient {patient}'s records has expired."),
        ),
        (Some(PermissionStatus::Pending), PermissionStatus::Revoked, _) => (
            provider.clone(),
            "Access request declined",
            format!("Patient {patient} declined your request for access."),
        ),
        (_, PermissionStatus::Revoked, _) => (
            provider.clone(),
            "Access revoked",
            format!("Patient {patient} revoked your access to their records."),
        ),
    }
}

impl NotificationSink for NotificationInbox {
    fn emit(&self, event: &PermissionEvent) -> Result<(), NotifyError> {
        let (user_id, title, message) = compose(event);
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: user_id.clone(),
            title: title.into(),
            message,
            date: event.timestamp,
            read: false,
            kind: NotificationKind::Access,
            related_id: event.permission_id,
        };
        self.lock()?.entry(user_id).or_default().push(notification);
        Ok(())
    }
}
