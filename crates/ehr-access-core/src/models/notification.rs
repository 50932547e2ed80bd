//! User-facing notification model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::actor::ActorId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Access,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    /// Recipient.
    pub user_id: ActorId,
    pub title: String,
    pub message: String,
    pub date: DateTime<Utc>,
    pub read: bool,
    pub kind: NotificationKind,
    /// The permission record this notification is about.
    pub related_id: Uuid,
}
