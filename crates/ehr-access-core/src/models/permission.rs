//! Access permission domain model.
//!
//! A permission record links one patient to one provider. Its stored
//! status moves `Pending -> Granted -> Revoked` (or straight from
//! `Pending` to `Revoked`); expiry is evaluated at read time and never
//! written back except by an explicit sweep.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::actor::ActorId;

/// Stored lifecycle status of a permission record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Pending,
    Granted,
    /// Terminal.
    Revoked,
}

impl PermissionStatus {
    /// `Pending` and `Granted` records count against the one-per-pair limit.
    pub fn is_live(self) -> bool {
        !self.is_terminal()
    }

    pub fn is_terminal(self) -> bool {
        self == PermissionStatus::Revoked
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionStatus::Pending => "pending",
            PermissionStatus::Granted => "granted",
            PermissionStatus::Revoked => "revoked",
        };
        f.write_str(s)
    }
}

/// Read-time view of a record: stored status combined with expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectiveStatus {
    Pending,
    Granted,
    /// Stored as `Granted` but past its expiration date.
    Expired,
    Revoked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRecord {
    pub id: Uuid,
    pub patient_id: ActorId,
    pub provider_id: ActorId,
    /// Display name captured when the request was made.
    pub provider_name: Option<String>,
    pub provider_specialty: Option<String>,
    pub status: PermissionStatus,
    /// Set once at creation.
    pub date_requested: DateTime<Utc>,
    /// Advanced on every status transition, never moves backwards.
    pub date_modified: DateTime<Utc>,
    pub expiration_date: Option<DateTime<Utc>>,
}

impl PermissionRecord {
    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }

    /// A granted record whose expiration date is at or before `at`.
    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        self.status == PermissionStatus::Granted && self.expiration_date.is_some_and(|exp| exp <= at)
    }

    /// The authorization condition for a single record.
    pub fn grants_access_at(&self, at: DateTime<Utc>) -> bool {
        self.status == PermissionStatus::Granted && self.expiration_date.is_none_or(|exp| exp > at)
    }

    pub fn effective_status(&self, at: DateTime<Utc>) -> EffectiveStatus {
        match self.status {
            PermissionStatus::Pending => EffectiveStatus::Pending,
            PermissionStatus::Revoked => EffectiveStatus::Revoked,
            PermissionStatus::Granted if self.is_expired_at(at) => EffectiveStatus::Expired,
            PermissionStatus::Granted => EffectiveStatus::Granted,
        }
    }

    /// Check the per-record invariants. Returns a description of the
    /// first violation found.
    pub fn validate(&self) -> Result<(), String> {
        if self.patient_id == self.provider_id {
            return Err(format!(
                "permission {} names {} as both patient and provider",
                self.id, self.patient_id
            ));
        }
        if self.date_modified < self.date_requested {
            return Err(format!(
                "permission {} modified ({}) before it was requested ({})",
                self.id, self.date_modified, self.date_requested
            ));
        }
        if let Some(exp) = self.expiration_date {
            if exp <= self.date_requested {
                return Err(format!(
                    "permission {} expires ({exp}) at or before its request date ({})",
                    self.id, self.date_requested
                ));
            }
        }
        Ok(())
    }
}

/// Fields required to persist a new permission record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermission {
    pub patient_id: ActorId,
    pub provider_id: ActorId,
    pub provider_name: Option<String>,
    pub provider_specialty: Option<String>,
    /// `Pending` for provider requests, `Granted` for direct patient grants.
    pub status: PermissionStatus,
    pub requested_at: DateTime<Utc>,
    pub expiration_date: Option<DateTime<Utc>>,
    /// Replaying a create with a key already seen returns the original record.
    pub idempotency_key: Option<String>,
}

/// A status transition to apply to a stored record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: PermissionStatus,
    pub modified_at: DateTime<Utc>,
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    pub expiration_date: Option<Option<DateTime<Utc>>>,
}

/// A provider's request for access to a patient's records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessRequest {
    pub patient_id: ActorId,
    pub provider_name: Option<String>,
    pub provider_specialty: Option<String>,
    pub idempotency_key: Option<String>,
}

impl AccessRequest {
    pub fn new(patient_id: impl Into<ActorId>) -> Self {
        Self {
            patient_id: patient_id.into(),
            ..Default::default()
        }
    }

    pub fn with_provider_details(
        mut self,
        name: impl Into<String>,
        specialty: impl Into<String>,
    ) -> Self {
        self.provider_name = Some(name.into());
        self.provider_specialty = Some(specialty.into());
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Options accepted when a patient grants access.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrantOptions {
    /// `None` applies the configured default lifetime, if any.
    pub expiration_date: Option<DateTime<Utc>>,
}

impl GrantOptions {
    pub fn until(expiration_date: DateTime<Utc>) -> Self {
        Self {
            expiration_date: Some(expiration_date),
        }
    }
}

/// A patient-initiated grant with no prior provider request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectGrant {
    pub provider_id: ActorId,
    pub provider_name: Option<String>,
    pub provider_specialty: Option<String>,
    pub expiration_date: Option<DateTime<Utc>>,
}

impl DirectGrant {
    pub fn to(provider_id: impl Into<ActorId>) -> Self {
        Self {
            provider_id: provider_id.into(),
            ..Default::default()
        }
    }

    pub fn until(mut self, expiration_date: DateTime<Utc>) -> Self {
        self.expiration_date = Some(expiration_date);
        self
    }
}
