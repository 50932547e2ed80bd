//! Read-side filters over permission records.

use chrono::{DateTime, Utc};
use ehr_access_core::models::actor::ActorId;
use ehr_access_core::models::permission::{EffectiveStatus, PermissionRecord};

/// Filter for [`AccessPermissionStore::query`].
///
/// Status filtering uses the effective status at `at`, so a lapsed
/// grant shows up as `Expired` rather than `Granted`. `at` defaults to
/// the store clock.
///
/// [`AccessPermissionStore::query`]: crate::AccessPermissionStore::query
#[derive(Debug, Clone, Default)]
pub struct PermissionQuery {
    pub patient_id: Option<ActorId>,
    pub provider_id: Option<ActorId>,
    pub status: Option<EffectiveStatus>,
    pub at: Option<DateTime<Utc>>,
}

impl PermissionQuery {
    pub fn for_patient(patient_id: impl Into<ActorId>) -> Self {
        Self {
            patient_id: Some(patient_id.into()),
            ..Default::default()
        }
    }

    pub fn for_provider(provider_id: impl Into<ActorId>) -> Self {
        Self {
            provider_id: Some(provider_id.into()),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: EffectiveStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = Some(at);
        self
    }

    pub(crate) fn matches(&self, record: &PermissionRecord, at: DateTime<Utc>) -> bool {
        self.patient_id
            .as_ref()
            .is_none_or(|id| &record.patient_id == id)
            && self
                .provider_id
                .as_ref()
                .is_none_or(|id| &record.provider_id == id)
            && self
                .status
                .is_none_or(|status| record.effective_status(at) == status)
    }
}
