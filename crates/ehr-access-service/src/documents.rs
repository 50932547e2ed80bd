//! Document visibility filtering.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use ehr_access_core::clock::Clock;
use ehr_access_core::error::AccessResult;
use ehr_access_core::models::actor::{Actor, ActorId, ActorRole};
use ehr_access_core::models::document::PatientDocument;
use ehr_access_core::notify::NotificationSink;
use ehr_access_core::repository::PermissionRepository;

use crate::service::AccessPermissionStore;

/// Decides which patient documents a viewer may see.
///
/// Patients see their own documents. Providers see a patient's
/// documents only while [`AccessPermissionStore::is_currently_granted`]
/// holds for that patient. The system actor sees none.
pub struct DocumentGate<'a, R, N, C>
where
    R: PermissionRepository,
    N: NotificationSink,
    C: Clock,
{
    store: &'a AccessPermissionStore<R, N, C>,
}

impl<'a, R, N, C> DocumentGate<'a, R, N, C>
where
    R: PermissionRepository,
    N: NotificationSink,
    C: Clock,
{
    pub(crate) fn new(store: &'a AccessPermissionStore<R, N, C>) -> Self {
        Self { store }
    }

    pub fn can_view(
        &self,
        viewer: &Actor,
        patient_id: &ActorId,
        at: DateTime<Utc>,
    ) -> AccessResult<bool> {
        match viewer.role {
            ActorRole::Patient => Ok(&viewer.id == patient_id),
            ActorRole::Provider => self.store.is_currently_granted(&viewer.id, patient_id, at),
            ActorRole::System => Ok(false),
        }
    }

    /// The subset of `documents` visible to `viewer` at `at`, in input order.
    pub fn visible<'d, D: PatientDocument>(
        &self,
        viewer: &Actor,
        documents: &'d [D],
        at: DateTime<Utc>,
    ) -> AccessResult<Vec<&'d D>> {
        let mut decisions: HashMap<&ActorId, bool> = HashMap::new();
        let mut out = Vec::new();
        for doc in documents {
            let patient_id = doc.patient_id();
            let allowed = match decisions.get(patient_id) {
                Some(allowed) => *allowed,
                None => {
                    let allowed = self.can_view(viewer, patient_id, at)?;
                    decisions.insert(patient_id, allowed);
                    allowed
                }
            };
            if allowed {
                out.push(doc);
            }
        }
        Ok(out)
    }
}
