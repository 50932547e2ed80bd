//! In-memory implementation of [`PermissionRepository`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use ehr_access_core::error::{AccessError, AccessResult};
use ehr_access_core::models::actor::ActorId;
use ehr_access_core::models::permission::{
    CreatePermission, PermissionRecord, PermissionStatus, StatusChange,
};
use ehr_access_core::repository::{
    CreateOutcome, PaginatedResult, Pagination, PermissionRepository,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;

type PairKey = (ActorId, ActorId);

#[derive(Debug, Default)]
struct Tables {
    records: HashMap<Uuid, PermissionRecord>,
    /// Insertion order, for stable pagination.
    order: Vec<Uuid>,
    by_patient: HashMap<ActorId, Vec<Uuid>>,
    by_provider: HashMap<ActorId, Vec<Uuid>>,
    /// (patient, provider) -> the one live record for that pair.
    live: HashMap<PairKey, Uuid>,
    idempotency: HashMap<String, Uuid>,
}

impl Tables {
    fn insert(&mut self, record: PermissionRecord) {
        let id = record.id;
        if record.is_live() {
            self.live.insert(
                (record.patient_id.clone(), record.provider_id.clone()),
                id,
            );
        }
        self.by_patient
            .entry(record.patient_id.clone())
            .or_default()
            .push(id);
        self.by_provider
            .entry(record.provider_id.clone())
            .or_default()
            .push(id);
        self.order.push(id);
        self.records.insert(id, record);
    }

    fn fetch(&self, id: &Uuid) -> Result<&PermissionRecord, StoreError> {
        self.records.get(id).ok_or_else(|| StoreError::NotFound {
            entity: "permission".into(),
            id: id.to_string(),
        })
    }

    fn collect(&self, ids: Option<&Vec<Uuid>>) -> Result<Vec<PermissionRecord>, StoreError> {
        let mut out = ids
            .into_iter()
            .flatten()
            .map(|id| self.fetch(id).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        out.sort_by_key(|r| r.date_requested);
        Ok(out)
    }
}

/// In-memory implementation of the Permission repository.
///
/// Clones share the same tables. One mutex guards records and indexes
/// together, so the live-pair check and the write that follows it can
/// never interleave with another writer.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPermissionRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryPermissionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hydrate a repository from previously persisted records.
    ///
    /// Every record must satisfy the per-record invariants, ids must be
    /// unique and no two live records may share a patient/provider pair.
    pub fn from_records(records: Vec<PermissionRecord>) -> Result<Self, StoreError> {
        let mut tables = Tables::default();
        for record in records {
            record.validate().map_err(StoreError::Seed)?;
            if tables.records.contains_key(&record.id) {
                return Err(StoreError::Seed(format!(
                    "duplicate permission id {}",
                    record.id
                )));
            }
            let pair = (record.patient_id.clone(), record.provider_id.clone());
            if record.is_live() {
                if let Some(existing) = tables.live.get(&pair) {
                    return Err(StoreError::Seed(format!(
                        "permissions {existing} and {} are both live for patient {} and provider {}",
                        record.id, pair.0, pair.1
                    )));
                }
            }
            tables.insert(record);
        }

        info!(records = tables.records.len(), "Hydrated permission store");

        Ok(Self {
            tables: Arc::new(Mutex::new(tables)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl PermissionRepository for InMemoryPermissionRepository {
    fn create(&self, input: CreatePermission) -> AccessResult<CreateOutcome> {
        let mut tables = self.lock()?;

        if let Some(key) = &input.idempotency_key {
            if let Some(id) = tables.idempotency.get(key) {
                let record = tables.fetch(id)?.clone();
                if record.patient_id != input.patient_id || record.provider_id != input.provider_id {
                    return Err(AccessError::validation(format!(
                        "idempotency key reused for a different request; it belongs to permission {}",
                        record.id
                    )));
                }
                debug!(permission_id = %id, "Replaying idempotent create");
                return Ok(CreateOutcome::Replayed(record));
            }
        }

        let pair = (input.patient_id.clone(), input.provider_id.clone());
        if let Some(existing_id) = tables.live.get(&pair) {
            return Err(AccessError::Conflict {
                patient_id: pair.0,
                provider_id: pair.1,
                existing_id: *existing_id,
            });
        }

        if !input.status.is_live() {
            return Err(AccessError::validation(
                "new permissions must start pending or granted",
            ));
        }

        let record = PermissionRecord {
            id: Uuid::new_v4(),
            patient_id: input.patient_id,
            provider_id: input.provider_id,
            provider_name: input.provider_name,
            provider_specialty: input.provider_specialty,
            status: input.status,
            date_requested: input.requested_at,
            date_modified: input.requested_at,
            expiration_date: input.expiration_date,
        };
        record.validate().map_err(AccessError::validation)?;

        if let Some(key) = input.idempotency_key {
            tables.idempotency.insert(key, record.id);
        }
        tables.insert(record.clone());

        Ok(CreateOutcome::Created(record))
    }

    fn get_by_id(&self, id: Uuid) -> AccessResult<PermissionRecord> {
        let tables = self.lock()?;
        Ok(tables.fetch(&id)?.clone())
    }

    fn transition(
        &self,
        id: Uuid,
        expected: PermissionStatus,
        change: StatusChange,
    ) -> AccessResult<PermissionRecord> {
        let mut guard = self.lock()?;
        let tables = &mut *guard;

        let current = tables.fetch(&id)?;
        if current.status != expected || current.status.is_terminal() {
            return Err(AccessError::InvalidState {
                id,
                status: current.status,
                action: format!("move to {}", change.status),
            });
        }

        let mut updated = current.clone();
        updated.status = change.status;
        updated.date_modified = change.modified_at.max(current.date_modified);
        if let Some(expiration_date) = change.expiration_date {
            updated.expiration_date = expiration_date;
        }
        updated.validate().map_err(AccessError::validation)?;

        if updated.status.is_terminal() {
            tables
                .live
                .remove(&(updated.patient_id.clone(), updated.provider_id.clone()));
        }
        tables.records.insert(id, updated.clone());

        Ok(updated)
    }

    fn find_live(
        &self,
        patient_id: &ActorId,
        provider_id: &ActorId,
    ) -> AccessResult<Option<PermissionRecord>> {
        let tables = self.lock()?;
        let pair = (patient_id.clone(), provider_id.clone());
        match tables.live.get(&pair) {
            Some(id) => Ok(Some(tables.fetch(id)?.clone())),
            None => Ok(None),
        }
    }

    fn list_by_patient(&self, patient_id: &ActorId) -> AccessResult<Vec<PermissionRecord>> {
        let tables = self.lock()?;
        Ok(tables.collect(tables.by_patient.get(patient_id))?)
    }

    fn list_by_provider(&self, provider_id: &ActorId) -> AccessResult<Vec<PermissionRecord>> {
        let tables = self.lock()?;
        Ok(tables.collect(tables.by_provider.get(provider_id))?)
    }

    fn list_by_status(&self, status: PermissionStatus) -> AccessResult<Vec<PermissionRecord>> {
        let tables = self.lock()?;
        let mut out: Vec<PermissionRecord> = tables
            .order
            .iter()
            .filter_map(|id| tables.records.get(id))
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.date_requested);
        Ok(out)
    }

    fn list(&self, pagination: Pagination) -> AccessResult<PaginatedResult<PermissionRecord>> {
        let tables = self.lock()?;
        let total = tables.order.len() as u64;
        let items = tables
            .order
            .iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .map(|id| tables.fetch(id).cloned())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
