//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are synchronous and atomic: a call either
//! applies completely or leaves storage untouched. Implementations must
//! make the uniqueness check in [`PermissionRepository::create`] and the
//! status compare in [`PermissionRepository::transition`] atomic with
//! the write that follows them.

use uuid::Uuid;

use crate::error::AccessResult;
use crate::models::actor::ActorId;
use crate::models::permission::{
    CreatePermission, PermissionRecord, PermissionStatus, StatusChange,
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// Result of [`PermissionRepository::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new record was written.
    Created(PermissionRecord),
    /// The idempotency key was already used; this is the record it created.
    Replayed(PermissionRecord),
}

impl CreateOutcome {
    pub fn record(&self) -> &PermissionRecord {
        match self {
            CreateOutcome::Created(r) | CreateOutcome::Replayed(r) => r,
        }
    }

    pub fn into_record(self) -> PermissionRecord {
        match self {
            CreateOutcome::Created(r) | CreateOutcome::Replayed(r) => r,
        }
    }
}

pub trait PermissionRepository: Send + Sync {
    /// Insert a new record.
    ///
    /// Fails with `Conflict` if a live record exists for the same
    /// patient/provider pair, unless `idempotency_key` matches an
    /// earlier create, in which case that earlier record is returned.
    fn create(&self, input: CreatePermission) -> AccessResult<CreateOutcome>;

    fn get_by_id(&self, id: Uuid) -> AccessResult<PermissionRecord>;

    /// Apply `change` only if the stored status still equals `expected`.
    ///
    /// Fails with `InvalidState` (carrying the actual status) when it
    /// does not. `date_modified` never moves backwards.
    fn transition(
        &self,
        id: Uuid,
        expected: PermissionStatus,
        change: StatusChange,
    ) -> AccessResult<PermissionRecord>;

    /// The live record for a pair, if any.
    fn find_live(
        &self,
        patient_id: &ActorId,
        provider_id: &ActorId,
    ) -> AccessResult<Option<PermissionRecord>>;

    /// All records naming `patient_id`, oldest request first.
    fn list_by_patient(&self, patient_id: &ActorId) -> AccessResult<Vec<PermissionRecord>>;

    /// All records naming `provider_id`, oldest request first.
    fn list_by_provider(&self, provider_id: &ActorId) -> AccessResult<Vec<PermissionRecord>>;

    fn list_by_status(&self, status: PermissionStatus) -> AccessResult<Vec<PermissionRecord>>;

    fn list(&self, pagination: Pagination) -> AccessResult<PaginatedResult<PermissionRecord>>;
}
