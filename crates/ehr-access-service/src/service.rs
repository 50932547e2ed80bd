//! Access permission store: lifecycle transitions and the
//! authorization predicate.
//!
//! Every role check lives here. Callers present an [`Actor`] and the
//! store decides whether that actor may perform the transition; no
//! caller inspects roles on its own.

use chrono::{DateTime, Duration, Utc};
use ehr_access_core::clock::{Clock, SystemClock};
use ehr_access_core::error::{AccessError, AccessResult};
use ehr_access_core::models::actor::{Actor, ActorId, ActorRole};
use ehr_access_core::models::event::PermissionEvent;
use ehr_access_core::models::permission::{
    AccessRequest, CreatePermission, DirectGrant, EffectiveStatus, GrantOptions,
    PermissionRecord, PermissionStatus, StatusChange,
};
use ehr_access_core::notify::NotificationSink;
use ehr_access_core::repository::{CreateOutcome, Pagination, PermissionRepository};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AccessConfig;
use crate::documents::DocumentGate;
use crate::query::PermissionQuery;

/// Access permission store.
///
/// Generic over repository, sink and clock so that the lifecycle rules
/// have no dependency on any storage or delivery mechanism.
pub struct AccessPermissionStore<R, N, C = SystemClock>
where
    R: PermissionRepository,
    N: NotificationSink,
    C: Clock,
{
    repo: R,
    sink: N,
    clock: C,
    config: AccessConfig,
}

impl<R: PermissionRepository, N: NotificationSink> AccessPermissionStore<R, N, SystemClock> {
    pub fn new(repo: R, sink: N, config: AccessConfig) -> Self {
        Self::with_clock(repo, sink, SystemClock, config)
    }
}

impl<R, N, C> AccessPermissionStore<R, N, C>
where
    R: PermissionRepository,
    N: NotificationSink,
    C: Clock,
{
    pub fn with_clock(repo: R, sink: N, clock: C, config: AccessConfig) -> Self {
        Self {
            repo,
            sink,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// A provider asks for access to a patient's records.
    ///
    /// Creates a `Pending` record. Fails with `Conflict` while another
    /// pending or granted record exists for the pair. A retry carrying
    /// the same idempotency key returns the original record and emits
    /// nothing.
    pub fn request_access(
        &self,
        provider: &Actor,
        request: AccessRequest,
    ) -> AccessResult<PermissionRecord> {
        if provider.role != ActorRole::Provider {
            return Err(AccessError::forbidden(format!(
                "{} {} cannot request access; only providers can",
                provider.role, provider.id
            )));
        }

        // Keys are scoped per provider so two providers can't collide.
        let idempotency_key = request
            .idempotency_key
            .map(|key| format!("{}:{key}", provider.id));

        let outcome = self.repo.create(CreatePermission {
            patient_id: request.patient_id,
            provider_id: provider.id.clone(),
            provider_name: request.provider_name,
            provider_specialty: request.provider_specialty,
            status: PermissionStatus::Pending,
            requested_at: self.clock.now(),
            expiration_date: None,
            idempotency_key,
        })?;

        match outcome {
            CreateOutcome::Created(record) => {
                info!(
                    permission_id = %record.id,
                    patient_id = %record.patient_id,
                    provider_id = %record.provider_id,
                    "Access requested"
                );
                self.emit(PermissionEvent::transition(&record, None, provider));
                Ok(record)
            }
            CreateOutcome::Replayed(record) => {
                debug!(permission_id = %record.id, "Duplicate access request replayed");
                Ok(record)
            }
        }
    }

    /// The referenced patient grants (or re-grants) access.
    ///
    /// Checks run in order: existence, patient authority, terminal
    /// status, then the expiration bound.
    pub fn grant(
        &self,
        patient: &Actor,
        permission_id: Uuid,
        options: GrantOptions,
    ) -> AccessResult<PermissionRecord> {
        let record = self.repo.get_by_id(permission_id)?;

        if !patient.is_patient(&record.patient_id) {
            return Err(AccessError::forbidden(format!(
                "only patient {} can grant permission {}",
                record.patient_id, record.id
            )));
        }
        if record.status.is_terminal() {
            return Err(AccessError::InvalidState {
                id: record.id,
                status: record.status,
                action: "grant".into(),
            });
        }

        let now = self.clock.now();
        let expiration_date = self.resolve_expiration(now, options.expiration_date)?;
        if let Some(exp) = expiration_date {
            if exp <= record.date_requested {
                return Err(AccessError::validation(format!(
                    "expiration {exp} must be after the request date {}",
                    record.date_requested
                )));
            }
        }

        let updated = self.repo.transition(
            record.id,
            record.status,
            StatusChange {
                status: PermissionStatus::Granted,
                modified_at: now,
                expiration_date: Some(expiration_date),
            },
        )?;

        info!(
            permission_id = %updated.id,
            patient_id = %updated.patient_id,
            provider_id = %updated.provider_id,
            expires = ?updated.expiration_date,
            "Access granted"
        );
        self.emit(PermissionEvent::transition(&updated, Some(record.status), patient));
        Ok(updated)
    }

    /// A patient grants access to a provider who never asked.
    ///
    /// An outstanding request from that provider is granted in place;
    /// an existing grant is a `Conflict`.
    pub fn grant_direct(
        &self,
        patient: &Actor,
        grant: DirectGrant,
    ) -> AccessResult<PermissionRecord> {
        if patient.role != ActorRole::Patient {
            return Err(AccessError::forbidden(format!(
                "{} {} cannot grant access; only patients can",
                patient.role, patient.id
            )));
        }
        if !self.config.allow_direct_grant {
            return Err(AccessError::forbidden(
                "direct grants are disabled; the provider must request access first",
            ));
        }

        match self.repo.find_live(&patient.id, &grant.provider_id)? {
            Some(existing) if existing.status == PermissionStatus::Pending => {
                return self.grant(
                    patient,
                    existing.id,
                    GrantOptions {
                        expiration_date: grant.expiration_date,
                    },
                );
            }
            Some(existing) => {
                return Err(AccessError::Conflict {
                    patient_id: existing.patient_id,
                    provider_id: existing.provider_id,
                    existing_id: existing.id,
                });
            }
            None => {}
        }

        let now = self.clock.now();
        let record = self
            .repo
            .create(CreatePermission {
                patient_id: patient.id.clone(),
                provider_id: grant.provider_id,
                provider_name: grant.provider_name,
                provider_specialty: grant.provider_specialty,
                status: PermissionStatus::Granted,
                requested_at: now,
                expiration_date: self.resolve_expiration(now, grant.expiration_date)?,
                idempotency_key: None,
            })?
            .into_record();

        info!(
            permission_id = %record.id,
            patient_id = %record.patient_id,
            provider_id = %record.provider_id,
            "Access granted directly"
        );
        self.emit(PermissionEvent::transition(&record, None, patient));
        Ok(record)
    }

    /// Revoke a record.
    ///
    /// The patient may revoke at any time; the provider may only
    /// withdraw their own request while it is still pending.
    pub fn revoke(&self, actor: &Actor, permission_id: Uuid) -> AccessResult<PermissionRecord> {
        let record = self.repo.get_by_id(permission_id)?;

        let by_patient = actor.is_patient(&record.patient_id);
        let by_provider = actor.is_provider(&record.provider_id);
        if !by_patient && !by_provider {
            return Err(AccessError::forbidden(format!(
                "{} {} is not a party to permission {}",
                actor.role, actor.id, record.id
            )));
        }
        if record.status.is_terminal() {
            return Err(AccessError::InvalidState {
                id: record.id,
                status: record.status,
                action: "revoke".into(),
            });
        }
        if by_provider && record.status != PermissionStatus::Pending {
            return Err(AccessError::forbidden(format!(
                "provider {} can only withdraw a pending request; permission {} is {}",
                actor.id, record.id, record.status
            )));
        }

        let updated = self.repo.transition(
            record.id,
            record.status,
            StatusChange {
                status: PermissionStatus::Revoked,
                modified_at: self.clock.now(),
                expiration_date: None,
            },
        )?;

        info!(
            permission_id = %updated.id,
            actor_id = %actor.id,
            role = %actor.role,
            from = %record.status,
            "Access revoked"
        );
        self.emit(PermissionEvent::transition(&updated, Some(record.status), actor));
        Ok(updated)
    }

    /// Materialize lapsed grants as revoked, acting as the system.
    ///
    /// Each record is transitioned atomically on its own; a record that
    /// changed concurrently is skipped. Returns the records revoked by
    /// this call.
    pub fn expire_lapsed(&self, at: DateTime<Utc>) -> AccessResult<Vec<PermissionRecord>> {
        let system = Actor::system();
        let mut expired = Vec::new();

        let lapsed = self
            .repo
            .list_by_status(PermissionStatus::Granted)?
            .into_iter()
            .filter(|r| r.is_expired_at(at));

        for record in lapsed {
            let result = self.repo.transition(
                record.id,
                PermissionStatus::Granted,
                StatusChange {
                    status: PermissionStatus::Revoked,
                    modified_at: self.clock.now(),
                    expiration_date: None,
                },
            );
            match result {
                Ok(updated) => {
                    self.emit(PermissionEvent::transition(
                        &updated,
                        Some(PermissionStatus::Granted),
                        &system,
                    ));
                    expired.push(updated);
                }
                Err(AccessError::InvalidState { id, status, .. }) => {
                    debug!(permission_id = %id, %status, "Skipping record changed during sweep");
                }
                Err(err) => return Err(err),
            }
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "Expired lapsed grants");
        }
        Ok(expired)
    }

    // -----------------------------------------------------------------------
    // Authorization predicate
    // -----------------------------------------------------------------------

    /// Whether `provider_id` may see `patient_id`'s records at `at`.
    ///
    /// This is the only authorization check; document visibility goes
    /// through it and nothing else.
    pub fn is_currently_granted(
        &self,
        provider_id: &ActorId,
        patient_id: &ActorId,
        at: DateTime<Utc>,
    ) -> AccessResult<bool> {
        let granted = self
            .repo
            .find_live(patient_id, provider_id)?
            .is_some_and(|r| r.grants_access_at(at));
        debug!(%provider_id, %patient_id, %at, granted, "Access check");
        Ok(granted)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get(&self, permission_id: Uuid) -> AccessResult<PermissionRecord> {
        self.repo.get_by_id(permission_id)
    }

    pub fn list_for_patient(&self, patient_id: &ActorId) -> AccessResult<Vec<PermissionRecord>> {
        self.repo.list_by_patient(patient_id)
    }

    pub fn list_for_provider(&self, provider_id: &ActorId) -> AccessResult<Vec<PermissionRecord>> {
        self.repo.list_by_provider(provider_id)
    }

    /// Records the actor is a party to. The system actor has no view.
    pub fn list_visible_to(&self, actor: &Actor) -> AccessResult<Vec<PermissionRecord>> {
        match actor.role {
            ActorRole::Patient => self.list_for_patient(&actor.id),
            ActorRole::Provider => self.list_for_provider(&actor.id),
            ActorRole::System => Err(AccessError::forbidden(
                "the system actor has no permission view",
            )),
        }
    }

    pub fn query(&self, query: &PermissionQuery) -> AccessResult<Vec<PermissionRecord>> {
        let at = query.at.unwrap_or_else(|| self.clock.now());
        let candidates = match (&query.patient_id, &query.provider_id) {
            (Some(patient_id), _) => self.repo.list_by_patient(patient_id)?,
            (None, Some(provider_id)) => self.repo.list_by_provider(provider_id)?,
            (None, None) => self.list_all()?,
        };
        Ok(candidates
            .into_iter()
            .filter(|r| query.matches(r, at))
            .collect())
    }

    /// Requests awaiting the patient's decision.
    pub fn pending_for_patient(&self, patient_id: &ActorId) -> AccessResult<Vec<PermissionRecord>> {
        self.query(
            &PermissionQuery::for_patient(patient_id.clone()).with_status(EffectiveStatus::Pending),
        )
    }

    /// Grants still in force for the patient at `at`.
    pub fn active_for_patient(
        &self,
        patient_id: &ActorId,
        at: DateTime<Utc>,
    ) -> AccessResult<Vec<PermissionRecord>> {
        self.query(
            &PermissionQuery::for_patient(patient_id.clone())
                .with_status(EffectiveStatus::Granted)
                .at(at),
        )
    }

    /// Patients whose records the provider can currently see, sorted.
    pub fn patients_with_access(
        &self,
        provider_id: &ActorId,
        at: DateTime<Utc>,
    ) -> AccessResult<Vec<ActorId>> {
        let mut patients: Vec<ActorId> = self
            .repo
            .list_by_provider(provider_id)?
            .into_iter()
            .filter(|r| r.grants_access_at(at))
            .map(|r| r.patient_id)
            .collect();
        patients.sort();
        patients.dedup();
        Ok(patients)
    }

    /// Document visibility filter backed by this store.
    pub fn documents(&self) -> DocumentGate<'_, R, N, C> {
        DocumentGate::new(self)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn list_all(&self) -> AccessResult<Vec<PermissionRecord>> {
        let mut out = Vec::new();
        let mut page = Pagination::default();
        loop {
            let result = self.repo.list(page.clone())?;
            let fetched = result.items.len() as u64;
            out.extend(result.items);
            page.offset += fetched;
            if fetched == 0 || page.offset >= result.total {
                break;
            }
        }
        Ok(out)
    }

    fn resolve_expiration(
        &self,
        now: DateTime<Utc>,
        requested: Option<DateTime<Utc>>,
    ) -> AccessResult<Option<DateTime<Utc>>> {
        let expiration = match (requested, self.config.default_grant_lifetime()) {
            (Some(exp), _) => Some(exp),
            (None, Some(lifetime)) => Some(offset(now, lifetime, "default_grant_lifetime_days")?),
            (None, None) => None,
        };
        match self.config.max_grant_lifetime() {
            Some(max) => {
                let bound = offset(now, max, "max_grant_lifetime_days")?;
                Ok(Some(expiration.map_or(bound, |exp| exp.min(bound))))
            }
            None => Ok(expiration),
        }
    }

    /// Best-effort delivery. The transition is already committed.
    fn emit(&self, event: PermissionEvent) {
        if let Err(err) = self.sink.emit(&event) {
            warn!(
                permission_id = %event.permission_id,
                to = %event.to_status,
                error = %err,
                "Notification sink failed; transition kept"
            );
        }
    }
}

/// `now + lifetime`, or a validation error naming the offending setting.
fn offset(now: DateTime<Utc>, lifetime: Duration, setting: &str) -> AccessResult<DateTime<Utc>> {
    now.checked_add_signed(lifetime).ok_or_else(|| {
        AccessError::validation(format!(
            "{setting} of {} days reaches past the supported date range",
            lifetime.num_days()
        ))
    })
}
