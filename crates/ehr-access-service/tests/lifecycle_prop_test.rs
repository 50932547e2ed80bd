//! Property tests over random sequences of lifecycle operations.
//!
//! Invariants checked after every step:
//! - at most one pending or granted record per (patient, provider) pair
//! - a revoked record never changes again
//! - `date_modified` never moves backwards or before `date_requested`
//! - `is_currently_granted` agrees with the records themselves
//! - no operation ever fails with a storage error

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use ehr_access_core::clock::{Clock, ManualClock};
use ehr_access_core::error::AccessError;
use ehr_access_core::models::actor::{Actor, ActorId};
use ehr_access_core::models::permission::{
    AccessRequest, GrantOptions, PermissionRecord, PermissionStatus,
};
use ehr_access_core::notify::DiscardSink;
use ehr_access_service::{AccessConfig, AccessPermissionStore};
use ehr_access_store::InMemoryPermissionRepository;
use proptest::prelude::*;
use uuid::Uuid;

const PATIENTS: [&str; 2] = ["p1", "p2"];
const PROVIDERS: [&str; 3] = ["doc1", "doc2", "doc3"];

#[derive(Debug, Clone)]
enum Op {
    Request { provider: usize, patient: usize },
    Grant { pick: usize, as_owner: bool, days: Option<i64> },
    Revoke { pick: usize, by_patient: bool },
    Advance { hours: i64 },
    Expire,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..PROVIDERS.len(), 0..PATIENTS.len())
            .prop_map(|(provider, patient)| Op::Request { provider, patient }),
        (any::<usize>(), any::<bool>(), proptest::option::of(-3i64..10))
            .prop_map(|(pick, as_owner, days)| Op::Grant { pick, as_owner, days }),
        (any::<usize>(), any::<bool>())
            .prop_map(|(pick, by_patient)| Op::Revoke { pick, by_patient }),
        (1i64..72).prop_map(|hours| Op::Advance { hours }),
        Just(Op::Expire),
    ]
}

fn all_records(
    store: &AccessPermissionStore<InMemoryPermissionRepository, DiscardSink, Arc<ManualClock>>,
) -> Vec<PermissionRecord> {
    PATIENTS
        .iter()
        .flat_map(|p| store.list_for_patient(&ActorId::from(*p)).unwrap())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_lifecycle_invariants_hold(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let store = AccessPermissionStore::with_clock(
            InMemoryPermissionRepository::new(),
            DiscardSink,
            clock.clone(),
            AccessConfig::default(),
        );
        let mut ids: Vec<Uuid> = Vec::new();
        let mut revoked: HashMap<Uuid, PermissionRecord> = HashMap::new();
        let mut last_modified: HashMap<Uuid, DateTime<Utc>> = HashMap::new();

        for op in ops {
            let result = match op {
                Op::Request { provider, patient } => store
                    .request_access(&Actor::provider(PROVIDERS[provider]), AccessRequest::new(PATIENTS[patient]))
                    .map(|r| ids.push(r.id)),
                Op::Grant { pick, as_owner, days } if !ids.is_empty() => {
                    let rec = store.get(ids[pick % ids.len()]).unwrap();
                    let actor = if as_owner {
                        Actor::patient(rec.patient_id.clone())
                    } else {
                        Actor::patient("intruder")
                    };
                    let options = match days {
                        Some(d) => GrantOptions::until(clock.now() + Duration::days(d)),
                        None => GrantOptions::default(),
                    };
                    store.grant(&actor, rec.id, options).map(|_| ())
                }
                Op::Revoke { pick, by_patient } if !ids.is_empty() => {
                    let rec = store.get(ids[pick % ids.len()]).unwrap();
                    let actor = if by_patient {
                        Actor::patient(rec.patient_id.clone())
                    } else {
                        Actor::provider(rec.provider_id.clone())
                    };
                    store.revoke(&actor, rec.id).map(|_| ())
                }
                Op::Advance { hours } => {
                    clock.advance(Duration::hours(hours));
                    Ok(())
                }
                Op::Expire => store.expire_lapsed(clock.now()).map(|_| ()),
                _ => Ok(()),
            };
            if let Err(err) = result {
                prop_assert!(!matches!(err, AccessError::Storage(_)), "storage error: {err:?}");
            }

            let now = clock.now();
            let records = all_records(&store);
            let mut live: HashMap<(ActorId, ActorId), usize> = HashMap::new();
            for rec in &records {
                if rec.status.is_live() {
                    *live.entry((rec.patient_id.clone(), rec.provider_id.clone())).or_default() += 1;
                }
                prop_assert!(rec.date_modified >= rec.date_requested);
                if let Some(previous) = last_modified.insert(rec.id, rec.date_modified) {
                    prop_assert!(rec.date_modified >= previous);
                }
                if let Some(before) = revoked.get(&rec.id) {
                    prop_assert_eq!(before, rec);
                }
                if rec.status == PermissionStatus::Revoked {
                    revoked.entry(rec.id).or_insert_with(|| rec.clone());
                }
            }
            prop_assert!(live.values().all(|n| *n == 1));

            for patient in PATIENTS {
                for provider in PROVIDERS {
                    let expected = records.iter().any(|r| {
                        r.patient_id.as_str() == patient
                            && r.provider_id.as_str() == provider
                            && r.grants_access_at(now)
                    });
                    let actual = store
                        .is_currently_granted(&ActorId::from(provider), &ActorId::from(patient), now)
                        .unwrap();
                    prop_assert_eq!(expected, actual);
                }
            }
        }
    }
}
