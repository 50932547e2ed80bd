//! Integration tests for the in-memory permission repository.

use chrono::{DateTime, Duration, TimeZone, Utc};
use ehr_access_core::error::AccessError;
use ehr_access_core::models::permission::{CreatePermission, PermissionStatus, StatusChange};
use ehr_access_core::repository::{CreateOutcome, Pagination, PermissionRepository};
use ehr_access_store::InMemoryPermissionRepository;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap()
}

fn pending(patient: &str, provider: &str) -> CreatePermission {
    CreatePermission {
        patient_id: patient.into(),
        provider_id: provider.into(),
        provider_name: None,
        provider_specialty: None,
        status: PermissionStatus::Pending,
        requested_at: t0(),
        expiration_date: None,
        idempotency_key: None,
    }
}

fn to(status: PermissionStatus, at: DateTime<Utc>) -> StatusChange {
    StatusChange {
        status,
        modified_at: at,
        expiration_date: None,
    }
}

// -----------------------------------------------------------------------
// Create
// -----------------------------------------------------------------------

#[test]
fn create_and_get_permission() {
    let repo = InMemoryPermissionRepository::new();

    let created = repo.create(pending("p1", "doc1")).unwrap().into_record();
    assert_eq!(created.status, PermissionStatus::Pending);
    assert_eq!(created.date_requested, t0());
    assert_eq!(created.date_modified, t0());

    let fetched = repo.get_by_id(created.id).unwrap();
    assert_eq!(fetched, created);
}

#[test]
fn get_unknown_id_is_not_found() {
    let repo = InMemoryPermissionRepository::new();
    let err = repo.get_by_id(uuid::Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, AccessError::NotFound { .. }), "got {err:?}");
}

#[test]
fn second_live_record_for_pair_conflicts() {
    let repo = InMemoryPermissionRepository::new();
    let first = repo.create(pending("p1", "doc2")).unwrap().into_record();

    let err = repo.create(pending("p1", "doc2")).unwrap_err();
    match err {
        AccessError::Conflict { existing_id, .. } => assert_eq!(existing_id, first.id),
        other => panic!("expected Conflict, got {other:?}"),
    }

    // Different pairs are independent.
    repo.create(pending("p2", "doc2")).unwrap();
    repo.create(pending("p1", "doc3")).unwrap();
}

#[test]
fn revoked_record_frees_the_pair() {
    let repo = InMemoryPermissionRepository::new();
    let first = repo.create(pending("p1", "doc1")).unwrap().into_record();
    repo.transition(
        first.id,
        PermissionStatus::Pending,
        to(PermissionStatus::Revoked, t0() + Duration::hours(1)),
    )
    .unwrap();

    assert!(repo.find_live(&"p1".into(), &"doc1".into()).unwrap().is_none());
    let second = repo.create(pending("p1", "doc1")).unwrap().into_record();
    assert_ne!(second.id, first.id);
    assert_eq!(repo.list_by_patient(&"p1".into()).unwrap().len(), 2);
}

#[test]
fn idempotency_key_replays_original_record() {
    let repo = InMemoryPermissionRepository::new();
    let mut input = pending("p1", "doc1");
    input.idempotency_key = Some("doc1:req-42".into());

    let first = repo.create(input.clone()).unwrap();
    assert!(matches!(first, CreateOutcome::Created(_)));

    let replay = repo.create(input).unwrap();
    assert!(matches!(replay, CreateOutcome::Replayed(_)));
    assert_eq!(replay.record().id, first.record().id);
    assert_eq!(repo.list_by_patient(&"p1".into()).unwrap().len(), 1);
}

#[test]
fn idempotency_key_reused_for_other_patient_is_rejected() {
    let repo = InMemoryPermissionRepository::new();
    let mut first = pending("p1", "doc1");
    first.idempotency_key = Some("doc1:k".into());
    repo.create(first).unwrap();

    let mut other = pending("p2", "doc1");
    other.idempotency_key = Some("doc1:k".into());
    let err = repo.create(other).unwrap_err();
    assert!(matches!(err, AccessError::Validation { .. }), "got {err:?}");
    assert!(repo.list_by_patient(&"p2".into()).unwrap().is_empty());
}

#[test]
fn create_rejects_revoked_initial_status() {
    let repo = InMemoryPermissionRepository::new();
    let mut input = pending("p1", "doc1");
    input.status = PermissionStatus::Revoked;
    let err = repo.create(input).unwrap_err();
    assert!(matches!(err, AccessError::Validation { .. }), "got {err:?}");
}

#[test]
fn create_rejects_expiry_before_request() {
    let repo = InMemoryPermissionRepository::new();
    let mut input = pending("p1", "doc1");
    input.status = PermissionStatus::Granted;
    input.expiration_date = Some(t0() - Duration::days(1));
    let err = repo.create(input).unwrap_err();
    assert!(matches!(err, AccessError::Validation { .. }), "got {err:?}");
    assert!(repo.find_live(&"p1".into(), &"doc1".into()).unwrap().is_none());
}

// -----------------------------------------------------------------------
// Transition
// -----------------------------------------------------------------------

#[test]
fn transition_requires_expected_status() {
    let repo = InMemoryPermissionRepository::new();
    let rec = repo.create(pending("p1", "doc1")).unwrap().into_record();

    let err = repo
        .transition(rec.id, PermissionStatus::Granted, to(PermissionStatus::Revoked, t0()))
        .unwrap_err();
    match err {
        AccessError::InvalidState { status, .. } => assert_eq!(status, PermissionStatus::Pending),
        other => panic!("expected InvalidState, got {other:?}"),
    }
    assert_eq!(repo.get_by_id(rec.id).unwrap().status, PermissionStatus::Pending);
}

#[test]
fn revoked_is_terminal_even_when_expected() {
    let repo = InMemoryPermissionRepository::new();
    let rec = repo.create(pending("p1", "doc1")).unwrap().into_record();
    repo.transition(rec.id, PermissionStatus::Pending, to(PermissionStatus::Revoked, t0()))
        .unwrap();

    let err = repo
        .transition(rec.id, PermissionStatus::Revoked, to(PermissionStatus::Granted, t0()))
        .unwrap_err();
    assert!(matches!(err, AccessError::InvalidState { .. }), "got {err:?}");
}

#[test]
fn modified_timestamp_never_moves_backwards() {
    let repo = InMemoryPermissionRepository::new();
    let rec = repo.create(pending("p1", "doc1")).unwrap().into_record();

    let granted = repo
        .transition(
            rec.id,
            PermissionStatus::Pending,
            to(PermissionStatus::Granted, t0() + Duration::days(2)),
        )
        .unwrap();
    assert_eq!(granted.date_modified, t0() + Duration::days(2));

    // A clock that stepped backwards is clamped.
    let revoked = repo
        .transition(
            rec.id,
            PermissionStatus::Granted,
            to(PermissionStatus::Revoked, t0() + Duration::days(1)),
        )
        .unwrap();
    assert_eq!(revoked.date_modified, granted.date_modified);
    assert!(revoked.date_modified >= revoked.date_requested);
}

#[test]
fn expiration_update_can_set_and_clear() {
    let repo = InMemoryPermissionRepository::new();
    let rec = repo.create(pending("p1", "doc1")).unwrap().into_record();
    let exp = t0() + Duration::days(90);

    let granted = repo
        .transition(
            rec.id,
            PermissionStatus::Pending,
            StatusChange {
                status: PermissionStatus::Granted,
                modified_at: t0(),
                expiration_date: Some(Some(exp)),
            },
        )
        .unwrap();
    assert_eq!(granted.expiration_date, Some(exp));

    let regranted = repo
        .transition(
            rec.id,
            PermissionStatus::Granted,
            StatusChange {
                status: PermissionStatus::Granted,
                modified_at: t0(),
                expiration_date: Some(None),
            },
        )
        .unwrap();
    assert_eq!(regranted.expiration_date, None);

    // `None` leaves it alone.
    let revoked = repo
        .transition(rec.id, PermissionStatus::Granted, to(PermissionStatus::Revoked, t0()))
        .unwrap();
    assert_eq!(revoked.expiration_date, None);
}

// -----------------------------------------------------------------------
// Listing
// -----------------------------------------------------------------------

#[test]
fn list_by_patient_and_provider_use_their_index() {
    let repo = InMemoryPermissionRepository::new();
    repo.create(pending("p1", "doc1")).unwrap();
    repo.create(pending("p1", "doc2")).unwrap();
    repo.create(pending("p2", "doc1")).unwrap();

    let p1 = repo.list_by_patient(&"p1".into()).unwrap();
    assert_eq!(p1.len(), 2);
    assert!(p1.iter().all(|r| r.patient_id.as_str() == "p1"));

    let doc1 = repo.list_by_provider(&"doc1".into()).unwrap();
    assert_eq!(doc1.len(), 2);
    assert!(doc1.iter().all(|r| r.provider_id.as_str() == "doc1"));

    assert!(repo.list_by_patient(&"nobody".into()).unwrap().is_empty());
}

#[test]
fn list_by_status_filters() {
    let repo = InMemoryPermissionRepository::new();
    let a = repo.create(pending("p1", "doc1")).unwrap().into_record();
    repo.create(pending("p2", "doc1")).unwrap();
    repo.transition(a.id, PermissionStatus::Pending, to(PermissionStatus::Granted, t0()))
        .unwrap();

    let granted = repo.list_by_status(PermissionStatus::Granted).unwrap();
    assert_eq!(granted.len(), 1);
    assert_eq!(granted[0].id, a.id);
    assert_eq!(repo.list_by_status(PermissionStatus::Pending).unwrap().len(), 1);
}

#[test]
fn list_with_pagination() {
    let repo = InMemoryPermissionRepository::new();
    for i in 0..5 {
        repo.create(pending(&format!("p{i}"), "doc1")).unwrap();
    }

    let page1 = repo.list(Pagination { offset: 0, limit: 3 }).unwrap();
    assert_eq!(page1.items.len(), 3);
    assert_eq!(page1.total, 5);

    let page2 = repo.list(Pagination { offset: 3, limit: 3 }).unwrap();
    assert_eq!(page2.items.len(), 2);
    assert_eq!(page2.offset, 3);
}

#[test]
fn clones_share_storage() {
    let repo = InMemoryPermissionRepository::new();
    let handle = repo.clone();
    let rec = repo.create(pending("p1", "doc1")).unwrap().into_record();
    assert_eq!(handle.get_by_id(rec.id).unwrap().id, rec.id);
}

#[test]
fn concurrent_requests_for_one_pair_create_exactly_one_record() {
    let repo = InMemoryPermissionRepository::new();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let repo = repo.clone();
            std::thread::spawn(move || repo.create(pending("p1", "doc1")).is_ok())
        })
        .collect();
    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 1);
    assert_eq!(repo.list_by_patient(&"p1".into()).unwrap().len(), 1);
}
