//! Assignment engine behaviour: uniqueness, revocation, validation, queries.

mod helpers;

use licensehub_core::config::LedgerConfig;
use licensehub_core::error::ErrorKind;
use licensehub_core::types::{AllocationId, GroupId, LicenseId, UserId};
use licensehub_entity::allocation::{AllocationHolder, HolderKind};
use licensehub_service::{AssignGroupRequest, AssignUserRequest};

use helpers::TestLedger;

#[tokio::test]
async fn test_duplicate_active_assignment_is_conflict() {
    let t = TestLedger::new();
    let license = t.license("IDE", 5).await;
    let user = t.directory.add_user("alice");

    let first = t.assign_user(license.id, user).await.unwrap();
    let err = t.assign_user(license.id, user).await.unwrap_err();
    assert!(err.is(ErrorKind::Conflict));
    assert_eq!(t.reload(license.id).await.used_seats, 1);

    t.ledger
        .assignments()
        .revoke_from_user(&t.ctx(), first.id)
        .await
        .unwrap();
    let second = t.assign_user(license.id, user).await.unwrap();
    assert_ne!(first.id, second.id);

    let all = t
        .ledger
        .assignments()
        .list_allocations_for_license(license.id)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert!(!all[0].is_active());
    assert!(all[1].is_active());
    t.assert_seat_invariant(license.id).await;
}

#[tokio::test]
async fn test_duplicate_group_allocation_is_conflict() {
    let t = TestLedger::new();
    let license = t.license("DB Tools", 10).await;
    let group = t.directory.add_group("data");

    t.assign_group(license.id, group, 3).await.unwrap();
    let err = t.assign_group(license.id, group, 2).await.unwrap_err();
    assert!(err.is(ErrorKind::Conflict));
    assert_eq!(t.reload(license.id).await.used_seats, 3);
}

#[tokio::test]
async fn test_user_and_group_allocations_share_capacity() {
    let t = TestLedger::new();
    let license = t.license("Mixer", 4).await;
    let group = t.directory.add_group("studio");
    t.assign_group(license.id, group, 3).await.unwrap();
    t.assign_new_user(license.id, "solo").await;

    let extra = t.directory.add_user("extra");
    let err = t.assign_user(license.id, extra).await.unwrap_err();
    assert!(err.is(ErrorKind::InsufficientSeats));
    t.assert_seat_invariant(license.id).await;
}

#[tokio::test]
async fn test_double_revoke_is_conflict_and_releases_once() {
    let t = TestLedger::new();
    let license = t.license("Designer", 10).await;
    let group = t.directory.add_group("design");
    let allocation = t.assign_group(license.id, group, 4).await.unwrap();
    t.assign_new_user(license.id, "lead").await;

    let revoked = t
        .ledger
        .assignments()
        .revoke_from_group(&t.ctx(), allocation.id)
        .await
        .unwrap();
    assert!(!revoked.is_active());
    assert!(revoked.revoked_at.is_some());

    let err = t
        .ledger
        .assignments()
        .revoke_from_group(&t.ctx(), allocation.id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Conflict));
    assert_eq!(t.reload(license.id).await.used_seats, 1);
    t.assert_seat_invariant(license.id).await;
}

#[tokio::test]
async fn test_revoke_through_wrong_kind_is_not_found() {
    let t = TestLedger::new();
    let license = t.license("Planner", 10).await;
    let assignment = t.assign_new_user(license.id, "pm").await;
    let group = t.directory.add_group("pmo");
    let allocation = t.assign_group(license.id, group, 2).await.unwrap();

    let err = t
        .ledger
        .assignments()
        .revoke_from_group(&t.ctx(), assignment.id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotFound));

    let err = t
        .ledger
        .assignments()
        .revoke_from_user(&t.ctx(), allocation.id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotFound));

    let err = t
        .ledger
        .assignments()
        .revoke_from_user(&t.ctx(), AllocationId::new())
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
    assert_eq!(t.reload(license.id).await.used_seats, 3);
}

#[tokio::test]
async fn test_missing_references_are_not_found() {
    let t = TestLedger::new();
    let license = t.license("Tracker", 3).await;

    let err = t.assign_user(license.id, UserId::new()).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));

    let user = t.directory.add_user("ghost-hunter");
    let err = t.assign_user(LicenseId::new(), user).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));

    let err = t
        .assign_group(license.id, GroupId::new(), 1)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
    assert_eq!(t.store.history_len().await, 1);
}

#[tokio::test]
async fn test_non_positive_group_seats_fail_validation_first() {
    let t = TestLedger::new();

    // Neither the license nor the group exists: validation must win.
    for seats in [0, -3] {
        let err = t
            .assign_group(LicenseId::new(), GroupId::new(), seats)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Validation), "seats={seats}: {err}");
    }
}

#[tokio::test]
async fn test_overlong_notes_fail_validation() {
    let t = TestLedger::new();
    let license = t.license("Notes", 3).await;
    let user = t.directory.add_user("verbose");

    let err = t
        .ledger
        .assignments()
        .assign_to_user(
            &t.ctx(),
            AssignUserRequest {
                license_id: license.id,
                user_id: user,
                notes: Some("x".repeat(501)),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Validation));

    let allocation = t
        .ledger
        .assignments()
        .assign_to_group(
            &t.ctx(),
            AssignGroupRequest {
                license_id: license.id,
                group_id: t.directory.add_group("ops"),
                seats: 2,
                notes: Some("quarterly true-up".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(allocation.notes.as_deref(), Some("quarterly true-up"));
}

#[tokio::test]
async fn test_inactive_principals_follow_policy() {
    let t = TestLedger::new();
    let license = t.license("Gateway", 5).await;
    let user = t.directory.add_user("former");
    t.directory.set_user_active(user, false);
    let group = t.directory.add_group("disbanded");
    t.directory.set_group_active(group, false);

    let err = t.assign_user(license.id, user).await.unwrap_err();
    assert!(err.is(ErrorKind::Validation));
    let err = t.assign_group(license.id, group, 1).await.unwrap_err();
    assert!(err.is(ErrorKind::Validation));

    let lenient = TestLedger::with_config(LedgerConfig {
        require_active_principals: false,
        ..LedgerConfig::default()
    });
    let license = lenient.license("Gateway", 5).await;
    let user = lenient.directory.add_user("former");
    lenient.directory.set_user_active(user, false);
    lenient.assign_user(license.id, user).await.unwrap();
}

#[tokio::test]
async fn test_missing_license_wins_over_inactive_principal() {
    let t = TestLedger::new();
    let user = t.directory.add_user("departed");
    t.directory.set_user_active(user, false);
    let group = t.directory.add_group("archived");
    t.directory.set_group_active(group, false);

    let err = t.assign_user(LicenseId::new(), user).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound), "{err}");
    let err = t
        .assign_group(LicenseId::new(), group, 2)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotFound), "{err}");
    assert_eq!(t.store.history_len().await, 0);
}

#[tokio::test]
async fn test_queries_return_active_records_only() {
    let t = TestLedger::new();
    let first = t.license("Alpha", 5).await;
    let second = t.license("Beta", 5).await;
    let user = t.directory.add_user("carol");
    let group = t.directory.add_group("qa");

    let on_first = t.assign_user(first.id, user).await.unwrap();
    t.assign_user(second.id, user).await.unwrap();
    t.assign_group(first.id, group, 2).await.unwrap();
    t.ledger
        .assignments()
        .revoke_from_user(&t.ctx(), on_first.id)
        .await
        .unwrap();

    let for_user = t
        .ledger
        .assignments()
        .list_active_for_user(user)
        .await
        .unwrap();
    assert_eq!(for_user.len(), 1);
    assert_eq!(for_user[0].license_id, second.id);

    let for_group = t
        .ledger
        .assignments()
        .list_active_for_group(group)
        .await
        .unwrap();
    assert_eq!(for_group.len(), 1);
    assert_eq!(for_group[0].holder, AllocationHolder::Group(group));

    let on_license = t
        .ledger
        .assignments()
        .list_active_for_license(first.id, None)
        .await
        .unwrap();
    assert_eq!(on_license.len(), 1);
    let users_only = t
        .ledger
        .assignments()
        .list_active_for_license(first.id, Some(HolderKind::User))
        .await
        .unwrap();
    assert!(users_only.is_empty());
}

#[tokio::test]
async fn test_queries_distinguish_empty_from_missing() {
    let t = TestLedger::new();
    let license = t.license("Empty", 1).await;
    let user = t.directory.add_user("idle");
    let group = t.directory.add_group("idle-group");

    let svc = t.ledger.assignments();
    assert!(svc.list_active_for_user(user).await.unwrap().is_empty());
    assert!(svc.list_active_for_group(group).await.unwrap().is_empty());
    assert!(
        svc.list_active_for_license(license.id, None)
            .await
            .unwrap()
            .is_empty()
    );

    assert!(
        svc.list_active_for_user(UserId::new())
            .await
            .unwrap_err()
            .is(ErrorKind::NotFound)
    );
    assert!(
        svc.list_active_for_group(GroupId::new())
            .await
            .unwrap_err()
            .is(ErrorKind::NotFound)
    );
    assert!(
        svc.list_allocations_for_license(LicenseId::new())
            .await
            .unwrap_err()
            .is(ErrorKind::NotFound)
    );
}
