//! Audit trail completeness and history queries.

mod helpers;

use chrono::{Duration, Utc};

use licensehub_core::config::LedgerConfig;
use licensehub_core::error::ErrorKind;
use licensehub_core::types::pagination::PageRequest;
use licensehub_database::store::HistoryFilter;
use licensehub_entity::history::ActionType;
use licensehub_entity::license::UpdateLicense;
use licensehub_service::AssignUserRequest;

use helpers::TestLedger;

#[tokio::test]
async fn test_every_mutation_records_exactly_one_entry() {
    let t = TestLedger::new();
    let license = t.license("Suite", 10).await;
    assert_eq!(t.store.history_len().await, 1);

    let assignment = t.assign_new_user(license.id, "u").await;
    assert_eq!(t.store.history_len().await, 2);

    let group = t.directory.add_group("g");
    let allocation = t.assign_group(license.id, group, 3).await.unwrap();
    assert_eq!(t.store.history_len().await, 3);

    let svc = t.ledger.assignments();
    svc.revoke_from_user(&t.ctx(), assignment.id).await.unwrap();
    assert_eq!(t.store.history_len().await, 4);
    svc.revoke_from_group(&t.ctx(), allocation.id).await.unwrap();
    assert_eq!(t.store.history_len().await, 5);

    // Attribute-only edit: one entry.
    let mut edit = UpdateLicense::from_license(&t.reload(license.id).await);
    edit.description = Some("renewed".to_string());
    t.ledger
        .licenses()
        .update(&t.ctx(), license.id, edit)
        .await
        .unwrap();
    assert_eq!(t.store.history_len().await, 6);

    t.ledger
        .licenses()
        .delete(&t.ctx(), license.id)
        .await
        .unwrap();
    assert_eq!(t.store.history_len().await, 7);

    let actions: Vec<ActionType> = t
        .history(license.id)
        .await
        .into_iter()
        .rev()
        .map(|e| e.action_type)
        .collect();
    assert_eq!(
        actions,
        vec![
            ActionType::LicenseCreated,
            ActionType::LicenseAssignedToUser,
            ActionType::LicenseAssignedToGroup,
            ActionType::LicenseRevokedFromUser,
            ActionType::LicenseRevokedFromGroup,
            ActionType::LicenseUpdated,
            ActionType::LicenseDeleted,
        ]
    );
}

#[tokio::test]
async fn test_capacity_edit_records_two_entries() {
    let t = TestLedger::new();
    let license = t.license("Compiler", 10).await;

    let mut edit = UpdateLicense::from_license(&license);
    edit.total_seats = 15;
    t.ledger
        .licenses()
        .update(&t.ctx(), license.id, edit)
        .await
        .unwrap();

    let mut edit = UpdateLicense::from_license(&t.reload(license.id).await);
    edit.total_seats = 12;
    t.ledger
        .licenses()
        .update(&t.ctx(), license.id, edit)
        .await
        .unwrap();

    let history = t.history(license.id).await;
    assert_eq!(history.len(), 5);

    let increased: Vec<_> = history
        .iter()
        .filter(|e| e.action_type == ActionType::SeatsIncreased)
        .collect();
    assert_eq!(increased.len(), 1);
    assert_eq!(increased[0].description, "Total seats changed from 10 to 15");

    let decreased: Vec<_> = history
        .iter()
        .filter(|e| e.action_type == ActionType::SeatsDecreased)
        .collect();
    assert_eq!(decreased.len(), 1);
    assert_eq!(decreased[0].description, "Total seats changed from 15 to 12");

    let updated = history
        .iter()
        .filter(|e| e.action_type == ActionType::LicenseUpdated)
        .count();
    assert_eq!(updated, 2);
}

#[tokio::test]
async fn test_entries_carry_actor_principals_and_wording() {
    let t = TestLedger::new();
    let license = t.license("Imaging", 10).await;
    let user = t.directory.add_user("dana");
    let group = t.directory.add_group("radiology");

    t.ledger
        .assignments()
        .assign_to_user(
            &licensehub_service::RequestContext::new("it-desk"),
            AssignUserRequest {
                license_id: license.id,
                user_id: user,
                notes: Some("ticket 4411".to_string()),
            },
        )
        .await
        .unwrap();
    let allocation = t.assign_group(license.id, group, 4).await.unwrap();
    t.ledger
        .assignments()
        .revoke_from_group(&t.ctx(), allocation.id)
        .await
        .unwrap();

    let history = t.history(license.id).await;
    let created = history.last().unwrap();
    assert_eq!(created.description, "License created: Imaging");
    assert_eq!(
        created.details.as_deref(),
        Some("Total seats: 10, Expiration: none")
    );

    let assigned = history
        .iter()
        .find(|e| e.action_type == ActionType::LicenseAssignedToUser)
        .unwrap();
    assert_eq!(assigned.description, "License assigned to user: dana");
    assert_eq!(assigned.details.as_deref(), Some("ticket 4411"));
    assert_eq!(assigned.user_id, Some(user));
    assert_eq!(assigned.performed_by, "it-desk");

    let group_entry = history
        .iter()
        .find(|e| e.action_type == ActionType::LicenseAssignedToGroup)
        .unwrap();
    assert_eq!(
        group_entry.description,
        "License assigned to group: radiology (4 seats)"
    );
    assert_eq!(group_entry.group_id, Some(group));

    let revoked = &history[0];
    assert_eq!(revoked.action_type, ActionType::LicenseRevokedFromGroup);
    assert_eq!(
        revoked.description,
        "License revoked from group: radiology (4 seats freed)"
    );
    assert_eq!(revoked.performed_by, "admin");
}

#[tokio::test]
async fn test_history_survives_license_deletion() {
    let t = TestLedger::new();
    let license = t.license("Retired", 2).await;
    let user = t.directory.add_user("last");
    t.assign_user(license.id, user).await.unwrap();
    t.ledger
        .licenses()
        .delete(&t.ctx(), license.id)
        .await
        .unwrap();

    assert_eq!(t.history(license.id).await.len(), 3);
    let by_user = t
        .ledger
        .audit()
        .for_user(user, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(by_user.total_items, 1);
}

#[tokio::test]
async fn test_history_queries_filter_and_page() {
    let t = TestLedger::with_config(LedgerConfig {
        recent_history_limit: 3,
        ..LedgerConfig::default()
    });
    let started = Utc::now() - Duration::seconds(1);
    let license = t.license("Paged", 20).await;
    let group = t.directory.add_group("crew");
    for i in 0..5 {
        t.assign_new_user(license.id, &format!("user{i}")).await;
    }
    t.assign_group(license.id, group, 2).await.unwrap();

    let audit = t.ledger.audit();
    let recent = audit.recent(None).await.unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].action_type, ActionType::LicenseAssignedToGroup);

    let page = audit
        .by_action(ActionType::LicenseAssignedToUser, &PageRequest::new(2, 2))
        .await
        .unwrap();
    assert_eq!(page.total_items, 5);
    assert_eq!(page.items.len(), 2);
    assert!(page.has_next);
    assert!(page.has_previous);

    let by_group = audit
        .for_group(group, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(by_group.total_items, 1);

    let window = audit
        .between(started, Utc::now() + Duration::seconds(1), &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(window.total_items, 7);

    let combined = audit
        .search(
            &HistoryFilter {
                license_id: Some(license.id),
                action_type: Some(ActionType::LicenseCreated),
                ..HistoryFilter::default()
            },
            &PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(combined.total_items, 1);
}

#[tokio::test]
async fn test_inverted_time_range_is_validation_error() {
    let t = TestLedger::new();
    let now = Utc::now();
    let err = t
        .ledger
        .audit()
        .between(now, now - Duration::hours(1), &PageRequest::default())
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Validation));
}
