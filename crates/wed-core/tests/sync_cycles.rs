mod common;

use common::{FakeRemote, Harness, DURABLE_USER, OTHER_USER};
use std::sync::Arc;
use std::time::Duration;
use wed_core::models::{GuestPatch, GuestStatus, NewExpense, NewGuest};
use wed_core::session::SessionUser;
use wed_core::storage::{DocumentStore, MemoryStore, Namespace};
use wed_core::{Field, SyncError, UpdateOutcome};

fn slow_harness(latency_ms: u64) -> Harness {
    let harness = Harness::new(
        MemoryStore::with_latency(Duration::from_millis(latency_ms)),
        FakeRemote::default(),
    );
    harness.session.sign_in(SessionUser::new(DURABLE_USER));
    harness
}

#[tokio::test]
async fn interleaved_updates_apply_in_issue_order() {
    let h = slow_harness(5);

    let (first, second, guest_a, guest_b) = tokio::join!(
        h.sync.update_field(Field::ClientName(Some("Alex".into()))),
        h.sync.update_field(Field::ClientName(Some("Alexandra".into()))),
        h.sync.add_guest(NewGuest::named("Sam")),
        h.sync.add_guest(NewGuest::named("Kim")),
    );
    assert_eq!(first.unwrap(), UpdateOutcome::Applied { version: 1 });
    assert_eq!(second.unwrap(), UpdateOutcome::Applied { version: 2 });
    assert!(guest_a.unwrap().is_applied());
    assert!(guest_b.unwrap().is_applied());

    let stored = h.store.load_document(DURABLE_USER).await.unwrap().unwrap();
    assert_eq!(stored.client_name.as_deref(), Some("Alexandra"));
    let names: Vec<_> = stored.guests.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, ["Sam", "Kim"]);
    assert_eq!(stored.guest_count, Some(2));
    assert_ne!(stored.guests[0].id, stored.guests[1].id);

    assert_eq!(h.sync.get_document(), stored);
    assert_eq!(h.sync.version(), 4);
    assert_eq!(h.sync.active_locks(), 0);
}

#[tokio::test]
async fn update_fields_is_one_cycle() {
    let h = Harness::signed_in(DURABLE_USER);
    let outcome = h
        .sync
        .update_fields(vec![
            Field::ClientName(Some("Alex".into())),
            Field::PartnerName(Some("Jo".into())),
            Field::parse("guest_range", "50-100").unwrap(),
        ])
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Applied { version: 1 });
    assert_eq!(h.store.write_count(), 1);

    let doc = h.sync.get_document();
    assert_eq!(doc.partner_name.as_deref(), Some("Jo"));
    assert!(doc.draft_id.is_some());
}

#[tokio::test]
async fn queued_update_is_dropped_after_account_switch() {
    let h = slow_harness(20);

    let (held, queued, _) = tokio::join!(
        h.sync.update_field(Field::ClientName(Some("Alex".into()))),
        h.sync.update_field(Field::PartnerName(Some("Jo".into()))),
        async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            h.session.sign_in(SessionUser::new(OTHER_USER));
        },
    );

    // the first cycle passed its session check before the switch
    assert_eq!(held.unwrap(), UpdateOutcome::Applied { version: 1 });
    assert_eq!(queued.unwrap(), UpdateOutcome::Dropped);

    let stored = h.store.load_document(DURABLE_USER).await.unwrap().unwrap();
    assert_eq!(stored.client_name.as_deref(), Some("Alex"));
    assert_eq!(stored.partner_name, None);
    assert!(h.store.load_document(OTHER_USER).await.unwrap().is_none());

    // nothing of the previous account leaks into memory
    assert!(h.sync.get_document().is_empty());
    assert_eq!(h.sync.current_user(), None);
}

#[tokio::test]
async fn updates_without_session_touch_nothing() {
    let h = Harness::new(MemoryStore::new(), FakeRemote::default());
    let outcome = h
        .sync
        .update_field(Field::ClientName(Some("Alex".into())))
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::NoSession);

    h.session.sign_in(SessionUser::new(DURABLE_USER));
    h.session.invalidate();
    let outcome = h.sync.add_guest(NewGuest::named("Sam")).await.unwrap();
    assert_eq!(outcome, UpdateOutcome::NoSession);
    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test]
async fn adding_the_same_guest_twice_keeps_one() {
    let h = Harness::signed_in(DURABLE_USER);
    let guest = NewGuest::named("A");

    assert!(h.sync.add_guest(guest.clone()).await.unwrap().is_applied());
    assert_eq!(
        h.sync.add_guest(guest).await.unwrap(),
        UpdateOutcome::Unchanged
    );

    let doc = h.sync.get_document();
    assert_eq!(doc.guests.len(), 1);
    assert_eq!(doc.guest_count, Some(1));
    assert_eq!(h.store.write_count(), 1);
}

#[tokio::test]
async fn guest_updates_and_removals_by_id() {
    let h = Harness::signed_in(DURABLE_USER);
    h.sync.add_guest(NewGuest::named("Sam")).await.unwrap();
    h.sync.add_guest(NewGuest::named("Kim")).await.unwrap();
    let sam = h.sync.get_document().guests[0].id.clone();

    let patch = GuestPatch {
        status: Some(GuestStatus::Accepted),
        ..Default::default()
    };
    assert!(h.sync.update_guest(&sam, patch.clone()).await.unwrap().is_applied());
    assert_eq!(
        h.sync.update_guest("missing", patch).await.unwrap(),
        UpdateOutcome::Unchanged
    );
    assert_eq!(
        h.sync.get_document().guests[0].status,
        Some(GuestStatus::Accepted)
    );

    assert!(h.sync.remove_guest(&sam).await.unwrap().is_applied());
    assert_eq!(
        h.sync.remove_guest(&sam).await.unwrap(),
        UpdateOutcome::Unchanged
    );
    let doc = h.sync.get_document();
    assert_eq!(doc.guests.len(), 1);
    assert_eq!(doc.guests[0].name, "Kim");
    assert_eq!(doc.guest_count, Some(1));
}

#[tokio::test]
async fn negative_expenses_are_rejected_before_writing() {
    let h = Harness::signed_in(DURABLE_USER);
    let err = h
        .sync
        .add_expense(NewExpense {
            category: "Venue".into(),
            amount: -10.0,
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::InvalidInput(_)));

    let err = h
        .sync
        .update_field(Field::PackagePrice(Some(-1.0)))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::InvalidInput(_)));
    assert!(Field::parse("package_price", "-1").is_err());
    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test]
async fn failed_persist_goes_to_backup_and_can_be_restored() {
    let h = Harness::signed_in(DURABLE_USER);
    h.sync
        .update_field(Field::ClientName(Some("Alex".into())))
        .await
        .unwrap();

    h.store.fail_document_writes(true);
    let outcome = h
        .sync
        .update_field(Field::PartnerName(Some("Jo".into())))
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::BackedUp);
    assert_eq!(h.sync.version(), 1);
    assert_eq!(h.sync.get_document().partner_name.as_deref(), Some("Jo"));

    let stored = h.store.load_document(DURABLE_USER).await.unwrap().unwrap();
    assert_eq!(stored.partner_name, None);
    let backup = h.store.load_backup(DURABLE_USER).await.unwrap().unwrap();
    assert_eq!(backup.client_name.as_deref(), Some("Alex"));
    assert_eq!(backup.partner_name.as_deref(), Some("Jo"));

    h.store.fail_document_writes(false);
    let restored = h
        .sync
        .recover_from_backup(DURABLE_USER)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(restored, backup);
    assert_eq!(
        h.store.load_document(DURABLE_USER).await.unwrap(),
        Some(backup)
    );
    assert_eq!(h.store.raw(Namespace::Backup, DURABLE_USER), None);
    assert_eq!(h.sync.version(), 2);

    assert_eq!(h.sync.recover_from_backup(DURABLE_USER).await.unwrap(), None);
}

#[tokio::test]
async fn backed_up_edit_carries_into_next_update() {
    let h = Harness::signed_in(DURABLE_USER);
    h.sync
        .update_field(Field::ClientName(Some("Alex".into())))
        .await
        .unwrap();

    h.store.fail_document_writes(true);
    assert_eq!(
        h.sync
            .update_field(Field::PartnerName(Some("Jo".into())))
            .await
            .unwrap(),
        UpdateOutcome::BackedUp
    );

    h.store.fail_document_writes(false);
    let outcome = h
        .sync
        .update_field(Field::EventType(Some("Garden party".into())))
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Applied { version: 2 });

    let doc = h.sync.get_document();
    assert_eq!(doc.client_name.as_deref(), Some("Alex"));
    assert_eq!(doc.partner_name.as_deref(), Some("Jo"));
    assert_eq!(doc.event_type.as_deref(), Some("Garden party"));
    let stored = h.store.load_document(DURABLE_USER).await.unwrap().unwrap();
    assert_eq!(stored, doc);

    // the backup was superseded, so recovery cannot roll the edit back
    assert_eq!(h.store.raw(Namespace::Backup, DURABLE_USER), None);
    assert_eq!(h.sync.recover_from_backup(DURABLE_USER).await.unwrap(), None);
}

#[tokio::test]
async fn concurrent_users_keep_their_own_documents() {
    let store = Arc::new(MemoryStore::with_latency(Duration::from_millis(3)));
    let a = Harness::with_store(store.clone(), FakeRemote::default());
    let b = Harness::with_store(store.clone(), FakeRemote::default());
    a.session.sign_in(SessionUser::new(DURABLE_USER));
    b.session.sign_in(SessionUser::new(OTHER_USER));

    let results = tokio::join!(
        a.sync.update_field(Field::ClientName(Some("Alex".into()))),
        b.sync.update_field(Field::ClientName(Some("Blair".into()))),
        a.sync.add_guest(NewGuest::named("Sam")),
        b.sync.add_guest(NewGuest::named("Kim")),
        a.sync.update_field(Field::PartnerName(Some("Jo".into()))),
        b.sync.update_field(Field::PartnerName(Some("Lee".into()))),
    );
    for outcome in [results.0, results.1, results.2, results.3, results.4, results.5] {
        assert!(outcome.unwrap().is_applied());
    }

    let doc_a = store.load_document(DURABLE_USER).await.unwrap().unwrap();
    assert_eq!(doc_a.client_name.as_deref(), Some("Alex"));
    assert_eq!(doc_a.partner_name.as_deref(), Some("Jo"));
    let guests: Vec<_> = doc_a.guests.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(guests, ["Sam"]);

    let doc_b = store.load_document(OTHER_USER).await.unwrap().unwrap();
    assert_eq!(doc_b.client_name.as_deref(), Some("Blair"));
    assert_eq!(doc_b.partner_name.as_deref(), Some("Lee"));
    let guests: Vec<_> = doc_b.guests.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(guests, ["Kim"]);

    assert_eq!(a.sync.get_document(), doc_a);
    assert_eq!(b.sync.get_document(), doc_b);
    assert_eq!(a.sync.active_locks(), 0);
    assert_eq!(b.sync.active_locks(), 0);
}

#[tokio::test]
async fn subscribers_see_published_documents() {
    let h = Harness::signed_in(DURABLE_USER);
    let mut rx = h.sync.subscribe();

    h.sync
        .update_field(Field::ClientName(Some("Alex".into())))
        .await
        .unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(
        rx.borrow_and_update().client_name.as_deref(),
        Some("Alex")
    );
    assert_eq!(h.sync.current_user().as_deref(), Some(DURABLE_USER));
}
