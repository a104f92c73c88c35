use std::sync::Barrier;

use chrono::Utc;

use bursary_claim::{
    backfill, Account, AccountId, AccountStore, ClaimError, ClaimResult, ClaimStatus, FanoutSink,
    LogSink, NewAccount, NewProfile, Outcome, ProfileStore, Reconciler, Registrar,
};
use bursary_store::{DatabaseSink, SqliteStore};

fn account(id: i64, email: &str) -> Account {
    Account {
        id: AccountId(id),
        email: email.into(),
        name: None,
        created_at: Utc::now(),
    }
}

fn seed(store: &SqliteStore, email: &str) -> bursary_claim::ProfileId {
    store
        .insert_profile(NewProfile {
            email: email.into(),
            full_name: "Student".into(),
        })
        .unwrap()
        .id
}

#[test]
fn claim_then_no_match_with_database_audit() {
    let store = SqliteStore::open_in_memory().unwrap();
    let profile_id = seed(&store, "a@x.com");
    let sink = DatabaseSink::new(&store);
    let reconciler = Reconciler::new(&store, &sink);

    let acct = account(3, "a@x.com");
    assert_eq!(reconciler.reconcile(&acct).unwrap(), Outcome::Claimed(profile_id));
    assert_eq!(reconciler.reconcile(&acct).unwrap(), Outcome::NoMatch);

    let profile = store.get_profile(profile_id).unwrap().unwrap();
    assert_eq!(profile.owner(), Some(AccountId(3)));

    let audit = store.list_audit().unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].profile_id, profile_id);
}

#[test]
fn mismatched_and_blank_emails_write_nothing() {
    let store = SqliteStore::open_in_memory().unwrap();
    let profile_id = seed(&store, "a@x.com");
    let sink = DatabaseSink::new(&store);
    let reconciler = Reconciler::new(&store, &sink);

    assert_eq!(reconciler.reconcile(&account(4, "b@x.com")).unwrap(), Outcome::NoMatch);
    assert_eq!(reconciler.reconcile(&account(5, "")).unwrap(), Outcome::NoMatch);
    assert!(store.get_profile(profile_id).unwrap().unwrap().is_unclaimed());
    assert!(store.list_audit().unwrap().is_empty());
}

#[test]
fn already_claimed_profile_is_left_alone() {
    let store = SqliteStore::open_in_memory().unwrap();
    let profile_id = seed(&store, "c@x.com");
    store.claim(profile_id, AccountId(2)).unwrap();
    let before = store.get_profile(profile_id).unwrap().unwrap();

    let sink = DatabaseSink::new(&store);
    let reconciler = Reconciler::new(&store, &sink);
    assert_eq!(reconciler.reconcile(&account(5, "c@x.com")).unwrap(), Outcome::NoMatch);

    assert_eq!(store.get_profile(profile_id).unwrap().unwrap(), before);
    assert!(store.list_audit().unwrap().is_empty());
}

#[test]
fn duplicates_claim_lowest_id_once_across_redelivery() {
    let store = SqliteStore::open_in_memory().unwrap();
    let first = seed(&store, "dup@x.com");
    let second = seed(&store, "dup@x.com");
    let sink = DatabaseSink::new(&store);
    let reconciler = Reconciler::new(&store, &sink);
    let acct = account(1, "dup@x.com");

    assert_eq!(reconciler.reconcile(&acct).unwrap(), Outcome::Claimed(first));
    assert_eq!(reconciler.reconcile(&acct).unwrap(), Outcome::NoMatch);

    let report = backfill(&reconciler, std::slice::from_ref(&acct));
    assert_eq!(report.claimed, 0);
    assert_eq!(report.no_match, 1);

    assert!(store.get_profile(second).unwrap().unwrap().is_unclaimed());
    assert_eq!(store.list_audit().unwrap().len(), 1);

    // A different account with the same email still gets the leftover.
    assert_eq!(
        reconciler.reconcile(&account(2, "dup@x.com")).unwrap(),
        Outcome::Claimed(second)
    );
}

#[test]
fn failed_update_leaves_profile_unclaimed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frozen.db");
    let store = SqliteStore::open(&path).unwrap();
    let profile_id = seed(&store, "a@x.com");

    rusqlite::Connection::open(&path)
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER freeze_profiles BEFORE UPDATE ON student_profiles
             BEGIN SELECT RAISE(ABORT, 'profiles frozen'); END;",
        )
        .unwrap();

    let sink = DatabaseSink::new(&store);
    let reconciler = Reconciler::new(&store, &sink);
    let err = reconciler.reconcile(&account(3, "a@x.com")).unwrap_err();
    assert!(matches!(err, ClaimError::Store(_)), "{err:?}");

    let profile = store.get_profile(profile_id).unwrap().unwrap();
    assert!(profile.is_unclaimed());
    assert_eq!(profile.owner(), None);
    assert!(store.list_audit().unwrap().is_empty());
}

#[test]
fn racing_threads_share_one_store() {
    let store = SqliteStore::open_in_memory().unwrap();
    let profile_id = seed(&store, "race@x.com");
    let sink = DatabaseSink::new(&store);
    let reconciler = Reconciler::new(&store, &sink);
    let barrier = Barrier::new(4);

    let outcomes: Vec<Outcome> = std::thread::scope(|s| {
        let handles: Vec<_> = (10..14)
            .map(|id| {
                let reconciler = &reconciler;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    reconciler.reconcile(&account(id, "race@x.com")).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let claimed = outcomes.iter().filter(|o| **o == Outcome::Claimed(profile_id)).count();
    assert_eq!(claimed, 1, "outcomes: {outcomes:?}");
    assert_eq!(store.list_audit().unwrap().len(), 1);
}

#[test]
fn separate_connections_race_on_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.db");
    let profile_id = {
        let store = SqliteStore::open(&path).unwrap();
        seed(&store, "race@x.com")
    };

    let barrier = Barrier::new(2);
    let outcomes: Vec<Outcome> = std::thread::scope(|s| {
        let handles: Vec<_> = [20, 21]
            .into_iter()
            .map(|id| {
                let path = &path;
                let barrier = &barrier;
                s.spawn(move || {
                    let store = SqliteStore::open(path).unwrap();
                    let sink = LogSink;
                    let reconciler = Reconciler::new(&store, &sink);
                    barrier.wait();
                    reconciler.reconcile(&account(id, "race@x.com")).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(outcomes.iter().filter(|o| **o == Outcome::Claimed(profile_id)).count(), 1);
    assert!(outcomes.contains(&Outcome::NoMatch));

    let store = SqliteStore::open(&path).unwrap();
    let claimed = store.list_profiles(Some(ClaimStatus::Claimed)).unwrap();
    assert_eq!(claimed.len(), 1);
    assert!(matches!(claimed[0].owner(), Some(AccountId(20)) | Some(AccountId(21))));
}

#[test]
fn registration_against_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("nested/app.db")).unwrap();
    let profile_id = seed(&store, "ada@uni.edu");

    let mut sink = FanoutSink::default();
    sink.push(Box::new(LogSink));
    sink.push(Box::new(DatabaseSink::new(&store)));
    let reconciler = Reconciler::new(&store, &sink);
    let registrar = Registrar::new(&store, &reconciler);

    let reg = registrar
        .register(NewAccount { email: "ada@uni.edu".into(), name: Some("Ada".into()) })
        .unwrap();
    assert_eq!(reg.claim, ClaimResult::Done { outcome: Outcome::Claimed(profile_id) });
    assert_eq!(
        store.find_account_by_email("ada@uni.edu").unwrap().map(|a| a.id),
        Some(reg.account.id)
    );
    assert_eq!(store.list_audit().unwrap().len(), 1);
}
