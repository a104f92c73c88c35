//! Account registration with claim dispatch.
//!
//! Registration never fails because of the claim step: reconciliation errors
//! are logged and reported alongside the new account.

use serde::Serialize;

use crate::error::{ClaimError, StoreError};
use crate::model::{Account, AccountRegistered, NewAccount, Outcome};
use crate::reconciler::Reconciler;
use crate::store::AccountStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ClaimResult {
    Done { outcome: Outcome },
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub account: Account,
    pub claim: ClaimResult,
}

pub struct Registrar<'a> {
    accounts: &'a dyn AccountStore,
    reconciler: &'a Reconciler<'a>,
}

impl<'a> Registrar<'a> {
    pub fn new(accounts: &'a dyn AccountStore, reconciler: &'a Reconciler<'a>) -> Self {
        Self { accounts, reconciler }
    }

    /// Create the account, then deliver `AccountRegistered` to the reconciler.
    pub fn register(&self, new: NewAccount) -> Result<Registration, StoreError> {
        let account = self.accounts.insert_account(new)?;
        log::info!("registered account {}", account.id);

        let event = AccountRegistered::from(&account);
        let claim = match self.handle(&event) {
            Ok(outcome) => ClaimResult::Done { outcome },
            Err(e) => {
                log::error!("profile claim for account {} failed: {}", account.id, e);
                ClaimResult::Failed { message: e.to_string() }
            }
        };

        Ok(Registration { account, claim })
    }

    /// Handle one delivery of `AccountRegistered`. Safe to call repeatedly.
    ///
    /// The account must exist in the account store; an event for an unknown
    /// account is `StoreError::NotFound` and claims nothing.
    pub fn handle(&self, event: &AccountRegistered) -> Result<Outcome, ClaimError> {
        let account = self.accounts.get_account(event.account_id)?.ok_or_else(|| {
            log::warn!("registration event for unknown account {}", event.account_id);
            StoreError::NotFound(format!("account {}", event.account_id))
        })?;
        self.reconciler.reconcile(&account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemorySink;
    use crate::memory::MemoryStore;
    use crate::model::{Account, AccountId, ClaimStatus, NewProfile, ProfileId};
    use crate::store::ProfileStore;

    fn seed(store: &MemoryStore, email: &str) -> ProfileId {
        store
            .insert_profile(NewProfile {
                email: email.into(),
                full_name: "Grace Hopper".into(),
            })
            .unwrap()
            .id
    }

    #[test]
    fn register_claims_profile() {
        let store = MemoryStore::new();
        let profile_id = seed(&store, "grace@x.com");
        let sink = MemorySink::new();
        let reconciler = Reconciler::new(&store, &sink);
        let registrar = Registrar::new(&store, &reconciler);

        let reg = registrar
            .register(NewAccount {
                email: "grace@x.com".into(),
                name: Some("Grace".into()),
            })
            .unwrap();
        assert_eq!(
            reg.claim,
            ClaimResult::Done { outcome: Outcome::Claimed(profile_id) }
        );
        let profile = store.get_profile(profile_id).unwrap().unwrap();
        assert_eq!(profile.status(), ClaimStatus::Claimed);
        assert_eq!(profile.owner(), Some(reg.account.id));
    }

    #[test]
    fn redelivered_event_is_no_match() {
        let store = MemoryStore::new();
        seed(&store, "grace@x.com");
        let sink = MemorySink::new();
        let reconciler = Reconciler::new(&store, &sink);
        let registrar = Registrar::new(&store, &reconciler);

        let reg = registrar
            .register(NewAccount { email: "grace@x.com".into(), name: None })
            .unwrap();
        let event = AccountRegistered::from(&reg.account);
        assert_eq!(registrar.handle(&event).unwrap(), Outcome::NoMatch);
        assert_eq!(sink.records().len(), 1);
    }

    #[test]
    fn registration_survives_claim_failure() {
        let store = MemoryStore::new();
        let profile_id = seed(&store, "grace@x.com");
        store.fail_claims(Some(StoreError::Unavailable("offline".into())));
        let sink = MemorySink::new();
        let reconciler = Reconciler::new(&store, &sink);
        let registrar = Registrar::new(&store, &reconciler);

        let reg = registrar
            .register(NewAccount { email: "grace@x.com".into(), name: None })
            .unwrap();
        assert!(matches!(reg.claim, ClaimResult::Failed { .. }));
        assert!(store.get_account(reg.account.id).unwrap().is_some());
        assert!(store.get_profile(profile_id).unwrap().unwrap().is_unclaimed());
    }

    #[test]
    fn duplicate_email_fails_registration() {
        let store = MemoryStore::new();
        let sink = MemorySink::new();
        let reconciler = Reconciler::new(&store, &sink);
        let registrar = Registrar::new(&store, &reconciler);

        registrar
            .register(NewAccount { email: "a@x.com".into(), name: None })
            .unwrap();
        let err = registrar
            .register(NewAccount { email: "a@x.com".into(), name: None })
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[test]
    fn unknown_account_claims_nothing() {
        let store = MemoryStore::new();
        let profile_id = seed(&store, "late@x.com");
        let sink = MemorySink::new();
        let reconciler = Reconciler::new(&store, &sink);
        let registrar = Registrar::new(&store, &reconciler);

        let event = AccountRegistered {
            account_id: AccountId(99),
            email: "late@x.com".into(),
        };
        let err = registrar.handle(&event).unwrap_err();
        assert!(matches!(err, ClaimError::Store(StoreError::NotFound(_))));
        assert!(store.get_profile(profile_id).unwrap().unwrap().is_unclaimed());
        assert_eq!(store.claim_calls(), 0);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn handle_uses_stored_account() {
        let store = MemoryStore::new();
        let profile_id = seed(&store, "late@x.com");
        store.seed_account(Account {
            id: AccountId(40),
            email: "late@x.com".into(),
            name: None,
            created_at: chrono::Utc::now(),
        });
        let sink = MemorySink::new();
        let reconciler = Reconciler::new(&store, &sink);
        let registrar = Registrar::new(&store, &reconciler);

        // The stored email wins over a stale payload.
        let event = AccountRegistered {
            account_id: AccountId(40),
            email: "stale@x.com".into(),
        };
        assert_eq!(registrar.handle(&event).unwrap(), Outcome::Claimed(profile_id));
        assert_eq!(
            store.get_profile(profile_id).unwrap().unwrap().owner(),
            Some(AccountId(40))
        );
    }
}
