//! In-process store backing both traits. Used by tests and dry runs.

use std::collections::BTreeMap;

use chrono::Utc;
use parking_lot::Mutex;

use crate::error::StoreError;
use crate::model::{
    Account, AccountId, ClaimState, ClaimStatus, EmailMatch, NewAccount, NewProfile, ProfileId,
    StudentProfile,
};
use crate::store::{AccountStore, ProfileStore};

#[derive(Default)]
struct Tables {
    profiles: BTreeMap<ProfileId, StudentProfile>,
    accounts: BTreeMap<AccountId, Account>,
    next_profile_id: i64,
    next_account_id: i64,
    claim_calls: usize,
    fail_claims: Option<StoreError>,
    fail_queries: Option<StoreError>,
}

/// Profiles and accounts held in memory behind one lock.
///
/// `claim` performs its check-and-set under the lock, so racing callers see
/// at most one success per profile.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a profile with an explicit id and state, bypassing the id sequence.
    pub fn seed_profile(&self, profile: StudentProfile) {
        let mut t = self.inner.lock();
        t.next_profile_id = t.next_profile_id.max(profile.id.0);
        t.profiles.insert(profile.id, profile);
    }

    /// Insert an account with an explicit id, bypassing the id sequence.
    pub fn seed_account(&self, account: Account) {
        let mut t = self.inner.lock();
        t.next_account_id = t.next_account_id.max(account.id.0);
        t.accounts.insert(account.id, account);
    }

    /// Number of `claim` calls received, successful or not.
    pub fn claim_calls(&self) -> usize {
        self.inner.lock().claim_calls
    }

    /// Make every subsequent `claim` fail with `err` (or succeed again with `None`).
    pub fn fail_claims(&self, err: Option<StoreError>) {
        self.inner.lock().fail_claims = err;
    }

    /// Make every subsequent profile lookup fail with `err` (or succeed again with `None`).
    pub fn fail_queries(&self, err: Option<StoreError>) {
        self.inner.lock().fail_queries = err;
    }
}

impl ProfileStore for MemoryStore {
    fn find_unclaimed_by_email(
        &self,
        email: &str,
        mode: EmailMatch,
    ) -> Result<Option<ProfileId>, StoreError> {
        let t = self.inner.lock();
        if let Some(err) = &t.fail_queries {
            return Err(err.clone());
        }
        // BTreeMap iterates in id order, so the first hit is the lowest id.
        Ok(t.profiles
            .values()
            .find(|p| p.is_unclaimed() && mode.matches(&p.email, email))
            .map(|p| p.id))
    }

    fn find_by_owner(&self, account_id: AccountId) -> Result<Option<ProfileId>, StoreError> {
        let t = self.inner.lock();
        if let Some(err) = &t.fail_queries {
            return Err(err.clone());
        }
        Ok(t.profiles
            .values()
            .find(|p| p.owner() == Some(account_id))
            .map(|p| p.id))
    }

    fn claim(&self, profile_id: ProfileId, account_id: AccountId) -> Result<(), StoreError> {
        let mut t = self.inner.lock();
        t.claim_calls += 1;
        if let Some(err) = &t.fail_claims {
            return Err(err.clone());
        }
        if !t.profiles.contains_key(&profile_id) {
            return Err(StoreError::NotFound(format!("profile {profile_id}")));
        }
        if t.profiles.values().any(|p| p.owner() == Some(account_id)) {
            return Err(StoreError::ConflictLost(profile_id));
        }
        let profile = t
            .profiles
            .get_mut(&profile_id)
            .ok_or_else(|| StoreError::NotFound(format!("profile {profile_id}")))?;
        if !profile.is_unclaimed() {
            return Err(StoreError::ConflictLost(profile_id));
        }
        profile.claim = ClaimState::Claimed {
            account_id,
            claimed_at: Utc::now(),
        };
        Ok(())
    }

    fn insert_profile(&self, new: NewProfile) -> Result<StudentProfile, StoreError> {
        let mut t = self.inner.lock();
        t.next_profile_id += 1;
        let profile = StudentProfile {
            id: ProfileId(t.next_profile_id),
            email: new.email.trim().to_string(),
            full_name: new.full_name,
            claim: ClaimState::Unclaimed,
            created_at: Utc::now(),
        };
        t.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    fn get_profile(&self, id: ProfileId) -> Result<Option<StudentProfile>, StoreError> {
        Ok(self.inner.lock().profiles.get(&id).cloned())
    }

    fn list_profiles(&self, status: Option<ClaimStatus>) -> Result<Vec<StudentProfile>, StoreError> {
        let t = self.inner.lock();
        Ok(t.profiles
            .values()
            .filter(|p| status.map_or(true, |s| p.status() == s))
            .cloned()
            .collect())
    }
}

impl AccountStore for MemoryStore {
    fn insert_account(&self, new: NewAccount) -> Result<Account, StoreError> {
        let mut t = self.inner.lock();
        let email = new.email.trim().to_string();
        if !email.is_empty() && t.accounts.values().any(|a| a.email == email) {
            return Err(StoreError::Constraint(format!(
                "account email '{email}' already registered"
            )));
        }
        t.next_account_id += 1;
        let account = Account {
            id: AccountId(t.next_account_id),
            email,
            name: new.name,
            created_at: Utc::now(),
        };
        t.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.inner.lock().accounts.get(&id).cloned())
    }

    fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let email = email.trim();
        Ok(self
            .inner
            .lock()
            .accounts
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.inner.lock().accounts.values().cloned().collect())
    }
}
