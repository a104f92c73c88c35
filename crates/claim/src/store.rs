//! Persistence seams. The reconciler only ever talks to these traits.

use crate::error::StoreError;
use crate::model::{
    Account, AccountId, ClaimStatus, EmailMatch, NewAccount, NewProfile, ProfileId, StudentProfile,
};

pub trait ProfileStore: Send + Sync {
    /// Lowest-id profile whose email matches under `mode`, with no owner and
    /// status `unclaimed`.
    fn find_unclaimed_by_email(
        &self,
        email: &str,
        mode: EmailMatch,
    ) -> Result<Option<ProfileId>, StoreError>;

    /// The profile owned by `account_id`, if any. An account owns at most one.
    fn find_by_owner(&self, account_id: AccountId) -> Result<Option<ProfileId>, StoreError>;

    /// Set owner and status together, only if the profile is still unclaimed
    /// and the account owns no other profile.
    ///
    /// Returns `StoreError::ConflictLost` when either condition no longer
    /// holds, and `StoreError::NotFound` when the profile does not exist.
    /// On any error nothing is written.
    fn claim(&self, profile_id: ProfileId, account_id: AccountId) -> Result<(), StoreError>;

    fn insert_profile(&self, profile: NewProfile) -> Result<StudentProfile, StoreError>;

    fn get_profile(&self, id: ProfileId) -> Result<Option<StudentProfile>, StoreError>;

    /// All profiles ordered by id, optionally restricted to one status.
    fn list_profiles(&self, status: Option<ClaimStatus>) -> Result<Vec<StudentProfile>, StoreError>;
}

pub trait AccountStore: Send + Sync {
    /// Create an account. Emails are unique; a duplicate is `StoreError::Constraint`.
    fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// All accounts ordered by id.
    fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;
}
