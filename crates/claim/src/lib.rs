//! `bursary-claim`: student profile claim reconciliation.
//!
//! Pure engine crate: stores and audit channels are injected as traits.
//! No CLI or IO dependencies.

pub mod audit;
pub mod backfill;
pub mod error;
pub mod memory;
pub mod model;
pub mod reconciler;
pub mod registration;
pub mod store;

pub use audit::{AuditRecord, AuditSink, FanoutSink, LogSink, MemorySink};
pub use backfill::{backfill, BackfillReport};
pub use error::{AuditError, ClaimError, StoreError};
pub use memory::MemoryStore;
pub use model::{
    Account, AccountId, AccountRegistered, ClaimState, ClaimStatus, EmailMatch, NewAccount,
    NewProfile, Outcome, ProfileId, StudentProfile,
};
pub use reconciler::{ClaimOptions, Reconciler};
pub use registration::{ClaimResult, Registrar, Registration};
pub use store::{AccountStore, ProfileStore};
