use std::fmt;

use crate::model::ProfileId;

/// Failure reported by a profile or account store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not complete the query or update.
    Unavailable(String),
    /// A write violated a store constraint (duplicate email, etc.).
    Constraint(String),
    /// A conditional claim found the profile no longer unclaimed.
    ConflictLost(ProfileId),
    /// The referenced record does not exist.
    NotFound(String),
    /// A stored row breaks a model invariant.
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
            Self::Constraint(msg) => write!(f, "constraint violation: {msg}"),
            Self::ConflictLost(id) => write!(f, "profile {id} was claimed concurrently"),
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::Corrupt(msg) => write!(f, "corrupt record: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Failure of a reconciliation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    /// Store failure, propagated unmodified. Never retried internally.
    Store(StoreError),
}

impl fmt::Display for ClaimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "claim failed: {e}"),
        }
    }
}

impl std::error::Error for ClaimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
        }
    }
}

impl From<StoreError> for ClaimError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// Failure of one audit channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    Channel { channel: String, message: String },
    /// More than one channel failed for the same record.
    Several(Vec<AuditError>),
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel { channel, message } => {
                write!(f, "audit channel '{channel}': {message}")
            }
            Self::Several(errors) => {
                write!(f, "{} audit channels failed", errors.len())?;
                for e in errors {
                    write!(f, "; {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for AuditError {}
