//! Audit channels for claim events.
//!
//! Recording is fire-and-forget from the reconciler's point of view: a sink
//! error is logged and never undoes a claim.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::AuditError;
use crate::model::{AccountId, ProfileId};

pub const PROFILE_CLAIMED: &str = "profile_claimed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event: String,
    pub account_id: AccountId,
    pub profile_id: ProfileId,
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn profile_claimed(account_id: AccountId, profile_id: ProfileId) -> Self {
        Self {
            event: PROFILE_CLAIMED.to_string(),
            account_id,
            profile_id,
            recorded_at: Utc::now(),
        }
    }
}

pub trait AuditSink: Send + Sync {
    /// Short channel name used in error messages.
    fn channel(&self) -> &str;

    fn record(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Writes records through the `log` facade at info level.
#[derive(Debug, Default)]
pub struct LogSink;

impl AuditSink for LogSink {
    fn channel(&self) -> &str {
        "log"
    }

    fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        log::info!(
            target: "bursary::audit",
            "{} account_id={} profile_id={}",
            record.event,
            record.account_id,
            record.profile_id
        );
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }
}

impl AuditSink for MemorySink {
    fn channel(&self) -> &str {
        "memory"
    }

    fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// Forwards each record to every channel.
///
/// All channels are attempted even when an earlier one fails. Failures are
/// returned together and left to the caller to report.
#[derive(Default)]
pub struct FanoutSink<'a> {
    channels: Vec<Box<dyn AuditSink + 'a>>,
}

impl<'a> FanoutSink<'a> {
    pub fn new(channels: Vec<Box<dyn AuditSink + 'a>>) -> Self {
        Self { channels }
    }

    pub fn push(&mut self, channel: Box<dyn AuditSink + 'a>) {
        self.channels.push(channel);
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl AuditSink for FanoutSink<'_> {
    fn channel(&self) -> &str {
        "fanout"
    }

    fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut failures: Vec<AuditError> = self
            .channels
            .iter()
            .filter_map(|channel| channel.record(record).err())
            .collect();
        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(AuditError::Several(failures)),
        }
    }
}
