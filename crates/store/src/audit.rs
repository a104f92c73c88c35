use bursary_claim::{AuditError, AuditRecord, AuditSink};

use crate::sqlite::SqliteStore;

/// Audit channel that appends to the store's `audit_log` table.
pub struct DatabaseSink<'a> {
    store: &'a SqliteStore,
}

impl<'a> DatabaseSink<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }
}

impl AuditSink for DatabaseSink<'_> {
    fn channel(&self) -> &str {
        "database"
    }

    fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.store
            .append_audit(record)
            .map_err(|e| AuditError::Channel {
                channel: self.channel().to_string(),
                message: e.to_string(),
            })
    }
}
