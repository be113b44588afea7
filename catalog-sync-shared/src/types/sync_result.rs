//! Outcome of a bulk reconciliation pass.

use serde::{Deserialize, Serialize};

/// Summary of a best-effort batch sync.
///
/// Some ids failing is an expected outcome, not an error: each failure is
/// recorded in `errors` and the batch keeps going.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncResult {
    pub synced_count: usize,
    pub failed_count: usize,
    /// One entry per failed id, `"goods {id}: {message}"`.
    pub errors: Vec<String>,
}

impl SyncResult {
    pub fn record_success(&mut self) {
        self.synced_count += 1;
    }

    pub fn record_failure(&mut self, id: u64, message: impl std::fmt::Display) {
        self.failed_count += 1;
        self.errors.push(format!("goods {}: {}", id, message));
    }

    /// Number of ids attempted so far.
    pub fn attempted(&self) -> usize {
        self.synced_count + self.failed_count
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed_count == 0
    }
}
