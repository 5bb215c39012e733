//! Append-only operation log for one cleanup session.
//!
//! Every operation records a lifecycle: started, then completed or failed.
//! Entries are never rewritten after they settle; the log is cleared only
//! by an explicit `reset`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum OperationStatus {
    InProgress,
    Completed,
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OperationEntry {
    pub id: u64,
    pub operation: String,
    pub status: OperationStatus,
    pub context: BTreeMap<String, String>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl OperationEntry {
    /// Wall-clock duration; None while still in progress
    pub fn execution_time(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|finished| finished - self.started_at)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LogStatistics {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub in_progress: usize,
    pub success_rate: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OperationLogger {
    entries: Vec<OperationEntry>,
    next_id: u64,
}

impl OperationLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of an operation and return its id for settlement.
    pub fn begin(&mut self, operation: &str, context: BTreeMap<String, String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        log::debug!("Operation {id} started: {operation}");
        self.entries.push(OperationEntry {
            id,
            operation: operation.to_string(),
            status: OperationStatus::InProgress,
            context,
            result: None,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        });
        id
    }

    pub fn complete(&mut self, id: u64, result: impl Into<String>) {
        self.settle(id, OperationStatus::Completed, Some(result.into()), None);
    }

    pub fn fail(&mut self, id: u64, error: impl Into<String>) {
        let error = error.into();
        log::warn!("Operation {id} failed: {error}");
        self.settle(id, OperationStatus::Failed, None, Some(error));
    }

    fn settle(
        &mut self,
        id: u64,
        status: OperationStatus,
        result: Option<String>,
        error: Option<String>,
    ) {
        let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.id == id && e.status == OperationStatus::InProgress)
        else {
            log::warn!("Attempted to settle unknown or already-settled operation {id}");
            return;
        };
        entry.status = status;
        entry.result = result;
        entry.error = error;
        entry.finished_at = Some(Utc::now());
    }

    pub fn entries(&self) -> &[OperationEntry] {
        &self.entries
    }

    pub fn statistics(&self) -> LogStatistics {
        let completed = self
            .entries
            .iter()
            .filter(|e| e.status == OperationStatus::Completed)
            .count();
        let failed = self
            .entries
            .iter()
            .filter(|e| e.status == OperationStatus::Failed)
            .count();
        let settled = completed + failed;

        LogStatistics {
            total: self.entries.len(),
            completed,
            failed,
            in_progress: self.entries.len() - settled,
            success_rate: if settled == 0 {
                1.0
            } else {
                completed as f64 / settled as f64
            },
        }
    }

    /// Explicitly clear the session log
    pub fn reset(&mut self) {
        self.entries.clear();
        self.next_id = 0;
    }
}
