//! Transfer summary and reporting
//!
//! Aggregates per-record and per-batch results into the end-of-run
//! [`TransferSummary`] handed to the log sink. No business logic lives
//! here beyond aggregation and formatting.

use crate::domain::ids::RecordId;
use crate::domain::verdict::Verdict;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

/// Result of processing one batch
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// 1-based batch number
    pub batch: usize,

    /// Records fetched in this batch
    pub fetched: usize,

    /// Records that passed the validation gate
    pub accepted: usize,

    /// Records held back by validation
    pub rejected: usize,

    /// Records whose destination write was positively confirmed
    pub written: usize,

    /// Records deleted from the source (move mode)
    pub deleted: usize,

    /// Non-fatal problems encountered in this batch
    pub errors: Vec<String>,
}

impl BatchOutcome {
    /// Start an outcome for a freshly fetched batch
    pub fn new(batch: usize, fetched: usize) -> Self {
        Self {
            batch,
            fetched,
            accepted: 0,
            rejected: 0,
            written: 0,
            deleted: 0,
            errors: Vec::new(),
        }
    }

    /// Record a non-fatal problem
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}

/// A fatal error that terminated the run
#[derive(Debug, Clone)]
pub enum RunFatal {
    /// Bad configuration or mismatched projects; nothing was transferred
    Configuration(String),
    /// Transport/auth failure; the summary covers the batches completed
    /// before the failure
    Transport(String),
}

impl RunFatal {
    /// Process exit code for this failure class
    pub fn exit_code(&self) -> i32 {
        match self {
            RunFatal::Configuration(_) => 1,
            RunFatal::Transport(_) => 2,
        }
    }
}

impl std::fmt::Display for RunFatal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunFatal::Configuration(msg) => write!(f, "configuration error: {msg}"),
            RunFatal::Transport(msg) => write!(f, "transport error: {msg}"),
        }
    }
}

/// End-of-run summary of a transfer
#[derive(Debug)]
pub struct TransferSummary {
    /// Unique id of this run
    pub run_id: Uuid,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Whether move mode was active
    pub move_records: bool,

    /// Whether writes and deletions were suppressed
    pub dry_run: bool,

    /// Total records fetched across all batches
    pub total_fetched: usize,

    /// Total records accepted by validation
    pub total_accepted: usize,

    /// Total records rejected by validation
    pub total_rejected: usize,

    /// Total records confirmed written to the destination
    pub total_written: usize,

    /// Total records deleted from the source
    pub total_deleted: usize,

    /// Per-batch outcomes in processing order
    pub batches: Vec<BatchOutcome>,

    /// Verdicts for every rejected record, in processing order
    pub rejected_verdicts: Vec<Verdict>,

    /// Records confirmed written but not deleted from the source
    pub not_deleted: Vec<RecordId>,

    /// Fatal error that ended the run early, if any
    pub fatal: Option<RunFatal>,

    /// Wall-clock duration of the run
    pub duration: Duration,
}

impl TransferSummary {
    /// Create an empty summary for a new run
    pub fn new(move_records: bool, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            move_records,
            dry_run,
            total_fetched: 0,
            total_accepted: 0,
            total_rejected: 0,
            total_written: 0,
            total_deleted: 0,
            batches: Vec::new(),
            rejected_verdicts: Vec::new(),
            not_deleted: Vec::new(),
            fatal: None,
            duration: Duration::from_secs(0),
        }
    }

    /// Fold one batch outcome into the running totals
    pub fn record_batch(&mut self, outcome: BatchOutcome) {
        self.total_fetched += outcome.fetched;
        self.total_accepted += outcome.accepted;
        self.total_rejected += outcome.rejected;
        self.total_written += outcome.written;
        self.total_deleted += outcome.deleted;
        self.batches.push(outcome);
    }

    /// Retain a rejected record's verdict for end-of-run reporting
    pub fn add_rejected(&mut self, verdict: Verdict) {
        self.rejected_verdicts.push(verdict);
    }

    /// Record ids that were written but could not be deleted
    pub fn add_not_deleted(&mut self, ids: impl IntoIterator<Item = RecordId>) {
        self.not_deleted.extend(ids);
    }

    /// Mark the run as fatally terminated
    pub fn set_fatal(&mut self, fatal: RunFatal) {
        self.fatal = Some(fatal);
    }

    /// Set the run duration
    pub fn finish(&mut self, duration: Duration) {
        self.duration = duration;
    }

    /// Whether the run completed without a fatal error
    pub fn is_clean(&self) -> bool {
        self.fatal.is_none()
    }

    /// Process exit code: 0 for a clean run (rejected records are an
    /// expected outcome, not a failure), 1/2 for fatal errors.
    pub fn exit_code(&self) -> i32 {
        self.fatal.as_ref().map_or(0, RunFatal::exit_code)
    }

    /// Emit the summary to the log sink
    pub fn log_summary(&self) {
        tracing::info!(
            run_id = %self.run_id,
            started_at = %self.started_at,
            batches = self.batches.len(),
            fetched = self.total_fetched,
            accepted = self.total_accepted,
            rejected = self.total_rejected,
            written = self.total_written,
            deleted = self.total_deleted,
            move_records = self.move_records,
            dry_run = self.dry_run,
            duration_secs = self.duration.as_secs(),
            "Transfer run completed"
        );

        for verdict in &self.rejected_verdicts {
            let details: Vec<String> = verdict.violations.iter().map(ToString::to_string).collect();
            tracing::warn!(
                record_id = %verdict.record_id,
                event = verdict.event.as_ref().map(|e| e.as_str()).unwrap_or(""),
                violations = %details.join("; "),
                "Record rejected by validation"
            );
        }

        if !self.not_deleted.is_empty() {
            let ids: Vec<&str> = self.not_deleted.iter().map(RecordId::as_str).collect();
            tracing::warn!(
                count = ids.len(),
                record_ids = %ids.join(", "),
                "Records written to destination but not deleted from source"
            );
        }

        for outcome in &self.batches {
            for error in &outcome.errors {
                tracing::warn!(batch = outcome.batch, error = %error, "Batch error");
            }
        }

        if let Some(fatal) = &self.fatal {
            tracing::error!(error = %fatal, "Transfer run terminated by fatal error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::RecordId;
    use crate::domain::verdict::{Severity, Violation};

    #[test]
    fn test_record_batch_folds_totals() {
        let mut summary = TransferSummary::new(true, false);

        let mut first = BatchOutcome::new(1, 10);
        first.accepted = 8;
        first.rejected = 2;
        first.written = 8;
        first.deleted = 8;
        summary.record_batch(first);

        let mut second = BatchOutcome::new(2, 5);
        second.accepted = 5;
        second.written = 4;
        second.deleted = 4;
        summary.record_batch(second);

        assert_eq!(summary.total_fetched, 15);
        assert_eq!(summary.total_accepted, 13);
        assert_eq!(summary.total_rejected, 2);
        assert_eq!(summary.total_written, 12);
        assert_eq!(summary.total_deleted, 12);
        assert_eq!(summary.batches.len(), 2);
    }

    #[test]
    fn test_clean_run_exit_code_zero_even_with_rejections() {
        let mut summary = TransferSummary::new(false, false);
        summary.add_rejected(Verdict::new(
            RecordId::new("9").unwrap(),
            None,
            vec![Violation::new("age", "range", "out of range", Severity::Error)],
        ));

        assert!(summary.is_clean());
        assert_eq!(summary.exit_code(), 0);
    }

    #[test]
    fn test_fatal_exit_codes() {
        let mut summary = TransferSummary::new(false, false);
        summary.set_fatal(RunFatal::Configuration("bad config".to_string()));
        assert_eq!(summary.exit_code(), 1);

        let mut summary = TransferSummary::new(false, false);
        summary.set_fatal(RunFatal::Transport("auth failed".to_string()));
        assert_eq!(summary.exit_code(), 2);
        assert!(!summary.is_clean());
    }

    #[test]
    fn test_not_deleted_tracking() {
        let mut summary = TransferSummary::new(true, false);
        summary.add_not_deleted(vec![RecordId::new("3").unwrap(), RecordId::new("4").unwrap()]);
        assert_eq!(summary.not_deleted.len(), 2);
    }
}
