//! Transfer controller
//!
//! Drives the per-run state machine: `FetchingBatch → Evaluating → Writing
//! → (Deleting) → Reporting`, looping until the cursor signals the end of
//! the record set. Batches are strictly sequential — deletion from the
//! source must never race ahead of a confirmed destination write — and all
//! mutable run state (cursor, running summary, batch number) is threaded
//! explicitly rather than held in globals.
//!
//! Error surfaces are reconciled here: record-level validation problems
//! land on verdicts, batch-level write/delete problems are recorded and
//! isolate to their batch, transport/auth problems terminate the run with
//! the partial summary intact.

use crate::adapters::redcap::api::DataCaptureApi;
use crate::config::FerryConfig;
use crate::core::transfer::fetcher::{BatchFetcher, Cursor};
use crate::core::transfer::summary::{BatchOutcome, RunFatal, TransferSummary};
use crate::domain::ids::{EventName, FormName, RecordId};
use crate::domain::record::Record;
use crate::domain::{FerryError, Result};
use crate::rules::catalog::RuleCatalog;
use crate::rules::evaluator::{evaluate, ValidationMode};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Behavior knobs for one transfer run
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Records per batch; -1 fetches everything at once
    pub batch_size: i64,
    /// Delete confirmed-written records from the source
    pub move_records: bool,
    /// Evaluate and report without writing or deleting
    pub dry_run: bool,
    /// Strict or relaxed catalog-coverage handling
    pub mode: ValidationMode,
    /// Form allow-list; empty means all forms in the source project
    pub forms: Vec<String>,
    /// Event allow-list; empty means all events
    pub events: Vec<String>,
}

impl TransferOptions {
    /// Derive options from the loaded configuration
    pub fn from_config(config: &FerryConfig) -> Self {
        Self {
            batch_size: config.transfer.batch_size,
            move_records: config.transfer.move_records,
            dry_run: config.transfer.dry_run,
            mode: config.rules.mode(),
            forms: config.transfer.forms.clone(),
            events: config.transfer.events.clone(),
        }
    }
}

/// Mutable state of one run, threaded through the batch loop instead of
/// living in ambient globals
struct RunContext {
    cursor: Cursor,
    batch_no: usize,
}

/// Orchestrates fetch → evaluate → write → delete for one run
pub struct TransferController {
    source: Arc<dyn DataCaptureApi>,
    destination: Arc<dyn DataCaptureApi>,
    catalog: RuleCatalog,
    options: TransferOptions,
    shutdown: Option<watch::Receiver<bool>>,
}

impl TransferController {
    /// Create a controller over connected source and destination projects
    pub fn new(
        source: Arc<dyn DataCaptureApi>,
        destination: Arc<dyn DataCaptureApi>,
        catalog: RuleCatalog,
        options: TransferOptions,
    ) -> Self {
        Self {
            source,
            destination,
            catalog,
            options,
            shutdown: None,
        }
    }

    /// Attach a shutdown signal; the in-flight batch completes before the
    /// run winds down (a write must never be torn).
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Execute the run. Never panics out and never exits silently: the
    /// returned summary carries either the full results or the partial
    /// results plus the fatal error that ended the run.
    pub async fn run(&self) -> TransferSummary {
        let started = Instant::now();
        let mut summary = TransferSummary::new(self.options.move_records, self.options.dry_run);

        tracing::info!(
            run_id = %summary.run_id,
            mode = %self.options.mode,
            move_records = self.options.move_records,
            dry_run = self.options.dry_run,
            batch_size = self.options.batch_size,
            "Starting transfer run"
        );

        if let Err(e) = self.execute(&mut summary).await {
            summary.set_fatal(classify(e));
        }

        summary.finish(started.elapsed());
        summary
    }

    async fn execute(&self, summary: &mut TransferSummary) -> Result<()> {
        let forms = self.resolve_forms().await?;
        let events = parse_names::<EventName>(&self.options.events, "event")?;

        self.check_compatibility(&forms).await?;

        let fetcher = BatchFetcher::new(
            self.source.clone(),
            forms,
            events,
            self.options.batch_size,
        )
        .await?;

        if fetcher.total_records() == 0 {
            tracing::warn!("No records in the source project match the configured filters");
            return Ok(());
        }

        let mut ctx = RunContext {
            cursor: fetcher.start(),
            batch_no: 0,
        };

        loop {
            if self.shutdown_requested() {
                tracing::info!(
                    completed_batches = ctx.batch_no,
                    "Shutdown requested; stopping before next batch"
                );
                break;
            }

            let Some(page) = fetcher.fetch_next(ctx.cursor).await? else {
                break;
            };
            ctx.cursor = page.next;
            ctx.batch_no += 1;

            tracing::info!(
                batch = ctx.batch_no,
                records = page.records.len(),
                "Processing batch"
            );

            let (outcome, fatal) = self.process_batch(ctx.batch_no, page.records, summary).await;
            summary.record_batch(outcome);
            if let Some(e) = fatal {
                return Err(e);
            }
        }

        Ok(())
    }

    /// Evaluate, write and (move mode) delete one batch.
    ///
    /// Returns the batch outcome together with a fatal error when a
    /// transport failure must end the run; non-fatal problems are folded
    /// into the outcome and the run continues with the next batch.
    async fn process_batch(
        &self,
        batch: usize,
        records: Vec<Record>,
        summary: &mut TransferSummary,
    ) -> (BatchOutcome, Option<FerryError>) {
        let mut outcome = BatchOutcome::new(batch, records.len());

        // Evaluating: partition while preserving fetch order
        let mut accepted: Vec<Record> = Vec::new();
        for record in records {
            let verdict = evaluate(&record, &self.catalog, self.options.mode);
            if verdict.is_accepted() {
                if verdict.warning_count() > 0 {
                    tracing::debug!(
                        record_id = %verdict.record_id,
                        warnings = verdict.warning_count(),
                        "Record accepted with warnings"
                    );
                }
                accepted.push(record);
            } else {
                outcome.rejected += 1;
                summary.add_rejected(verdict);
            }
        }
        outcome.accepted = accepted.len();

        if accepted.is_empty() {
            tracing::info!(batch = batch, "No accepted records in batch");
            return (outcome, None);
        }

        if self.options.dry_run {
            tracing::info!(
                batch = batch,
                accepted = accepted.len(),
                "Dry run: skipping destination write and source deletion"
            );
            return (outcome, None);
        }

        // Writing
        let imported = match self.destination.import_records(&accepted).await {
            Ok(count) => count,
            Err(e) => return self.batch_failure(outcome, e, "destination write failed"),
        };
        if imported != accepted.len() {
            tracing::warn!(
                batch = batch,
                imported = imported,
                accepted = accepted.len(),
                "Destination reported fewer imports than records sent"
            );
        }

        // Write-then-verify: only ids the destination positively confirms
        // are eligible for deletion
        let accepted_ids = unique_ids(&accepted);
        let confirmed = match self.destination.confirm_present(&accepted_ids).await {
            Ok(ids) => ids,
            Err(e) => return self.batch_failure(outcome, e, "write confirmation failed"),
        };
        outcome.written = confirmed.len();

        if confirmed.len() < accepted_ids.len() {
            let missing: Vec<&str> = accepted_ids
                .iter()
                .filter(|id| !confirmed.contains(id))
                .map(RecordId::as_str)
                .collect();
            tracing::error!(
                batch = batch,
                records = %missing.join(", "),
                "Destination write not confirmed; records will not be deleted from source"
            );
            outcome.add_error(format!(
                "write not confirmed for records: {}",
                missing.join(", ")
            ));
        }

        // Deleting (move mode only)
        if self.options.move_records && !confirmed.is_empty() {
            match self.source.delete_records(&confirmed).await {
                Ok(deleted) => {
                    outcome.deleted = deleted;
                    if deleted != confirmed.len() {
                        outcome.add_error(format!(
                            "source reported {deleted} deletions for {} confirmed records",
                            confirmed.len()
                        ));
                        summary.add_not_deleted(confirmed.clone());
                    }
                }
                Err(e) => {
                    // A partially-moved batch is reported, never rolled
                    // back and never hidden
                    summary.add_not_deleted(confirmed.clone());
                    outcome.add_error(format!("source deletion failed: {e}"));
                    if is_fatal(&e) {
                        return (outcome, Some(e));
                    }
                    tracing::error!(batch = batch, error = %e, "Source deletion failed");
                }
            }
        }

        (outcome, None)
    }

    /// Fold a write-path error into the outcome; transport failures end
    /// the run, data errors isolate to the batch.
    fn batch_failure(
        &self,
        mut outcome: BatchOutcome,
        error: FerryError,
        context: &str,
    ) -> (BatchOutcome, Option<FerryError>) {
        outcome.add_error(format!("{context}: {error}"));
        if is_fatal(&error) {
            (outcome, Some(error))
        } else {
            tracing::error!(batch = outcome.batch, error = %error, "{context}; continuing with next batch");
            (outcome, None)
        }
    }

    /// The form allow-list, or every form in the source project
    async fn resolve_forms(&self) -> Result<Vec<FormName>> {
        if !self.options.forms.is_empty() {
            return parse_names::<FormName>(&self.options.forms, "form");
        }
        let forms = self.source.instrument_list().await?;
        tracing::info!(count = forms.len(), "Using all forms from the source project");
        Ok(forms)
    }

    /// Source and destination must be structurally identical before any
    /// record moves: same data dictionary, same longitudinal shape.
    async fn check_compatibility(&self, forms: &[FormName]) -> Result<()> {
        let src_info = self.source.project_info().await?;
        let dest_info = self.destination.project_info().await?;

        if src_info.is_longitudinal != dest_info.is_longitudinal {
            return Err(FerryError::Configuration(
                "Source and destination project longitudinal settings do not match".to_string(),
            ));
        }
        if src_info.has_repeating_instruments_or_events
            != dest_info.has_repeating_instruments_or_events
        {
            return Err(FerryError::Configuration(
                "Source and destination project repeating instrument settings do not match"
                    .to_string(),
            ));
        }

        let src_dict = self.source.data_dictionary(forms).await?;
        let dest_dict = self.destination.data_dictionary(forms).await?;

        if src_dict.is_empty() || dest_dict.is_empty() {
            return Err(FerryError::Configuration(
                "Source or destination data dictionary is empty".to_string(),
            ));
        }
        if src_dict != dest_dict {
            return Err(FerryError::Configuration(
                "Source and destination data dictionaries do not match".to_string(),
            ));
        }

        tracing::info!(
            fields = src_dict.len(),
            "Source and destination project settings match"
        );
        Ok(())
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false)
    }
}

/// Unique record ids of a batch, preserving first-seen order
fn unique_ids(records: &[Record]) -> Vec<RecordId> {
    let mut seen = std::collections::HashSet::new();
    records
        .iter()
        .map(Record::id)
        .filter(|id| seen.insert(id.as_str().to_string()))
        .cloned()
        .collect()
}

fn parse_names<T: FromStr<Err = String>>(names: &[String], what: &str) -> Result<Vec<T>> {
    names
        .iter()
        .map(|name| {
            T::from_str(name)
                .map_err(|e| FerryError::Configuration(format!("Invalid {what} name: {e}")))
        })
        .collect()
}

fn is_fatal(error: &FerryError) -> bool {
    match error {
        FerryError::Redcap(e) => e.is_fatal(),
        FerryError::Configuration(_) | FerryError::RuleLoad(_) => true,
        _ => false,
    }
}

fn classify(error: FerryError) -> RunFatal {
    match &error {
        FerryError::Configuration(_) | FerryError::RuleLoad(_) => {
            RunFatal::Configuration(error.to_string())
        }
        _ => RunFatal::Transport(error.to_string()),
    }
}
