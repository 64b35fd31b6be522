//! End-to-end pipeline tests over in-memory projects
//!
//! Exercises the transfer controller against a mock implementation of the
//! data-capture API: move/copy semantics, the write-then-verify gate,
//! per-batch error isolation and order preservation.

use async_trait::async_trait;
use ferry::adapters::redcap::api::DataCaptureApi;
use ferry::adapters::redcap::models::{FieldMetadata, ProjectInfo};
use ferry::core::transfer::{RunFatal, TransferController, TransferOptions};
use ferry::domain::ids::{EventName, FormName, RecordId};
use ferry::domain::record::Record;
use ferry::domain::{RedcapError, Result};
use ferry::rules::definition::{RuleDefinition, RuleKind};
use ferry::rules::evaluator::ValidationMode;
use ferry::rules::RuleCatalog;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const FORM: &str = "demographics";

/// In-memory stand-in for one REDCap project
#[derive(Default)]
struct MockProject {
    store: Mutex<Vec<Record>>,
    import_calls: AtomicUsize,
    export_calls: AtomicUsize,
    // One scheduled failure is consumed per import call
    import_failures: Mutex<VecDeque<RedcapError>>,
    // Ids whose import silently does not apply (write-then-verify test)
    silently_dropped: Mutex<HashSet<String>>,
    delete_failure: Mutex<Option<RedcapError>>,
}

impl MockProject {
    fn with_records(values: &[(&str, &str)]) -> Self {
        let form = FormName::new(FORM).unwrap();
        let store = values
            .iter()
            .map(|(id, age)| {
                Record::new(RecordId::new(*id).unwrap(), form.clone(), None)
                    .with_field("age", *age)
            })
            .collect();
        Self {
            store: Mutex::new(store),
            ..Default::default()
        }
    }

    fn ids(&self) -> Vec<String> {
        self.store
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.id().as_str().to_string())
            .collect()
    }

    fn schedule_import_failure(&self, error: RedcapError) {
        self.import_failures.lock().unwrap().push_back(error);
    }

    fn drop_writes_for(&self, id: &str) {
        self.silently_dropped.lock().unwrap().insert(id.to_string());
    }

    fn fail_deletes_with(&self, error: RedcapError) {
        *self.delete_failure.lock().unwrap() = Some(error);
    }
}

fn dictionary() -> Vec<FieldMetadata> {
    vec![
        FieldMetadata {
            field_name: "record_id".to_string(),
            form_name: FORM.to_string(),
            field_type: "text".to_string(),
            field_label: "Record ID".to_string(),
        },
        FieldMetadata {
            field_name: "age".to_string(),
            form_name: FORM.to_string(),
            field_type: "text".to_string(),
            field_label: "Age".to_string(),
        },
    ]
}

#[async_trait]
impl DataCaptureApi for MockProject {
    fn primary_key(&self) -> &str {
        "record_id"
    }

    async fn project_info(&self) -> Result<ProjectInfo> {
        Ok(ProjectInfo::default())
    }

    async fn data_dictionary(&self, _forms: &[FormName]) -> Result<Vec<FieldMetadata>> {
        Ok(dictionary())
    }

    async fn instrument_list(&self) -> Result<Vec<FormName>> {
        Ok(vec![FormName::new(FORM).unwrap()])
    }

    async fn export_record_ids(
        &self,
        _forms: &[FormName],
        _events: &[EventName],
    ) -> Result<Vec<RecordId>> {
        let mut seen = HashSet::new();
        Ok(self
            .store
            .lock()
            .unwrap()
            .iter()
            .map(Record::id)
            .filter(|id| seen.insert(id.as_str().to_string()))
            .cloned()
            .collect())
    }

    async fn export_records(
        &self,
        ids: &[RecordId],
        form: &FormName,
        _events: &[EventName],
    ) -> Result<Vec<Record>> {
        self.export_calls.fetch_add(1, Ordering::SeqCst);
        let wanted: HashSet<&str> = ids.iter().map(RecordId::as_str).collect();
        Ok(self
            .store
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.form() == form && wanted.contains(r.id().as_str()))
            .cloned()
            .collect())
    }

    async fn import_records(&self, records: &[Record]) -> Result<usize> {
        self.import_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.import_failures.lock().unwrap().pop_front() {
            return Err(error.into());
        }

        let dropped = self.silently_dropped.lock().unwrap();
        let mut store = self.store.lock().unwrap();
        for record in records {
            if !dropped.contains(record.id().as_str()) {
                store.push(record.clone());
            }
        }
        // The count covers everything sent; silently dropped writes are
        // what the confirmation step exists to catch
        Ok(records.len())
    }

    async fn confirm_present(&self, ids: &[RecordId]) -> Result<Vec<RecordId>> {
        let store = self.store.lock().unwrap();
        let present: HashSet<&str> = store.iter().map(|r| r.id().as_str()).collect();
        Ok(ids
            .iter()
            .filter(|id| present.contains(id.as_str()))
            .cloned()
            .collect())
    }

    async fn delete_records(&self, ids: &[RecordId]) -> Result<usize> {
        if let Some(error) = self.delete_failure.lock().unwrap().take() {
            return Err(error.into());
        }
        let wanted: HashSet<&str> = ids.iter().map(RecordId::as_str).collect();
        let mut store = self.store.lock().unwrap();
        let before = store.len();
        store.retain(|r| !wanted.contains(r.id().as_str()));
        Ok(before - store.len())
    }
}

/// Catalog requiring age in [0, 120]
fn age_catalog() -> RuleCatalog {
    let mut catalog = RuleCatalog::new();
    catalog.add_rules(
        FORM,
        "age",
        vec![
            RuleDefinition::new(RuleKind::Required),
            RuleDefinition::new(RuleKind::Range {
                min: 0.0,
                max: 120.0,
            }),
        ],
    );
    catalog
}

fn options(batch_size: i64, move_records: bool) -> TransferOptions {
    TransferOptions {
        batch_size,
        move_records,
        dry_run: false,
        mode: ValidationMode::Strict,
        forms: Vec::new(),
        events: Vec::new(),
    }
}

#[tokio::test]
async fn move_mode_transfers_accepted_and_keeps_rejected() {
    let source = Arc::new(MockProject::with_records(&[
        ("1", "45"),
        ("2", "150"),
        ("3", "61"),
    ]));
    let destination = Arc::new(MockProject::default());

    let controller = TransferController::new(
        source.clone(),
        destination.clone(),
        age_catalog(),
        options(100, true),
    );
    let summary = controller.run().await;

    assert!(summary.is_clean());
    assert_eq!(summary.total_fetched, 3);
    assert_eq!(summary.total_accepted, 2);
    assert_eq!(summary.total_rejected, 1);
    assert_eq!(summary.total_written, 2);
    assert_eq!(summary.total_deleted, 2);

    // Accepted records moved; the rejected record stays in the source
    assert_eq!(destination.ids(), vec!["1", "3"]);
    assert_eq!(source.ids(), vec!["2"]);

    // The rejected record carries exactly the range violation
    assert_eq!(summary.rejected_verdicts.len(), 1);
    let verdict = &summary.rejected_verdicts[0];
    assert_eq!(verdict.record_id.as_str(), "2");
    assert_eq!(verdict.violations.len(), 1);
    assert_eq!(verdict.violations[0].variable, "age");
    assert_eq!(verdict.violations[0].rule, "range");
}

#[tokio::test]
async fn copy_mode_never_deletes_and_reruns_identically() {
    let source = Arc::new(MockProject::with_records(&[("1", "45"), ("2", "150")]));

    let mut counts = Vec::new();
    for _ in 0..2 {
        let destination = Arc::new(MockProject::default());
        let controller = TransferController::new(
            source.clone(),
            destination,
            age_catalog(),
            options(100, false),
        );
        let summary = controller.run().await;
        assert!(summary.is_clean());
        assert_eq!(summary.total_deleted, 0);
        counts.push((
            summary.total_fetched,
            summary.total_accepted,
            summary.total_rejected,
        ));
    }

    // Source untouched, so both runs see the same universe
    assert_eq!(counts[0], counts[1]);
    assert_eq!(source.ids(), vec!["1", "2"]);
}

#[tokio::test]
async fn rejected_records_are_never_written_or_deleted() {
    let source = Arc::new(MockProject::with_records(&[("1", "200"), ("2", "-4")]));
    let destination = Arc::new(MockProject::default());

    let controller = TransferController::new(
        source.clone(),
        destination.clone(),
        age_catalog(),
        options(100, true),
    );
    let summary = controller.run().await;

    assert_eq!(summary.total_rejected, 2);
    assert_eq!(summary.total_written, 0);
    assert_eq!(summary.total_deleted, 0);
    assert!(destination.ids().is_empty());
    assert_eq!(source.ids(), vec!["1", "2"]);
    // No accepted records, so no write was ever attempted
    assert_eq!(destination.import_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unconfirmed_write_is_never_deleted() {
    let source = Arc::new(MockProject::with_records(&[("1", "45"), ("2", "61")]));
    let destination = Arc::new(MockProject::default());
    // The write for record 2 silently does not apply
    destination.drop_writes_for("2");

    let controller = TransferController::new(
        source.clone(),
        destination.clone(),
        age_catalog(),
        options(100, true),
    );
    let summary = controller.run().await;

    assert!(summary.is_clean());
    assert_eq!(summary.total_accepted, 2);
    assert_eq!(summary.total_written, 1);
    assert_eq!(summary.total_deleted, 1);

    // Record 1 moved; record 2 must remain in the source untouched
    assert_eq!(source.ids(), vec!["2"]);
    assert_eq!(destination.ids(), vec!["1"]);
    assert!(summary.batches[0]
        .errors
        .iter()
        .any(|e| e.contains("not confirmed") && e.contains('2')));
}

#[tokio::test]
async fn deletion_failure_is_reported_not_rolled_back() {
    let source = Arc::new(MockProject::with_records(&[("1", "45")]));
    source.fail_deletes_with(RedcapError::ClientError {
        status: 400,
        message: "records locked".to_string(),
    });
    let destination = Arc::new(MockProject::default());

    let controller = TransferController::new(
        source.clone(),
        destination.clone(),
        age_catalog(),
        options(100, true),
    );
    let summary = controller.run().await;

    // Data-level deletion failure does not end the run
    assert!(summary.is_clean());
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(summary.total_written, 1);
    assert_eq!(summary.total_deleted, 0);

    // Written but not deleted: reported, destination write kept
    let not_deleted: Vec<&str> = summary.not_deleted.iter().map(RecordId::as_str).collect();
    assert_eq!(not_deleted, vec!["1"]);
    assert_eq!(destination.ids(), vec!["1"]);
    assert_eq!(source.ids(), vec!["1"]);
}

#[tokio::test]
async fn unbounded_batch_is_one_cycle() {
    let values: Vec<(String, String)> = (1..=1000)
        .map(|i| (i.to_string(), "45".to_string()))
        .collect();
    let refs: Vec<(&str, &str)> = values
        .iter()
        .map(|(id, age)| (id.as_str(), age.as_str()))
        .collect();

    let source = Arc::new(MockProject::with_records(&refs));
    let destination = Arc::new(MockProject::default());

    let controller = TransferController::new(
        source.clone(),
        destination.clone(),
        age_catalog(),
        options(-1, true),
    );
    let summary = controller.run().await;

    assert!(summary.is_clean());
    assert_eq!(summary.batches.len(), 1);
    assert_eq!(summary.total_fetched, 1000);
    assert_eq!(summary.total_deleted, 1000);
    // One form, one export call, one write/delete cycle
    assert_eq!(source.export_calls.load(Ordering::SeqCst), 1);
    assert_eq!(destination.import_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn batch_partitioning_preserves_fetch_order() {
    let source = Arc::new(MockProject::with_records(&[
        ("1", "45"),
        ("2", "150"),
        ("3", "61"),
        ("4", "200"),
        ("5", "30"),
    ]));
    let destination = Arc::new(MockProject::default());

    let controller = TransferController::new(
        source.clone(),
        destination.clone(),
        age_catalog(),
        options(2, false),
    );
    let summary = controller.run().await;

    assert_eq!(summary.batches.len(), 3);
    // Accepted records arrive at the destination in fetch order
    assert_eq!(destination.ids(), vec!["1", "3", "5"]);
    // Rejected verdicts are retained in fetch order
    let rejected: Vec<&str> = summary
        .rejected_verdicts
        .iter()
        .map(|v| v.record_id.as_str())
        .collect();
    assert_eq!(rejected, vec!["2", "4"]);
    // Each batch accounts for every fetched record
    for outcome in &summary.batches {
        assert_eq!(outcome.fetched, outcome.accepted + outcome.rejected);
    }
}

#[tokio::test]
async fn strict_mode_rejects_uncovered_variable_relaxed_accepts() {
    let build_source = || {
        let form = FormName::new(FORM).unwrap();
        let record = Record::new(RecordId::new("1").unwrap(), form, None)
            .with_field("age", "45")
            .with_field("bp_systolic", "118");
        MockProject {
            store: Mutex::new(vec![record]),
            ..Default::default()
        }
    };

    // Strict: bp_systolic has no rule, one coverage violation, rejected
    let strict_options = TransferOptions {
        mode: ValidationMode::Strict,
        ..options(100, false)
    };
    let summary = TransferController::new(
        Arc::new(build_source()),
        Arc::new(MockProject::default()),
        age_catalog(),
        strict_options,
    )
    .run()
    .await;

    assert_eq!(summary.total_rejected, 1);
    let verdict = &summary.rejected_verdicts[0];
    assert_eq!(verdict.violations.len(), 1);
    assert_eq!(verdict.violations[0].variable, "bp_systolic");
    assert_eq!(verdict.violations[0].rule, "coverage");

    // Relaxed: same record, no violation, accepted
    let relaxed_options = TransferOptions {
        mode: ValidationMode::Relaxed,
        ..options(100, false)
    };
    let summary = TransferController::new(
        Arc::new(build_source()),
        Arc::new(MockProject::default()),
        age_catalog(),
        relaxed_options,
    )
    .run()
    .await;

    assert_eq!(summary.total_rejected, 0);
    assert_eq!(summary.total_accepted, 1);
}

#[tokio::test]
async fn write_failure_isolates_to_its_batch() {
    let source = Arc::new(MockProject::with_records(&[
        ("1", "45"),
        ("2", "61"),
        ("3", "30"),
        ("4", "25"),
    ]));
    let destination = Arc::new(MockProject::default());
    // First import call fails with a data error; the second succeeds
    destination.schedule_import_failure(RedcapError::ClientError {
        status: 400,
        message: "invalid data".to_string(),
    });

    let controller = TransferController::new(
        source.clone(),
        destination.clone(),
        age_catalog(),
        options(2, true),
    );
    let summary = controller.run().await;

    assert!(summary.is_clean());
    assert_eq!(summary.batches.len(), 2);
    // Batch 1 recorded its failure and deleted nothing
    assert_eq!(summary.batches[0].written, 0);
    assert_eq!(summary.batches[0].deleted, 0);
    assert!(!summary.batches[0].errors.is_empty());
    // Batch 2 proceeded normally
    assert_eq!(summary.batches[1].written, 2);
    assert_eq!(summary.batches[1].deleted, 2);
    assert_eq!(destination.ids(), vec!["3", "4"]);
    assert_eq!(source.ids(), vec!["1", "2"]);
}

#[tokio::test]
async fn auth_failure_mid_run_is_fatal_with_partial_summary() {
    let source = Arc::new(MockProject::with_records(&[
        ("1", "45"),
        ("2", "61"),
        ("3", "30"),
        ("4", "25"),
    ]));
    let destination = Arc::new(MockProject::default());
    destination.schedule_import_failure(RedcapError::AuthenticationFailed(
        "token revoked".to_string(),
    ));

    let controller = TransferController::new(
        source.clone(),
        destination.clone(),
        age_catalog(),
        options(2, true),
    );
    let summary = controller.run().await;

    assert!(!summary.is_clean());
    assert!(matches!(summary.fatal, Some(RunFatal::Transport(_))));
    assert_eq!(summary.exit_code(), 2);
    // The failing batch is still reported before the run ends
    assert_eq!(summary.batches.len(), 1);
    assert_eq!(summary.total_fetched, 2);
    // Nothing was deleted from the source
    assert_eq!(source.ids(), vec!["1", "2", "3", "4"]);
}

#[tokio::test]
async fn dry_run_touches_nothing() {
    let source = Arc::new(MockProject::with_records(&[("1", "45"), ("2", "150")]));
    let destination = Arc::new(MockProject::default());

    let dry_options = TransferOptions {
        dry_run: true,
        ..options(100, true)
    };
    let summary = TransferController::new(
        source.clone(),
        destination.clone(),
        age_catalog(),
        dry_options,
    )
    .run()
    .await;

    assert!(summary.is_clean());
    assert_eq!(summary.total_accepted, 1);
    assert_eq!(summary.total_rejected, 1);
    assert_eq!(summary.total_written, 0);
    assert_eq!(summary.total_deleted, 0);
    assert!(destination.ids().is_empty());
    assert_eq!(source.ids(), vec!["1", "2"]);
    assert_eq!(destination.import_calls.load(Ordering::SeqCst), 0);
}
