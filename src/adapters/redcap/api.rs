//! Data-capture API trait
//!
//! The seam between the transfer pipeline and the REDCap REST protocol.
//! The pipeline only ever talks to this trait; [`RedcapClient`] implements
//! it over HTTP and the test suite implements it in memory.
//!
//! [`RedcapClient`]: crate::adapters::redcap::client::RedcapClient

use crate::adapters::redcap::models::{FieldMetadata, ProjectInfo};
use crate::domain::ids::{EventName, FormName, RecordId};
use crate::domain::record::Record;
use crate::domain::Result;
use async_trait::async_trait;

/// Operations the pipeline needs from a data-capture project
#[async_trait]
pub trait DataCaptureApi: Send + Sync {
    /// The project's primary key field name (first field of the project)
    fn primary_key(&self) -> &str;

    /// Project-level attributes (longitudinal flag, title, id)
    async fn project_info(&self) -> Result<ProjectInfo>;

    /// The data dictionary for the given forms, in field order
    async fn data_dictionary(&self, forms: &[FormName]) -> Result<Vec<FieldMetadata>>;

    /// The names of all data-entry forms in the project
    async fn instrument_list(&self) -> Result<Vec<FormName>>;

    /// Unique record ids matching the form/event filters, in project order
    async fn export_record_ids(
        &self,
        forms: &[FormName],
        events: &[EventName],
    ) -> Result<Vec<RecordId>>;

    /// Export the instances of one form for the given record ids
    async fn export_records(
        &self,
        ids: &[RecordId],
        form: &FormName,
        events: &[EventName],
    ) -> Result<Vec<Record>>;

    /// Import records; returns the count the server reports as imported
    async fn import_records(&self, records: &[Record]) -> Result<usize>;

    /// Which of the given record ids exist in the project
    ///
    /// Used for write-then-verify: after an import, only ids positively
    /// confirmed here are eligible for source deletion.
    async fn confirm_present(&self, ids: &[RecordId]) -> Result<Vec<RecordId>>;

    /// Delete records; returns the count the server reports as deleted
    async fn delete_records(&self, ids: &[RecordId]) -> Result<usize>;
}
