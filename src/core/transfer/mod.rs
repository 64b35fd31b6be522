//! The validation and transfer pipeline.

pub mod controller;
pub mod fetcher;
pub mod summary;

pub use controller::{TransferController, TransferOptions};
pub use fetcher::{BatchFetcher, BatchPage, Cursor};
pub use summary::{BatchOutcome, RunFatal, TransferSummary};
