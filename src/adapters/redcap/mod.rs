//! REDCap adapter
//!
//! The [`DataCaptureApi`] trait is the seam the pipeline depends on;
//! [`RedcapClient`] implements it over the REDCap REST API.

pub mod api;
pub mod client;
pub mod models;

pub use api::DataCaptureApi;
pub use client::RedcapClient;
pub use models::{FieldMetadata, ProjectInfo};
