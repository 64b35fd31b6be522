// Ferry - REDCap record transfer and validation tool
// Copyright (c) 2025 Ferry Contributors
// Licensed under the MIT License

//! # Ferry - validated record transfer for REDCap
//!
//! Ferry moves clinical-research form records between two REDCap projects,
//! validating every record against externally supplied data-quality rules
//! before it is committed to the destination and (optionally) purged from
//! the source.
//!
//! ## Overview
//!
//! One run of the pipeline:
//! - **Loads** rule definitions (YAML or JSON, one file per form) into an
//!   immutable catalog
//! - **Fetches** records from the source project in bounded batches
//! - **Evaluates** each record field by field, collecting all violations
//! - **Writes** accepted records to the destination, then positively
//!   confirms the write
//! - **Deletes** confirmed records from the source when move mode is on
//! - **Reports** a transfer summary covering every record that was touched
//!
//! Rejected records are never written and never deleted; a record is
//! deleted from the source only after its destination write is confirmed.
//!
//! ## Architecture
//!
//! Ferry follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - The transfer pipeline (fetcher, controller, summary)
//! - [`rules`] - Rule definitions, catalog and evaluator
//! - [`adapters`] - The REDCap REST client behind a trait seam
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Environment-driven configuration
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ferry::adapters::redcap::RedcapClient;
//! use ferry::config::load_from_env;
//! use ferry::core::transfer::{TransferController, TransferOptions};
//! use ferry::rules::RuleCatalog;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_from_env()?;
//!
//!     let source = Arc::new(RedcapClient::connect(&config.source, &config.http).await?);
//!     let destination =
//!         Arc::new(RedcapClient::connect(&config.destination, &config.http).await?);
//!
//!     let forms: Vec<_> = config
//!         .transfer
//!         .forms
//!         .iter()
//!         .map(|f| f.parse())
//!         .collect::<Result<_, _>>()?;
//!     let catalog = RuleCatalog::load(&config.rules.dir, config.rules.format, &forms)?;
//!
//!     let options = TransferOptions::from_config(&config);
//!     let summary = TransferController::new(source, destination, catalog, options)
//!         .run()
//!         .await;
//!
//!     summary.log_summary();
//!     std::process::exit(summary.exit_code());
//! }
//! ```
//!
//! ## Error Handling
//!
//! Ferry separates three failure surfaces. Record-level validation
//! problems land on [`domain::Verdict`]s and never abort a batch.
//! Batch-level write problems are recorded in the summary and isolate to
//! their batch. Configuration and transport problems are fatal and
//! terminate the run — with the partial summary still reported.
//!
//! ## Logging
//!
//! Ferry uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(batch = 3, records = 100, "Processing batch");
//! warn!(record_id = "1042", "Record rejected by validation");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
pub mod rules;
