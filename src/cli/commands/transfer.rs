//! Transfer command implementation
//!
//! Runs the full pipeline: load configuration and rules, connect both
//! projects, check compatibility, then fetch → validate → write → delete
//! batch by batch.

use crate::adapters::redcap::{DataCaptureApi, RedcapClient};
use crate::config::load_from_env;
use crate::core::transfer::{TransferController, TransferOptions};
use crate::rules::RuleCatalog;
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the transfer command
#[derive(Args, Debug)]
pub struct TransferArgs {
    /// Validate and report without writing to the destination or deleting
    /// from the source
    #[arg(long)]
    pub dry_run: bool,

    /// Copy instead of move, regardless of MOVE_RECORDS
    #[arg(long)]
    pub copy_only: bool,

    /// Override BATCH_SIZE (-1 fetches everything at once)
    #[arg(long, allow_negative_numbers = true)]
    pub batch_size: Option<i64>,

    /// Override the form allow-list (comma-separated)
    #[arg(long)]
    pub forms: Option<String>,

    /// Override the event allow-list (comma-separated)
    #[arg(long)]
    pub events: Option<String>,
}

impl TransferArgs {
    /// Execute the transfer command
    pub async fn execute(&self, shutdown_signal: watch::Receiver<bool>) -> anyhow::Result<i32> {
        tracing::info!("Starting transfer command");

        // Load configuration
        let mut config = match load_from_env() {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Configuration loading failed");
                eprintln!("Error: {e}");
                return Ok(e.exit_code());
            }
        };

        // Apply CLI overrides
        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.transfer.dry_run = true;
        }
        if self.copy_only {
            tracing::info!("Disabling move mode from CLI");
            config.transfer.move_records = false;
        }
        if let Some(batch_size) = self.batch_size {
            tracing::info!(batch_size = batch_size, "Overriding batch size from CLI");
            config.transfer.batch_size = batch_size;
        }
        if let Some(forms) = &self.forms {
            config.transfer.forms = split_list(forms);
        }
        if let Some(events) = &self.events {
            config.transfer.events = split_list(events);
        }

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(1);
        }

        // Connect both projects; auth and connectivity problems surface
        // here, before any rules are evaluated
        let source = match RedcapClient::connect(&config.source, &config.http).await {
            Ok(client) => Arc::new(client),
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to source project");
                eprintln!("Error: {e}");
                return Ok(e.exit_code());
            }
        };
        let destination = match RedcapClient::connect(&config.destination, &config.http).await {
            Ok(client) => Arc::new(client),
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to destination project");
                eprintln!("Error: {e}");
                return Ok(e.exit_code());
            }
        };

        // Rule files are resolved per form, so the form set must be known
        // before the catalog loads
        let forms = if config.transfer.forms.is_empty() {
            match source.instrument_list().await {
                Ok(forms) => {
                    config.transfer.forms =
                        forms.iter().map(|f| f.as_str().to_string()).collect();
                    forms
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to list source project forms");
                    eprintln!("Error: {e}");
                    return Ok(e.exit_code());
                }
            }
        } else {
            match config
                .transfer
                .forms
                .iter()
                .map(|f| f.parse())
                .collect::<Result<Vec<_>, _>>()
            {
                Ok(forms) => forms,
                Err(e) => {
                    eprintln!("Error: invalid form name: {e}");
                    return Ok(1);
                }
            }
        };

        let catalog = match RuleCatalog::load(&config.rules.dir, config.rules.format, &forms) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load rule catalog");
                eprintln!("Error: {e}");
                return Ok(1);
            }
        };

        let options = TransferOptions::from_config(&config);
        let controller = TransferController::new(source, destination, catalog, options)
            .with_shutdown(shutdown_signal);

        let summary = controller.run().await;
        summary.log_summary();

        println!(
            "Transfer run {}: {} fetched, {} accepted, {} rejected, {} written, {} deleted",
            summary.run_id,
            summary.total_fetched,
            summary.total_accepted,
            summary.total_rejected,
            summary.total_written,
            summary.total_deleted,
        );
        if let Some(fatal) = &summary.fatal {
            eprintln!("Run terminated: {fatal}");
        }

        Ok(summary.exit_code())
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
