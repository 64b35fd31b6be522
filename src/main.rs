// Ferry - REDCap record transfer and validation tool
// Copyright (c) 2025 Ferry Contributors
// Licensed under the MIT License

use clap::Parser;
use ferry::cli::{Cli, Commands};
use ferry::config::logging_from_env;
use ferry::logging::init_logging;
use std::process;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    // Parse CLI arguments first so --env-file can point at the environment
    let cli = Cli::parse();

    // Load environment variables from the .env file if present; silently
    // ignored when missing
    match &cli.env_file {
        Some(path) => {
            if let Err(e) = dotenvy::from_filename(path) {
                eprintln!("Failed to load environment file {path}: {e}");
                process::exit(1);
            }
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }

    // Initialize logging before anything that can fail, so configuration
    // errors reach the log sink
    let log_level = cli.log_level.as_deref().unwrap_or("info");
    let logging_config = logging_from_env();
    let _guard = match init_logging(log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Ferry - REDCap record transfer and validation tool"
    );

    // Shutdown signal channel; the controller finishes the in-flight batch
    // before winding down
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("Failed to create SIGTERM handler");

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT (Ctrl+C), finishing current batch before shutdown");
                    let _ = shutdown_tx.send(true);
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, finishing current batch before shutdown");
                    let _ = shutdown_tx.send(true);
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            } else {
                tracing::info!("Received SIGINT (Ctrl+C), finishing current batch before shutdown");
                let _ = shutdown_tx.send(true);
            }
        }
    });

    let exit_code = match execute_command(&cli, shutdown_rx).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            2
        }
    };

    process::exit(exit_code);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli, shutdown_signal: watch::Receiver<bool>) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Transfer(args) => args.execute(shutdown_signal).await,
        Commands::ValidateRules(args) => args.execute().await,
        Commands::Init(args) => args.execute().await,
    }
}
