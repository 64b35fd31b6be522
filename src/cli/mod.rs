//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Ferry using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Ferry - validated record transfer between REDCap projects
#[derive(Parser, Debug)]
#[command(name = "ferry")]
#[command(version, about, long_about = None)]
#[command(author = "Ferry Contributors")]
pub struct Cli {
    /// Environment file to load before reading configuration
    #[arg(short, long, env = "FERRY_ENV_FILE")]
    pub env_file: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "FERRY_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate and transfer records from source to destination
    Transfer(commands::transfer::TransferArgs),

    /// Check rule definitions against the source project
    ValidateRules(commands::validate_rules::ValidateRulesArgs),

    /// Generate a starter .env file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_transfer() {
        let cli = Cli::parse_from(["ferry", "transfer"]);
        assert!(matches!(cli.command, Commands::Transfer(_)));
    }

    #[test]
    fn test_cli_parse_transfer_flags() {
        let cli = Cli::parse_from(["ferry", "transfer", "--dry-run", "--batch-size", "-1"]);
        let Commands::Transfer(args) = cli.command else {
            panic!("expected transfer command");
        };
        assert!(args.dry_run);
        assert_eq!(args.batch_size, Some(-1));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["ferry", "--log-level", "debug", "transfer"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_validate_rules() {
        let cli = Cli::parse_from(["ferry", "validate-rules"]);
        assert!(matches!(cli.command, Commands::ValidateRules(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["ferry", "init", "--force"]);
        let Commands::Init(args) = cli.command else {
            panic!("expected init command");
        };
        assert!(args.force);
        assert_eq!(args.output, ".env");
    }
}
