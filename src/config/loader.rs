//! Configuration loader
//!
//! Assembles a [`FerryConfig`] from environment variables (a `.env` file is
//! honored by the binary before this runs). Four variables are required —
//! the two API URLs and the two tokens — everything else has a default.
//! An optional JSON file referenced by `CONF_FILE_PATH` supplies the
//! form/event allow-lists for deployments that prefer a file over long
//! comma-separated variables.

use crate::config::schema::{
    FerryConfig, HttpConfig, LoggingConfig, ProjectConfig, RetryConfig, RulesConfig, TransferConfig,
};
use crate::config::secret_string;
use crate::domain::errors::FerryError;
use crate::domain::result::Result;
use crate::rules::parser::RuleFormat;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

/// Filter lists accepted from the optional JSON configuration file
#[derive(Debug, Default, Deserialize)]
struct ExtraParams {
    #[serde(default)]
    forms: Vec<String>,
    #[serde(default)]
    events: Vec<String>,
}

/// Load and validate the full configuration from the environment
///
/// # Errors
///
/// Returns `FerryError::Configuration` if a required variable is missing,
/// a value does not parse, or cross-field validation fails.
pub fn load_from_env() -> Result<FerryConfig> {
    let source = ProjectConfig {
        api_url: required_var("SRC_API_URL")?,
        api_token: secret_string(required_var("SRC_API_TOKEN")?),
    };
    let destination = ProjectConfig {
        api_url: required_var("DEST_API_URL")?,
        api_token: secret_string(required_var("DEST_API_TOKEN")?),
    };

    let mut transfer = TransferConfig {
        batch_size: parsed_var("BATCH_SIZE")?.unwrap_or(100),
        move_records: bool_var("MOVE_RECORDS")?.unwrap_or(true),
        dry_run: false,
        forms: list_var("FORMS"),
        events: list_var("EVENTS"),
    };

    // A conf file supplements the env-provided filter lists; env wins
    // when both name the same list.
    if let Some(path) = optional_var("CONF_FILE_PATH") {
        let extra = load_extra_params(&path)?;
        if transfer.forms.is_empty() {
            transfer.forms = extra.forms;
        }
        if transfer.events.is_empty() {
            transfer.events = extra.events;
        }
    }

    let format_str = optional_var("RULE_DEFS_TYPE").unwrap_or_else(|| "yaml".to_string());
    let rules = RulesConfig {
        dir: PathBuf::from(optional_var("RULES_DIR").unwrap_or_else(|| "./rules/".to_string())),
        format: RuleFormat::from_str(&format_str).map_err(FerryError::Configuration)?,
        strict: bool_var("STRICT_MODE")?.unwrap_or(true),
    };

    let defaults = LoggingConfig::default();
    let logging = LoggingConfig {
        file_enabled: bool_var("LOG_FILE_ENABLED")?.unwrap_or(defaults.file_enabled),
        file_dir: optional_var("LOG_FILE_DIR").unwrap_or(defaults.file_dir),
        file_prefix: optional_var("LOG_FILE_PREFIX").unwrap_or(defaults.file_prefix),
    };

    let retry_defaults = RetryConfig::default();
    let http = HttpConfig {
        timeout_seconds: parsed_var("HTTP_TIMEOUT_SECONDS")?.unwrap_or(30),
        retry: RetryConfig {
            max_retries: parsed_var("HTTP_MAX_RETRIES")?.unwrap_or(retry_defaults.max_retries),
            ..retry_defaults
        },
    };

    let config = FerryConfig {
        source,
        destination,
        transfer,
        rules,
        logging,
        http,
    };

    config.validate().map_err(FerryError::Configuration)?;

    Ok(config)
}

/// Read the log file settings alone, with defaults
///
/// Used by the binary before full configuration loading, so logging is
/// already initialized when configuration errors are reported.
pub fn logging_from_env() -> LoggingConfig {
    let defaults = LoggingConfig::default();
    LoggingConfig {
        file_enabled: bool_var("LOG_FILE_ENABLED")
            .ok()
            .flatten()
            .unwrap_or(defaults.file_enabled),
        file_dir: optional_var("LOG_FILE_DIR").unwrap_or(defaults.file_dir),
        file_prefix: optional_var("LOG_FILE_PREFIX").unwrap_or(defaults.file_prefix),
    }
}

fn required_var(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(FerryError::Configuration(format!(
            "Missing required environment variable {name}"
        ))),
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match optional_var(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|e| {
            FerryError::Configuration(format!("Invalid value '{raw}' for {name}: {e}"))
        }),
    }
}

/// Boolean variables accept true/false and the 1/0 convention used by
/// older deployments.
fn bool_var(name: &str) -> Result<Option<bool>> {
    match optional_var(name) {
        None => Ok(None),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(Some(true)),
            "0" | "false" | "no" => Ok(Some(false)),
            other => Err(FerryError::Configuration(format!(
                "Invalid value '{other}' for {name}: expected true/false or 1/0"
            ))),
        },
    }
}

/// Comma-separated list variable; empty entries are dropped
fn list_var(name: &str) -> Vec<String> {
    optional_var(name)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn load_extra_params(path: &str) -> Result<ExtraParams> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        FerryError::Configuration(format!("Failed to read configuration file {path}: {e}"))
    })?;
    serde_json::from_str(&contents).map_err(|e| {
        FerryError::Configuration(format!("Failed to parse configuration file {path}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;
    use std::sync::Mutex;

    // Environment mutation is process-wide; serialize the tests that touch it
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: &[&str] = &[
        "SRC_API_URL",
        "SRC_API_TOKEN",
        "DEST_API_URL",
        "DEST_API_TOKEN",
        "BATCH_SIZE",
        "MOVE_RECORDS",
        "FORMS",
        "EVENTS",
        "CONF_FILE_PATH",
        "RULES_DIR",
        "RULE_DEFS_TYPE",
        "STRICT_MODE",
        "LOG_FILE_ENABLED",
        "LOG_FILE_DIR",
        "LOG_FILE_PREFIX",
        "HTTP_TIMEOUT_SECONDS",
        "HTTP_MAX_RETRIES",
    ];

    fn clear_env() {
        for var in ALL_VARS {
            std::env::remove_var(var);
        }
    }

    fn set_required() {
        std::env::set_var("SRC_API_URL", "https://redcap.example.org/api/");
        std::env::set_var("SRC_API_TOKEN", "SRC-TOKEN");
        std::env::set_var("DEST_API_URL", "https://redcap.example.org/api/");
        std::env::set_var("DEST_API_TOKEN", "DEST-TOKEN");
    }

    #[test]
    fn test_defaults_applied() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        set_required();

        let config = load_from_env().unwrap();
        assert_eq!(config.transfer.batch_size, 100);
        assert!(config.transfer.move_records);
        assert!(config.rules.strict);
        assert_eq!(config.rules.format, RuleFormat::Yaml);
        assert_eq!(config.rules.dir, PathBuf::from("./rules/"));
        assert_eq!(config.logging.file_prefix, "validation-errors-");
        assert_eq!(config.http.timeout_seconds, 30);

        clear_env();
    }

    #[test]
    fn test_missing_required_var() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        set_required();
        std::env::remove_var("DEST_API_TOKEN");

        let err = load_from_env().unwrap_err();
        assert!(err.to_string().contains("DEST_API_TOKEN"));
        assert_eq!(err.exit_code(), 1);

        clear_env();
    }

    #[test]
    fn test_overrides_and_lists() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        set_required();
        std::env::set_var("BATCH_SIZE", "-1");
        std::env::set_var("MOVE_RECORDS", "0");
        std::env::set_var("STRICT_MODE", "false");
        std::env::set_var("RULE_DEFS_TYPE", "json");
        std::env::set_var("FORMS", "demographics, labs,,vitals");

        let config = load_from_env().unwrap();
        assert_eq!(config.transfer.batch_size, -1);
        assert!(!config.transfer.move_records);
        assert!(!config.rules.strict);
        assert_eq!(config.rules.format, RuleFormat::Json);
        assert_eq!(
            config.transfer.forms,
            vec!["demographics", "labs", "vitals"]
        );

        clear_env();
    }

    #[test]
    fn test_same_tokens_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        set_required();
        std::env::set_var("DEST_API_TOKEN", "SRC-TOKEN");

        let err = load_from_env().unwrap_err();
        assert!(err.to_string().contains("cannot be the same"));

        clear_env();
    }

    #[test]
    fn test_invalid_bool_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        set_required();
        std::env::set_var("MOVE_RECORDS", "maybe");

        assert!(load_from_env().is_err());

        clear_env();
    }

    #[test]
    fn test_conf_file_supplements_filters() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        set_required();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"forms": ["demographics"], "events": ["visit_1_arm_1"]}"#)
            .unwrap();
        file.flush().unwrap();
        std::env::set_var("CONF_FILE_PATH", file.path());

        let config = load_from_env().unwrap();
        assert_eq!(config.transfer.forms, vec!["demographics"]);
        assert_eq!(config.transfer.events, vec!["visit_1_arm_1"]);

        clear_env();
    }

    #[test]
    fn test_env_filters_win_over_conf_file() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        set_required();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"forms": ["labs"]}"#).unwrap();
        file.flush().unwrap();
        std::env::set_var("CONF_FILE_PATH", file.path());
        std::env::set_var("FORMS", "demographics");

        let config = load_from_env().unwrap();
        assert_eq!(config.transfer.forms, vec!["demographics"]);

        clear_env();
    }

    #[test]
    fn test_tokens_are_loaded_secret() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        set_required();

        let config = load_from_env().unwrap();
        assert_eq!(config.source.api_token.expose_secret().as_ref(), "SRC-TOKEN");

        clear_env();
    }
}
