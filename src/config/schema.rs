//! Configuration schema types
//!
//! Typed configuration for a transfer run, assembled from environment
//! variables by the [`loader`](crate::config::loader). Every section has a
//! `validate()` method; `FerryConfig::validate()` aggregates them and runs
//! the cross-section checks (same-project detection).

use crate::config::SecretString;
use crate::rules::evaluator::ValidationMode;
use crate::rules::parser::RuleFormat;
use secrecy::ExposeSecret;
use std::path::PathBuf;

/// Sentinel batch size meaning "fetch everything in one batch"
pub const UNBOUNDED_BATCH: i64 = -1;

/// Root configuration for a transfer run
#[derive(Debug, Clone)]
pub struct FerryConfig {
    /// Source project (records are fetched and optionally deleted here)
    pub source: ProjectConfig,

    /// Destination project (accepted records are written here)
    pub destination: ProjectConfig,

    /// Pipeline behavior
    pub transfer: TransferConfig,

    /// Rule catalog location and mode
    pub rules: RulesConfig,

    /// Log file output
    pub logging: LoggingConfig,

    /// HTTP client behavior
    pub http: HttpConfig,
}

impl FerryConfig {
    /// Validates the full configuration
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value found.
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate("source")?;
        self.destination.validate("destination")?;
        self.transfer.validate()?;
        self.rules.validate()?;
        self.http.validate()?;

        // Moving records into the project they came from would destroy them
        if self.source.api_token.expose_secret().as_ref()
            == self.destination.api_token.expose_secret().as_ref()
        {
            return Err(
                "Source and destination projects cannot be the same, check the API tokens"
                    .to_string(),
            );
        }

        Ok(())
    }
}

/// Connection settings for one REDCap project
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// REDCap API endpoint URL (the instance's `/api/` path)
    pub api_url: String,

    /// Project API token; redacted in Debug output and zeroized on drop
    pub api_token: SecretString,
}

impl ProjectConfig {
    fn validate(&self, label: &str) -> Result<(), String> {
        if self.api_token.expose_secret().is_empty() {
            return Err(format!("{label} API token cannot be empty"));
        }
        let parsed = url::Url::parse(&self.api_url)
            .map_err(|e| format!("Invalid {label} API URL '{}': {e}", self.api_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!(
                "Invalid {label} API URL '{}': scheme must be http or https",
                self.api_url
            ));
        }
        Ok(())
    }
}

/// Pipeline behavior settings
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Records per batch; [`UNBOUNDED_BATCH`] fetches everything at once
    pub batch_size: i64,

    /// Move mode: delete confirmed-written records from the source
    pub move_records: bool,

    /// Evaluate and report without writing or deleting
    pub dry_run: bool,

    /// Form allow-list; empty means all forms in the source project
    pub forms: Vec<String>,

    /// Event allow-list; empty means all events
    pub events: Vec<String>,
}

impl TransferConfig {
    fn validate(&self) -> Result<(), String> {
        if self.batch_size != UNBOUNDED_BATCH && self.batch_size < 1 {
            return Err(format!(
                "Invalid BATCH_SIZE {}. Must be a positive number or -1 for unbounded",
                self.batch_size
            ));
        }
        Ok(())
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            move_records: true,
            dry_run: false,
            forms: Vec::new(),
            events: Vec::new(),
        }
    }
}

/// Rule catalog settings
#[derive(Debug, Clone)]
pub struct RulesConfig {
    /// Directory holding one definition file per form
    pub dir: PathBuf,

    /// Serialization format of the definition files
    pub format: RuleFormat,

    /// Strict mode: a variable without any rule is itself a violation
    pub strict: bool,
}

impl RulesConfig {
    fn validate(&self) -> Result<(), String> {
        if self.dir.as_os_str().is_empty() {
            return Err("RULES_DIR cannot be empty".to_string());
        }
        Ok(())
    }

    /// The evaluator mode implied by the strict flag
    pub fn mode(&self) -> ValidationMode {
        if self.strict {
            ValidationMode::Strict
        } else {
            ValidationMode::Relaxed
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./rules/"),
            format: RuleFormat::Yaml,
            strict: true,
        }
    }
}

/// Log file output settings
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Write a rolling log file in addition to console output
    pub file_enabled: bool,

    /// Directory for log files
    pub file_dir: String,

    /// Log file name prefix
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file_enabled: true,
            file_dir: "./logs/".to_string(),
            file_prefix: "validation-errors-".to_string(),
        }
    }
}

/// HTTP client behavior
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// Retry behavior for transient transport failures
    pub retry: RetryConfig,
}

impl HttpConfig {
    fn validate(&self) -> Result<(), String> {
        if self.timeout_seconds == 0 {
            return Err("HTTP_TIMEOUT_SECONDS must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: usize,

    /// Initial delay in milliseconds
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    fn valid_config() -> FerryConfig {
        FerryConfig {
            source: ProjectConfig {
                api_url: "https://redcap.example.org/api/".to_string(),
                api_token: secret_string("SRC-TOKEN".to_string()),
            },
            destination: ProjectConfig {
                api_url: "https://redcap.example.org/api/".to_string(),
                api_token: secret_string("DEST-TOKEN".to_string()),
            },
            transfer: TransferConfig::default(),
            rules: RulesConfig::default(),
            logging: LoggingConfig::default(),
            http: HttpConfig::default(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_same_tokens_rejected() {
        let mut config = valid_config();
        config.destination.api_token = secret_string("SRC-TOKEN".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.contains("cannot be the same"));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let mut config = valid_config();
        config.source.api_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        let mut config = valid_config();
        config.source.api_url = "ftp://redcap.example.org/api/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_batch_size_validation() {
        let mut config = valid_config();

        config.transfer.batch_size = UNBOUNDED_BATCH;
        assert!(config.validate().is_ok());

        config.transfer.batch_size = 0;
        assert!(config.validate().is_err());

        config.transfer.batch_size = -7;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_token_rejected() {
        let mut config = valid_config();
        config.source.api_token = secret_string(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rules_mode_mapping() {
        let mut rules = RulesConfig::default();
        assert_eq!(rules.mode(), ValidationMode::Strict);
        rules.strict = false;
        assert_eq!(rules.mode(), ValidationMode::Relaxed);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = valid_config();
        config.http.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }
}
