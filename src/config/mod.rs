//! Configuration management for Ferry.
//!
//! Configuration is environment-driven: the binary loads a `.env` file when
//! present, then [`loader::load_from_env`] assembles and validates a typed
//! [`FerryConfig`].
//!
//! # Recognized variables
//!
//! Required:
//!
//! - `SRC_API_URL`, `SRC_API_TOKEN` — source project endpoint and token
//! - `DEST_API_URL`, `DEST_API_TOKEN` — destination project endpoint and token
//!
//! Optional (defaults in parentheses):
//!
//! - `BATCH_SIZE` (100; `-1` fetches everything in one batch)
//! - `MOVE_RECORDS` (true) — delete confirmed-written records from the source
//! - `RULES_DIR` (`./rules/`), `RULE_DEFS_TYPE` (`yaml`; or `json`)
//! - `STRICT_MODE` (true) — unknown variables are violations
//! - `LOG_FILE_DIR` (`./logs/`), `LOG_FILE_PREFIX` (`validation-errors-`),
//!   `LOG_FILE_ENABLED` (true)
//! - `FORMS`, `EVENTS` — comma-separated allow-lists
//! - `CONF_FILE_PATH` — optional JSON file supplying the allow-lists
//! - `HTTP_TIMEOUT_SECONDS` (30), `HTTP_MAX_RETRIES` (3)
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ferry::config::load_from_env;
//!
//! # fn example() -> ferry::domain::Result<()> {
//! let config = load_from_env()?;
//! println!("Batch size: {}", config.transfer.batch_size);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_from_env, logging_from_env};
pub use schema::{
    FerryConfig, HttpConfig, LoggingConfig, ProjectConfig, RetryConfig, RulesConfig,
    TransferConfig, UNBOUNDED_BATCH,
};
pub use secret::{secret_string, SecretString, SecretValue};
