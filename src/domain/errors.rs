//! Domain error types
//!
//! Error hierarchy for Ferry. All errors are domain-specific and don't
//! expose third-party types; the taxonomy separates configuration errors
//! (fatal before any batch runs), transport errors (fatal mid-run) and
//! data errors (recovered per record or per batch).

use thiserror::Error;

/// Main Ferry error type
#[derive(Debug, Error)]
pub enum FerryError {
    /// Configuration-related errors (missing variable, invalid value,
    /// project mismatch). Fatal before any batch runs.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// REDCap API errors
    #[error("REDCap error: {0}")]
    Redcap(#[from] RedcapError),

    /// Rule definition loading errors
    #[error("Rule load error: {0}")]
    RuleLoad(#[from] RuleLoadError),

    /// Transfer pipeline errors
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl FerryError {
    /// Process exit code for a fatal error: 1 for configuration problems,
    /// 2 for transport and everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            FerryError::Configuration(_) | FerryError::RuleLoad(_) => 1,
            _ => 2,
        }
    }
}

/// REDCap API errors
///
/// Errors raised by the REDCap client. These don't expose the underlying
/// HTTP client types.
#[derive(Debug, Error)]
pub enum RedcapError {
    /// Failed to reach the REDCap instance
    #[error("Failed to connect to REDCap: {0}")]
    ConnectionFailed(String),

    /// Token rejected (401/403)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Request timed out
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx other than auth)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Response did not parse as expected
    #[error("Invalid response from REDCap: {0}")]
    InvalidResponse(String),
}

impl RedcapError {
    /// Transport-level errors abort the run; client/data errors are
    /// recovered per batch.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RedcapError::ClientError { .. } | RedcapError::InvalidResponse(_)
        )
    }

    /// Whether the client may retry the request with backoff
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RedcapError::ConnectionFailed(_)
                | RedcapError::Timeout(_)
                | RedcapError::ServerError { .. }
        )
    }
}

/// Rule definition loading errors
///
/// Raised while building the rule catalog; all of these are configuration
/// errors and abort the run before any batch is fetched.
#[derive(Debug, Error)]
pub enum RuleLoadError {
    /// Rule kind not in the recognized set
    #[error("Unknown rule kind '{kind}' for {form}/{variable}")]
    UnknownKind {
        form: String,
        variable: String,
        kind: String,
    },

    /// Parameters missing or inconsistent for the declared kind
    #[error("Malformed parameters for {form}/{variable}: {detail}")]
    MalformedParameters {
        form: String,
        variable: String,
        detail: String,
    },

    /// Same (form, variable, kind) defined twice
    #[error("Duplicate {kind} rule for {form}/{variable}")]
    DuplicateRule {
        form: String,
        variable: String,
        kind: String,
    },

    /// Rule file did not parse in the configured format
    #[error("Failed to parse rule file {file}: {detail}")]
    Parse { file: String, detail: String },

    /// Rule file could not be read
    #[error("Failed to read rule file {file}: {detail}")]
    Io { file: String, detail: String },
}

// Conversion from std::io::Error
impl From<std::io::Error> for FerryError {
    fn from(err: std::io::Error) -> Self {
        FerryError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for FerryError {
    fn from(err: serde_json::Error) -> Self {
        FerryError::Serialization(err.to_string())
    }
}
