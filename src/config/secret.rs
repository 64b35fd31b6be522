//! Secure credential handling using the secrecy crate
//!
//! API tokens grant full read/write/delete access to a REDCap project, so
//! they are held in a `Secret` container: memory is zeroed on drop and the
//! Debug implementation redacts the value, keeping tokens out of logs and
//! crash reports. Call `expose_secret()` only at the point a request is
//! built.
//!
//! # Example
//!
//! ```rust
//! use ferry::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let token = secret_string("A9F3...".to_string());
//! assert_eq!(token.expose_secret().as_ref(), "A9F3...");
//! println!("{:?}", token); // Prints: Secret([REDACTED])
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret};
use zeroize::Zeroize;

/// Newtype wrapper for String that implements the required traits for Secret
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    /// Check if the secret value is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Type alias for a secret string
///
/// Wraps a `SecretValue` in a `Secret` container that zeros the memory on
/// drop and requires explicit `expose_secret()` access.
pub type SecretString = Secret<SecretValue>;

/// Helper function to create a SecretString from a String
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}
