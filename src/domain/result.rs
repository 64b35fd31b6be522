//! Result type alias for Ferry

use super::errors::FerryError;

/// Result type alias for Ferry operations
///
/// Convenience alias using `FerryError` as the error type; use this for
/// fallible operations throughout the codebase.
///
/// # Examples
///
/// ```
/// use ferry::domain::result::Result;
/// use ferry::domain::errors::FerryError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(FerryError::Transfer("batch write failed".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, FerryError>;
