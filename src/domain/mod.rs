//! Domain models and types for Ferry.
//!
//! This module contains the core domain models shared by every layer of
//! the pipeline.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`RecordId`], [`FormName`], [`EventName`])
//! - **The transfer unit** ([`Record`])
//! - **Validation outcomes** ([`Verdict`], [`Violation`], [`Severity`])
//! - **Error types** ([`FerryError`], [`RedcapError`], [`RuleLoadError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Ferry uses the newtype pattern for identifiers to prevent mixing
//! different ID types:
//!
//! ```rust
//! use ferry::domain::{FormName, RecordId};
//!
//! # fn example() -> std::result::Result<(), String> {
//! let record_id = RecordId::new("1042")?;
//! let form = FormName::new("demographics")?;
//!
//! // This won't compile - type safety prevents mixing IDs
//! // let wrong: RecordId = form;  // Compile error!
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T>`] and propagate with `?`;
//! record-level validation problems are data, not errors — they live on
//! the [`Verdict`], never in the error channel.

pub mod errors;
pub mod ids;
pub mod record;
pub mod result;
pub mod verdict;

// Re-export commonly used types for convenience
pub use errors::{FerryError, RedcapError, RuleLoadError};
pub use ids::{EventName, FormName, RecordId};
pub use record::Record;
pub use result::Result;
pub use verdict::{Severity, Verdict, VerdictStatus, Violation};
