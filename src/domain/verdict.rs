//! Per-record validation verdicts
//!
//! The [`Verdict`] is the evaluator's output for one record: an overall
//! accept/reject status plus the ordered list of rule violations that
//! produced it. Any error-severity violation rejects the record; warnings
//! are retained for reporting but never block acceptance.

use crate::domain::ids::{EventName, RecordId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a rule violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks acceptance of the record
    Error,
    /// Reported but does not block acceptance
    Warning,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// One rule violation on one variable
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Variable the violated rule is scoped to
    pub variable: String,
    /// Label of the violated rule kind (e.g. "range", "required")
    pub rule: String,
    /// Human-readable diagnosis
    pub message: String,
    /// Whether this violation blocks acceptance
    pub severity: Severity,
}

impl Violation {
    /// Create a new violation
    pub fn new(
        variable: impl Into<String>,
        rule: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            variable: variable.into(),
            rule: rule.into(),
            message: message.into(),
            severity,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}): {}",
            self.severity, self.variable, self.rule, self.message
        )
    }
}

/// Overall status of a record after evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictStatus {
    /// Eligible for transfer to the destination
    Accepted,
    /// Held back; never written, never deleted
    Rejected,
}

/// Evaluation result for one record
#[derive(Debug, Clone)]
pub struct Verdict {
    /// Record the verdict applies to
    pub record_id: RecordId,
    /// Event of the evaluated instance, if longitudinal
    pub event: Option<EventName>,
    /// Accept/reject decision
    pub status: VerdictStatus,
    /// Violations in reporting order (record field order, then catalog
    /// rule order, cross-field violations last)
    pub violations: Vec<Violation>,
}

impl Verdict {
    /// Build a verdict, deriving the status from the violations:
    /// any error-severity violation rejects the record.
    pub fn new(record_id: RecordId, event: Option<EventName>, violations: Vec<Violation>) -> Self {
        let status = if violations
            .iter()
            .any(|v| v.severity == Severity::Error)
        {
            VerdictStatus::Rejected
        } else {
            VerdictStatus::Accepted
        };
        Self {
            record_id,
            event,
            status,
            violations,
        }
    }

    /// Whether the record passed the validation gate
    pub fn is_accepted(&self) -> bool {
        self.status == VerdictStatus::Accepted
    }

    /// Number of error-severity violations
    pub fn error_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Error)
            .count()
    }

    /// Number of warning-severity violations
    pub fn warning_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Warning)
            .count()
    }
}
