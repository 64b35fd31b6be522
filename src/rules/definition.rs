//! Rule definition model
//!
//! A [`RuleDefinition`] is one data-quality constraint scoped to a single
//! (form, variable) pair. The rule kinds form a closed set, each variant
//! carrying its own parameter payload; evaluation dispatches exhaustively
//! over the enum rather than over open-ended type tags.

use crate::domain::ids::EventName;
use crate::domain::verdict::Severity;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator for cross-field rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Apply the operator to an ordering of (left, right)
    pub fn matches(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CompareOp::Eq => ordering == Equal,
            CompareOp::Ne => ordering != Equal,
            CompareOp::Lt => ordering == Less,
            CompareOp::Le => ordering != Greater,
            CompareOp::Gt => ordering == Greater,
            CompareOp::Ge => ordering != Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        };
        write!(f, "{symbol}")
    }
}

/// The closed set of rule kinds, each with its parameter payload
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// Value must be present and non-empty
    Required,
    /// Numeric value must fall inside [min, max]; non-numeric values
    /// violate the rule
    Range { min: f64, max: f64 },
    /// String value must match the pattern
    Regex { pattern: Regex },
    /// Value must be one of the allowed codes
    Enumerated {
        allowed: Vec<String>,
        case_insensitive: bool,
    },
    /// Value must compare against another variable in the same record
    CrossField { other: String, op: CompareOp },
}

impl RuleKind {
    /// Stable label used in violation reports and duplicate detection
    pub fn label(&self) -> &'static str {
        match self {
            RuleKind::Required => "required",
            RuleKind::Range { .. } => "range",
            RuleKind::Regex { .. } => "regex",
            RuleKind::Enumerated { .. } => "enumerated",
            RuleKind::CrossField { .. } => "cross_field",
        }
    }
}

/// One data-quality rule, immutable once loaded
#[derive(Debug, Clone)]
pub struct RuleDefinition {
    /// What to check, with kind-specific parameters
    pub kind: RuleKind,
    /// Whether a violation blocks acceptance
    pub severity: Severity,
    /// When set, the rule only applies to records collected under one of
    /// these events; non-longitudinal records never match
    pub applies_when_event_in: Option<Vec<String>>,
    /// Optional override for the generated violation message
    pub message: Option<String>,
}

impl RuleDefinition {
    /// Create a rule with default severity (error) and no event filter
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            applies_when_event_in: None,
            message: None,
        }
    }

    /// Set the severity (builder style)
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Restrict the rule to a set of events (builder style)
    pub fn with_event_filter(mut self, events: Vec<String>) -> Self {
        self.applies_when_event_in = Some(events);
        self
    }

    /// Override the violation message (builder style)
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Whether this rule applies to a record collected under `event`
    pub fn applies_to_event(&self, event: Option<&EventName>) -> bool {
        match &self.applies_when_event_in {
            None => true,
            Some(events) => match event {
                Some(name) => events.iter().any(|e| e == name.as_str()),
                None => false,
            },
        }
    }
}
