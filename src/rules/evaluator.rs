//! Rule evaluator
//!
//! Evaluates one record against the catalog, producing a [`Verdict`]. All
//! violations for a record are collected — there is no short-circuit across
//! rules of the same variable — so the report is complete. Numeric parse
//! failures and type mismatches are violations, never errors: evaluating
//! one record can never abort a batch.
//!
//! Ordering: single-field violations come in record field order, rules in
//! catalog definition order within a variable; cross-field rules are
//! deferred until every single-field rule has run, since they may reference
//! other variables of the record.

use crate::domain::record::Record;
use crate::domain::verdict::{Verdict, Violation};
use crate::rules::catalog::RuleCatalog;
use crate::rules::definition::{RuleDefinition, RuleKind};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Rule label used for catalog-coverage violations in strict mode
pub const COVERAGE_RULE: &str = "coverage";

/// Whether a variable without any catalog entry is itself a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Missing coverage is a violation
    Strict,
    /// Missing coverage means "no constraint"
    Relaxed,
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(ValidationMode::Strict),
            "relaxed" => Ok(ValidationMode::Relaxed),
            other => Err(format!(
                "Invalid validation mode '{other}'. Must be one of: strict, relaxed"
            )),
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationMode::Strict => write!(f, "strict"),
            ValidationMode::Relaxed => write!(f, "relaxed"),
        }
    }
}

/// Evaluate a record against the catalog
pub fn evaluate(record: &Record, catalog: &RuleCatalog, mode: ValidationMode) -> Verdict {
    let form = record.form().as_str();
    let mut violations = Vec::new();
    // Cross-field rules run after every single-field rule of the record
    let mut deferred: Vec<(&str, &str, &RuleDefinition)> = Vec::new();

    for (variable, value) in record.fields() {
        match catalog.rules_for(form, variable) {
            None => {
                if mode == ValidationMode::Strict {
                    violations.push(Violation::new(
                        variable,
                        COVERAGE_RULE,
                        format!("no rule defined for {form}/{variable} in strict mode"),
                        crate::domain::verdict::Severity::Error,
                    ));
                }
            }
            Some(rules) => {
                for rule in rules {
                    if !rule.applies_to_event(record.event()) {
                        continue;
                    }
                    match &rule.kind {
                        RuleKind::CrossField { .. } => deferred.push((variable, value, rule)),
                        _ => {
                            if let Some(violation) = check_single_field(variable, value, rule) {
                                violations.push(violation);
                            }
                        }
                    }
                }
            }
        }
    }

    for (variable, value, rule) in deferred {
        if let Some(violation) = check_cross_field(record, variable, value, rule) {
            violations.push(violation);
        }
    }

    Verdict::new(record.id().clone(), record.event().cloned(), violations)
}

/// Apply one single-field rule; `None` means the rule passed
fn check_single_field(variable: &str, value: &str, rule: &RuleDefinition) -> Option<Violation> {
    let is_empty = value.trim().is_empty();

    let message = match &rule.kind {
        RuleKind::Required => {
            if is_empty {
                Some(format!("'{variable}' cannot be empty"))
            } else {
                None
            }
        }
        // Emptiness is governed by the required rule; every other kind
        // skips empty values
        _ if is_empty => None,
        RuleKind::Range { min, max } => match parse_number(value) {
            None => Some(format!(
                "'{variable}' value '{value}' is not numeric, expected range [{min}, {max}]"
            )),
            Some(number) if number < *min || number > *max => Some(format!(
                "'{variable}' value {value} outside expected range [{min}, {max}]"
            )),
            Some(_) => None,
        },
        RuleKind::Regex { pattern } => {
            if pattern.is_match(value) {
                None
            } else {
                Some(format!(
                    "'{variable}' value '{value}' does not match pattern '{pattern}'"
                ))
            }
        }
        RuleKind::Enumerated {
            allowed,
            case_insensitive,
        } => {
            let found = if *case_insensitive {
                allowed.iter().any(|a| a.eq_ignore_ascii_case(value))
            } else {
                allowed.iter().any(|a| a == value)
            };
            if found {
                None
            } else {
                Some(format!(
                    "'{variable}' value '{value}' not in allowed set [{}]",
                    allowed.join(", ")
                ))
            }
        }
        RuleKind::CrossField { .. } => None,
    };

    message.map(|default| {
        Violation::new(
            variable,
            rule.kind.label(),
            rule.message.clone().unwrap_or(default),
            rule.severity,
        )
    })
}

/// Apply one cross-field rule; `None` means the rule passed
fn check_cross_field(
    record: &Record,
    variable: &str,
    value: &str,
    rule: &RuleDefinition,
) -> Option<Violation> {
    let RuleKind::CrossField { other, op } = &rule.kind else {
        return None;
    };

    if value.trim().is_empty() {
        return None;
    }

    let make = |default: String| {
        Violation::new(
            variable,
            rule.kind.label(),
            rule.message.clone().unwrap_or(default),
            rule.severity,
        )
    };

    let Some(other_value) = record.value(other).filter(|v| !v.trim().is_empty()) else {
        return Some(make(format!(
            "'{variable}' references '{other}' which is missing or empty"
        )));
    };

    let ordering = compare_values(value, other_value);
    if op.matches(ordering) {
        None
    } else {
        Some(make(format!(
            "expected '{variable}' {op} '{other}' but got '{value}' vs '{other_value}'"
        )))
    }
}

/// Compare numerically when both sides parse as numbers, lexically otherwise
fn compare_values(left: &str, right: &str) -> Ordering {
    match (parse_number(left), parse_number(right)) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => left.cmp(right),
    }
}

fn parse_number(value: &str) -> Option<f64> {
    let parsed: f64 = value.trim().parse().ok()?;
    if parsed.is_nan() {
        None
    } else {
        Some(parsed)
    }
}
