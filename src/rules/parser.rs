//! Rule definition file parsing
//!
//! Two interchangeable serializations (YAML and JSON) feed one internal
//! [`RuleDefinition`](crate::rules::RuleDefinition) representation. A form
//! file maps each variable name to an ordered list of rule entries; the
//! raw entries are validated here — unknown kinds and malformed parameter
//! sets fail the catalog load, they never reach evaluation.

use crate::domain::errors::RuleLoadError;
use crate::domain::verdict::Severity;
use crate::rules::definition::{CompareOp, RuleDefinition, RuleKind};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Serialization format of the rule definition files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFormat {
    Yaml,
    Json,
}

impl RuleFormat {
    /// Primary file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            RuleFormat::Yaml => "yaml",
            RuleFormat::Json => "json",
        }
    }
}

impl FromStr for RuleFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(RuleFormat::Yaml),
            "json" => Ok(RuleFormat::Json),
            other => Err(format!(
                "Unsupported rule definition format '{other}'. Must be one of: yaml, json"
            )),
        }
    }
}

impl fmt::Display for RuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// One rule entry as it appears on disk, before kind validation
#[derive(Debug, Deserialize)]
pub(crate) struct RawRule {
    kind: String,
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    allowed: Option<Vec<String>>,
    #[serde(default)]
    case_insensitive: Option<bool>,
    #[serde(default)]
    other: Option<String>,
    #[serde(default)]
    op: Option<CompareOp>,
    #[serde(default)]
    severity: Option<Severity>,
    #[serde(default)]
    applies_when_event_in: Option<Vec<String>>,
    #[serde(default)]
    message: Option<String>,
}

impl RawRule {
    /// Validate the raw entry and build the internal representation
    pub(crate) fn into_definition(
        self,
        form: &str,
        variable: &str,
    ) -> Result<RuleDefinition, RuleLoadError> {
        let malformed = |detail: String| RuleLoadError::MalformedParameters {
            form: form.to_string(),
            variable: variable.to_string(),
            detail,
        };

        let kind = match self.kind.as_str() {
            "required" => RuleKind::Required,
            "range" => {
                let min = self
                    .min
                    .ok_or_else(|| malformed("range rule requires 'min'".to_string()))?;
                let max = self
                    .max
                    .ok_or_else(|| malformed("range rule requires 'max'".to_string()))?;
                if min.is_nan() || max.is_nan() {
                    return Err(malformed("range bounds must be numbers".to_string()));
                }
                if min > max {
                    return Err(malformed(format!(
                        "range min {min} is greater than max {max}"
                    )));
                }
                RuleKind::Range { min, max }
            }
            "regex" => {
                let pattern_str = self
                    .pattern
                    .ok_or_else(|| malformed("regex rule requires 'pattern'".to_string()))?;
                let pattern = Regex::new(&pattern_str)
                    .map_err(|e| malformed(format!("invalid pattern '{pattern_str}': {e}")))?;
                RuleKind::Regex { pattern }
            }
            "enumerated" => {
                let allowed = self
                    .allowed
                    .ok_or_else(|| malformed("enumerated rule requires 'allowed'".to_string()))?;
                if allowed.is_empty() {
                    return Err(malformed(
                        "enumerated rule requires a non-empty 'allowed' set".to_string(),
                    ));
                }
                RuleKind::Enumerated {
                    allowed,
                    case_insensitive: self.case_insensitive.unwrap_or(false),
                }
            }
            "cross_field" => {
                let other = self
                    .other
                    .ok_or_else(|| malformed("cross_field rule requires 'other'".to_string()))?;
                let op = self
                    .op
                    .ok_or_else(|| malformed("cross_field rule requires 'op'".to_string()))?;
                if other == variable {
                    return Err(malformed(format!(
                        "cross_field rule cannot reference its own variable '{variable}'"
                    )));
                }
                RuleKind::CrossField { other, op }
            }
            unknown => {
                return Err(RuleLoadError::UnknownKind {
                    form: form.to_string(),
                    variable: variable.to_string(),
                    kind: unknown.to_string(),
                })
            }
        };

        let mut definition = RuleDefinition::new(kind);
        if let Some(severity) = self.severity {
            definition.severity = severity;
        }
        definition.applies_when_event_in = self.applies_when_event_in;
        definition.message = self.message;
        Ok(definition)
    }
}

/// Parse one form definition file into (variable → raw rule list)
pub(crate) fn parse_form_file(
    contents: &str,
    format: RuleFormat,
    file: &str,
) -> Result<HashMap<String, Vec<RawRule>>, RuleLoadError> {
    let parse_err = |detail: String| RuleLoadError::Parse {
        file: file.to_string(),
        detail,
    };

    match format {
        RuleFormat::Yaml => serde_yaml::from_str(contents).map_err(|e| parse_err(e.to_string())),
        RuleFormat::Json => serde_json::from_str(contents).map_err(|e| parse_err(e.to_string())),
    }
}
