//! Rule catalog
//!
//! The catalog indexes rule definitions by (form, variable) and is built
//! once per run, read-only thereafter — it is safe to share across batches
//! without synchronization. Loading fails fast on unknown kinds, malformed
//! parameters and duplicate (form, variable, kind) entries; a missing
//! definition file for a form is not a load failure (strict mode surfaces
//! the gap per record instead).

use crate::domain::errors::RuleLoadError;
use crate::domain::ids::FormName;
use crate::rules::definition::RuleDefinition;
use crate::rules::parser::{parse_form_file, RuleFormat};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Index of rule definitions for one project
#[derive(Debug, Default)]
pub struct RuleCatalog {
    // (form, variable) -> rules in definition order
    rules: HashMap<(String, String), Vec<RuleDefinition>>,
    // forms that had a definition file
    forms: Vec<String>,
}

impl RuleCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rule definitions for the given forms from a directory
    ///
    /// Expects one file per form named `<form>.<ext>` in the configured
    /// format (`.yml` is also accepted for YAML). Forms without a
    /// definition file are skipped with a warning; under strict mode their
    /// variables surface as catalog-coverage violations once records flow.
    pub fn load(
        rules_dir: impl AsRef<Path>,
        format: RuleFormat,
        forms: &[FormName],
    ) -> Result<Self, RuleLoadError> {
        let rules_dir = rules_dir.as_ref();
        let mut catalog = RuleCatalog::new();

        for form in forms {
            let Some((path, contents)) = read_form_file(rules_dir, form.as_str(), format)? else {
                tracing::warn!(
                    form = %form,
                    dir = %rules_dir.display(),
                    "No rule definition file found for form"
                );
                continue;
            };

            let parsed = parse_form_file(&contents, format, &path)?;
            for (variable, raw_rules) in parsed {
                let mut definitions = Vec::with_capacity(raw_rules.len());
                let mut seen_kinds = HashSet::new();
                for raw in raw_rules {
                    let definition = raw.into_definition(form.as_str(), &variable)?;
                    if !seen_kinds.insert(definition.kind.label()) {
                        return Err(RuleLoadError::DuplicateRule {
                            form: form.as_str().to_string(),
                            variable: variable.clone(),
                            kind: definition.kind.label().to_string(),
                        });
                    }
                    definitions.push(definition);
                }
                catalog.add_rules(form.as_str(), &variable, definitions);
            }
            catalog.forms.push(form.as_str().to_string());
        }

        tracing::info!(
            forms = catalog.forms.len(),
            variables = catalog.rules.len(),
            rules = catalog.rule_count(),
            "Rule catalog loaded"
        );

        Ok(catalog)
    }

    /// Insert an ordered rule sequence for one (form, variable) pair
    pub fn add_rules(&mut self, form: &str, variable: &str, rules: Vec<RuleDefinition>) {
        self.rules
            .entry((form.to_string(), variable.to_string()))
            .or_default()
            .extend(rules);
    }

    /// The ordered rules for one (form, variable) pair, if any are defined
    pub fn rules_for(&self, form: &str, variable: &str) -> Option<&[RuleDefinition]> {
        self.rules
            .get(&(form.to_string(), variable.to_string()))
            .map(Vec::as_slice)
    }

    /// Whether a definition file was loaded for this form
    pub fn covers_form(&self, form: &str) -> bool {
        self.forms.iter().any(|f| f == form)
    }

    /// All (form, variable) pairs with rules, sorted for stable reporting
    pub fn variables(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .rules
            .keys()
            .map(|(form, variable)| (form.as_str(), variable.as_str()))
            .collect();
        pairs.sort_unstable();
        pairs
    }

    /// Total number of rule definitions across all variables
    pub fn rule_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    /// Number of (form, variable) pairs with at least one rule
    pub fn variable_count(&self) -> usize {
        self.rules.len()
    }

    /// Whether the catalog holds no rules at all
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Read `<dir>/<form>.<ext>`, trying `.yml` as a fallback for YAML.
/// Returns `Ok(None)` when no file exists for the form.
fn read_form_file(
    dir: &Path,
    form: &str,
    format: RuleFormat,
) -> Result<Option<(String, String)>, RuleLoadError> {
    let mut candidates = vec![dir.join(format!("{form}.{}", format.extension()))];
    if format == RuleFormat::Yaml {
        candidates.push(dir.join(format!("{form}.yml")));
    }

    for path in candidates {
        if !path.exists() {
            continue;
        }
        let display = path.display().to_string();
        let contents = fs::read_to_string(&path).map_err(|e| RuleLoadError::Io {
            file: display.clone(),
            detail: e.to_string(),
        })?;
        return Ok(Some((display, contents)));
    }

    Ok(None)
}
