//! Validate-rules command implementation
//!
//! Loads the rule catalog and cross-checks every variable it names against
//! the source project's data dictionary, without touching any records.
//! Catches typos in rule files before a scheduled run trips over them.

use crate::adapters::redcap::{DataCaptureApi, RedcapClient};
use crate::config::load_from_env;
use crate::rules::RuleCatalog;
use clap::Args;
use std::collections::HashSet;

/// Arguments for the validate-rules command
#[derive(Args, Debug)]
pub struct ValidateRulesArgs {}

impl ValidateRulesArgs {
    /// Execute the validate-rules command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!("Validating rule definitions");

        let config = match load_from_env() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {e}");
                return Ok(e.exit_code());
            }
        };

        println!("🔍 Validating rule definitions in {}", config.rules.dir.display());

        let source = match RedcapClient::connect(&config.source, &config.http).await {
            Ok(client) => client,
            Err(e) => {
                eprintln!("Error: {e}");
                return Ok(e.exit_code());
            }
        };

        let forms = if config.transfer.forms.is_empty() {
            match source.instrument_list().await {
                Ok(forms) => forms,
                Err(e) => {
                    eprintln!("Error: {e}");
                    return Ok(e.exit_code());
                }
            }
        } else {
            match config
                .transfer
                .forms
                .iter()
                .map(|f| f.parse())
                .collect::<Result<Vec<_>, _>>()
            {
                Ok(forms) => forms,
                Err(e) => {
                    eprintln!("Error: invalid form name: {e}");
                    return Ok(1);
                }
            }
        };

        let catalog = match RuleCatalog::load(&config.rules.dir, config.rules.format, &forms) {
            Ok(catalog) => catalog,
            Err(e) => {
                println!("❌ Rule catalog failed to load");
                println!("   Error: {e}");
                return Ok(1);
            }
        };

        println!(
            "✅ Rule catalog loaded: {} rules across {} variables",
            catalog.rule_count(),
            catalog.variable_count()
        );

        // Every variable named in a rule file must exist in the project
        let dictionary = match source.data_dictionary(&forms).await {
            Ok(dictionary) => dictionary,
            Err(e) => {
                eprintln!("Error: {e}");
                return Ok(e.exit_code());
            }
        };
        let known: HashSet<&str> = dictionary.iter().map(|f| f.field_name.as_str()).collect();

        let mut unknown = 0;
        for (form, variable) in catalog.variables() {
            if !known.contains(variable) {
                unknown += 1;
                tracing::error!(form = form, variable = variable, "Unknown variable in rule definitions");
                println!("❌ {form}/{variable}: variable not found in the project data dictionary");
            }
        }

        if unknown > 0 {
            println!("❌ {unknown} rule variable(s) not found in the project");
            Ok(1)
        } else {
            println!("✅ All rule variables exist in the source project");
            Ok(0)
        }
    }
}
