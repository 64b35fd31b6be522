//! Init command implementation
//!
//! Generates a starter `.env` file with every recognized variable.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the environment file
    #[arg(short, long, default_value = ".env")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing environment file");

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ File already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(1);
        }

        match fs::write(&self.output, Self::template()) {
            Ok(_) => {
                println!("✅ Environment file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Fill in the API URLs and tokens in {}", self.output);
                println!("  2. Put one rule file per form under RULES_DIR");
                println!("  3. Check the rules: ferry validate-rules");
                println!("  4. Trial run without writes: ferry transfer --dry-run");
                println!("  5. Run the transfer: ferry transfer");
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write {}", self.output);
                println!("   Error: {e}");
                Ok(1)
            }
        }
    }

    fn template() -> &'static str {
        r#"# Ferry configuration
# Validated record transfer between REDCap projects

# Required: source project (records are fetched and optionally deleted here)
SRC_API_URL=https://redcap.example.org/api/
SRC_API_TOKEN=

# Required: destination project (accepted records are written here)
DEST_API_URL=https://redcap.example.org/api/
DEST_API_TOKEN=

# Records per batch; -1 fetches everything in one batch
BATCH_SIZE=100

# Move mode: delete confirmed-written records from the source (true/false)
MOVE_RECORDS=true

# Rule definitions: one file per form, named <form>.<yaml|json>
RULES_DIR=./rules/
RULE_DEFS_TYPE=yaml

# Strict mode: a variable without any rule is itself a violation
STRICT_MODE=true

# Log file output
LOG_FILE_DIR=./logs/
LOG_FILE_PREFIX=validation-errors-

# Optional comma-separated allow-lists
#FORMS=demographics,vitals
#EVENTS=baseline_arm_1,followup_arm_1

# Optional JSON file carrying the allow-lists instead
#CONF_FILE_PATH=./ferry.json

# HTTP client behavior
#HTTP_TIMEOUT_SECONDS=30
#HTTP_MAX_RETRIES=3
"#
    }
}
