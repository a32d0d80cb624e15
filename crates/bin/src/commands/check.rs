//! Check command - verifies the structural invariants of a snapshot.

use std::process::ExitCode;

use pagetree::StoreConfig;

use super::{CommandResult, load_snapshot};
use crate::cli::SnapshotArgs;
use crate::output::OutputFormat;

/// Run the check command. Exits with failure when any violation is found.
pub fn run(args: &SnapshotArgs, config: StoreConfig, format: OutputFormat) -> CommandResult {
    let store = load_snapshot(&args.snapshot, config)?;
    let violations = store.collect_violations();

    match format {
        OutputFormat::Human => {
            if violations.is_empty() {
                println!("OK: {} page(s), no violations", store.page_count());
            }
            for violation in &violations {
                println!("violation: {violation}");
            }
        }
        OutputFormat::Json => {
            let value = serde_json::json!({
                "pages": store.page_count(),
                "violations": violations,
            });
            println!("{}", serde_json::to_string(&value)?);
        }
    }

    if violations.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::warn!(count = violations.len(), "Snapshot has invariant violations");
        Ok(ExitCode::FAILURE)
    }
}
