//! Show command - prints the page tree of a snapshot.

use std::process::ExitCode;

use pagetree::StoreConfig;

use super::{CommandResult, load_snapshot};
use crate::cli::SnapshotArgs;
use crate::output::{OutputFormat, PAGE_HEADERS, page_rows, print_table};

/// Run the show command
pub fn run(args: &SnapshotArgs, config: StoreConfig, format: OutputFormat) -> CommandResult {
    let store = load_snapshot(&args.snapshot, config)?;
    let pages = store.get_pages();

    match format {
        OutputFormat::Human => {
            if pages.is_empty() {
                println!("No pages");
            } else {
                print_table(&PAGE_HEADERS, &page_rows(&pages));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&pages)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}
