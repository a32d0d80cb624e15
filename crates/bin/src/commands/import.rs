//! Import command - builds a document from JSON page descriptors.

use std::process::ExitCode;

use pagetree::{ImportPage, StoreConfig, StructureStore};

use super::{CommandResult, load_snapshot, save_snapshot};
use crate::cli::ImportArgs;
use crate::output::{OutputFormat, PAGE_HEADERS, page_rows, print_table};

/// Run the import command
pub fn run(args: &ImportArgs, config: StoreConfig, format: OutputFormat) -> CommandResult {
    let raw = std::fs::read_to_string(&args.input)?;
    let descriptors: Vec<ImportPage> = serde_json::from_str(&raw)?;

    let store = match &args.into {
        Some(path) => load_snapshot(path, config)?,
        None => StructureStore::new(config),
    };
    let ids = store.import_pages(descriptors)?;
    if let Some(out) = &args.out {
        save_snapshot(out, &store)?;
    }

    match format {
        OutputFormat::Human => {
            println!("Imported {} page(s)", ids.len());
            print_table(&PAGE_HEADERS, &page_rows(&store.get_pages()));
        }
        OutputFormat::Json => {
            let value = serde_json::json!({
                "imported": ids,
                "pages": store.page_count(),
                "snapshot": args.out.as_ref().map(|p| p.display().to_string()),
            });
            println!("{}", serde_json::to_string(&value)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}
