//! Output formatting helpers for human-readable and JSON output.

use clap::ValueEnum;
use pagetree::Page;
use pagetree::clock::format_millis;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Render a table with aligned columns.
///
/// `headers` and each row in `rows` must have the same length. An empty
/// table renders as nothing.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let col_count = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(col_count) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = render_line(&widths, headers.iter().copied());
    for row in rows {
        out.push_str(&render_line(&widths, row.iter().take(col_count).map(String::as_str)));
    }
    out
}

fn render_line<'a>(widths: &[usize], cells: impl Iterator<Item = &'a str>) -> String {
    let mut line = cells
        .enumerate()
        .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string();
    line.push('\n');
    line
}

pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    print!("{}", format_table(headers, rows));
}

/// Column headers matching [`page_rows`].
pub const PAGE_HEADERS: [&str; 5] = ["PAGE", "ID", "BLOCKS", "COMPONENTS", "CREATED"];

/// One table row per page, names indented by depth. `pages` must be in
/// depth-first order.
pub fn page_rows(pages: &[Page]) -> Vec<Vec<String>> {
    let mut depth: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    pages
        .iter()
        .map(|page| {
            let level = page
                .parent_id
                .as_deref()
                .and_then(|parent| depth.get(parent))
                .map_or(0, |d| d + 1);
            depth.insert(page.id.as_str(), level);
            vec![
                format!("{}{}", "  ".repeat(level), page.name),
                page.id.clone(),
                page.blocks.len().to_string(),
                page.component_count().to_string(),
                format_millis(page.created_at),
            ]
        })
        .collect()
}
