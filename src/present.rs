//! Result presentation: de-duplication and the Markdown table used by the
//! CLI and the MCP tools.

use std::collections::HashSet;

use crate::models::IconRecord;

/// Stable de-duplication on `(source, name)`; first occurrence wins.
pub fn dedupe(records: Vec<IconRecord>) -> Vec<IconRecord> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert((r.source.clone(), r.name.clone())))
        .collect()
}

/// Render records as a three-column Markdown table (source, name, markup).
///
/// Markup is the canonical single-line form; pipes are escaped so a cell can
/// never split a row. Empty input renders one placeholder row.
///
/// ```rust
/// use icon_gateway::present::to_table;
///
/// assert_eq!(
///     to_table(&[]),
///     "| source | name | svg |\n|---|---|---|\n| - | - | no icons found |"
/// );
/// ```
pub fn to_table(records: &[IconRecord]) -> String {
    let mut lines = vec![
        "| source | name | svg |".to_string(),
        "|---|---|---|".to_string(),
    ];

    if records.is_empty() {
        lines.push("| - | - | no icons found |".to_string());
    }

    for record in records {
        lines.push(format!(
            "| {} | {} | {} |",
            cell(&record.source),
            cell(&record.name),
            cell(&record.raw_svg)
        ));
    }

    lines.join("\n")
}

fn cell(text: &str) -> String {
    text.replace(['\r', '\n'], "").replace('|', "\\|")
}
