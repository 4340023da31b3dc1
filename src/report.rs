use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::aggregate::AuditTables;
use crate::model::{ChangeRecord, Classification, FileAggregate, RevisionAggregate};
use crate::policy::{self, BudgetRule};
use crate::util::{format_size, format_timestamp};

/// Print the top-N rollup tables to stdout
pub fn print_summary(tables: &AuditTables, top: usize) {
    let over = tables.over_budget_count();
    println!(
        "\nAudited {} file(s) across {} revision(s); {} over budget",
        tables.files.len(),
        tables.revisions.len(),
        over
    );

    let top_files = tables.top_files(top);
    if !top_files.is_empty() {
        println!("\nTop {} files by max observed size:", top_files.len());
        println!(
            "{:<10} {:<10} {:<8} {:<12} {}",
            "Size", "Budget", "Changes", "Last seen", "Path"
        );
        for file in top_files {
            let verdict = match file.worst {
                Classification::OverBudget => "OVER",
                Classification::WithinBudget => "ok",
            };
            let tag = if file.non_standard { " [container]" } else { "" };
            println!(
                "{:<10} {:<10} {:<8} {:<12} {}{}",
                format_size(file.max_size),
                verdict,
                file.change_count,
                format_timestamp(file.last_seen),
                file.path,
                tag
            );
        }
    }

    let top_revisions = tables.top_revisions(top);
    if !top_revisions.is_empty() {
        println!("\nTop {} revisions by total size:", top_revisions.len());
        println!("{:<10} {:<10} {:<6} {:<12} {}", "Revision", "Size", "Files", "Date", "Title");
        for rev in top_revisions {
            println!(
                "{:<10} {:<10} {:<6} {:<12} {}",
                rev.short_id,
                format_size(rev.total_size),
                rev.file_count,
                format_timestamp(rev.date),
                rev.title
            );
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    files: &'a [FileAggregate],
    revisions: &'a [RevisionAggregate],
    records: &'a [ChangeRecord],
    budget_rules: &'static [BudgetRule],
}

/// Export the full audit (rollups, raw records, and the budget-rule
/// reference table) as JSON
pub fn write_json(path: &Path, tables: &AuditTables) -> Result<()> {
    let report = JsonReport {
        files: &tables.files,
        revisions: &tables.revisions,
        records: &tables.records,
        budget_rules: policy::budget_rules(),
    };
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}
