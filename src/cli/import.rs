use std::path::Path;

use chrono::NaiveDate;
use comfy_table::{Cell, Table};

use crate::cli::open_store;
use crate::error::{LedgerError, Result};
use crate::importer::{import_path, FileStatus, ImportOptions, RunSummary};
use crate::parser::{get_by_key, SourceConfig};
use crate::settings::load_settings;

/// The account's configured source, or the dialect's defaults when
/// `--dialect` names a different one.
fn resolve_source(account: &str, dialect: Option<&str>) -> Result<SourceConfig> {
    let configured = load_settings()?.source_for(account).cloned();
    match (configured, dialect) {
        (Some(cfg), None) => Ok(cfg),
        (Some(cfg), Some(key)) if cfg.dialect.key() == key => Ok(cfg),
        (_, Some(key)) => Ok(SourceConfig::for_dialect(get_by_key(key)?)),
        (None, None) => Err(LedgerError::Settings(format!(
            "No source configured for {account}. Run `ledgerkeep sources set {account} --dialect <key>` or pass --dialect."
        ))),
    }
}

pub fn run(path: &Path, account: &str, dialect: Option<&str>, since: Option<&str>, dry_run: bool) -> Result<()> {
    let since = since
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|e| LedgerError::Settings(format!("--since {s}: {e}")))
        })
        .transpose()?;
    let config = resolve_source(account, dialect)?;
    let mut conn = open_store()?;

    let options = ImportOptions {
        since,
        dry_run,
        stop: None,
    };
    let summary = import_path(&mut conn, account, path, &config, &options)?;
    print_summary(&summary, dry_run);
    Ok(())
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    let mut table = Table::new();
    table.set_header(vec!["File", "Status", "Inserted", "Duplicate", "Skipped", "Conflict", "Filtered", "Period"]);
    for file in &summary.files {
        let status = match &file.status {
            FileStatus::Committed => "committed".to_string(),
            FileStatus::RolledBack => "rolled back".to_string(),
            FileStatus::Failed(reason) => format!("failed: {reason}"),
        };
        let period = file
            .period
            .map(|(from, to)| format!("{from} to {to}"))
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(file.path.display()),
            Cell::new(status),
            Cell::new(file.counts.inserted),
            Cell::new(file.counts.duplicate),
            Cell::new(file.counts.skipped()),
            Cell::new(file.counts.conflict),
            Cell::new(file.counts.filtered),
            Cell::new(period),
        ]);
    }
    println!("{table}");

    for file in &summary.files {
        for conflict in &file.conflicts {
            println!("Conflict: {conflict}");
        }
        for err in &file.row_errors {
            println!("Skipped: {err}");
        }
    }

    let t = &summary.totals;
    let verb = if dry_run { "would be imported" } else { "imported" };
    println!(
        "{} {verb}, {} duplicates, {} skipped (bad rows), {} conflicts",
        t.inserted,
        t.duplicate,
        t.skipped(),
        t.conflict
    );
    if t.filtered > 0 {
        println!("{} older rows filtered out", t.filtered);
    }
    let failed = summary.failed_files().count();
    if failed > 0 {
        println!("{failed} file(s) failed and were rolled back");
    }
    if summary.stopped() {
        println!("Stopped early; {} file(s) not processed", summary.not_processed.len());
    }
}
