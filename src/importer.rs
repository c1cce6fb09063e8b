use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::db::require_account;
use crate::error::{LedgerError, Result};
use crate::normalizer::{normalize, parse_date};
use crate::parser::{SourceConfig, StatementReader};
use crate::reconciler::{Outcome, Reconciler, ReconciliationConflict};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub inserted: usize,
    pub duplicate: usize,
    pub failed_parse: usize,
    pub failed_normalize: usize,
    pub conflict: usize,
    /// Rows dated before `ImportOptions::since`.
    pub filtered: usize,
}

impl Counts {
    fn add(&mut self, other: &Counts) {
        self.inserted += other.inserted;
        self.duplicate += other.duplicate;
        self.failed_parse += other.failed_parse;
        self.failed_normalize += other.failed_normalize;
        self.conflict += other.conflict;
        self.filtered += other.filtered;
    }

    pub fn skipped(&self) -> usize {
        self.failed_parse + self.failed_normalize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    Committed,
    /// Dry run: everything was processed, nothing kept.
    RolledBack,
    /// File-level failure; none of the file's rows were kept.
    Failed(String),
}

#[derive(Debug)]
pub struct FileSummary {
    pub path: PathBuf,
    pub status: FileStatus,
    pub counts: Counts,
    pub conflicts: Vec<ReconciliationConflict>,
    pub row_errors: Vec<LedgerError>,
    /// Period declared in the file header, else first and last date among
    /// the file's valid rows.
    pub period: Option<(NaiveDate, NaiveDate)>,
}

impl FileSummary {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            status: FileStatus::Committed,
            counts: Counts::default(),
            conflicts: Vec::new(),
            row_errors: Vec::new(),
            period: None,
        }
    }

    /// Nothing was kept, so only the skipped-row diagnostics stay.
    fn fail(&mut self, reason: String) {
        self.counts.inserted = 0;
        self.counts.duplicate = 0;
        self.counts.conflict = 0;
        self.conflicts.clear();
        self.status = FileStatus::Failed(reason);
    }

    fn widen_period(&mut self, date: NaiveDate) {
        self.period = Some(match self.period {
            Some((from, to)) => (from.min(date), to.max(date)),
            None => (date, date),
        });
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub files: Vec<FileSummary>,
    pub totals: Counts,
    /// Files that were discovered but not processed because of a stop request.
    pub not_processed: Vec<PathBuf>,
}

impl RunSummary {
    pub fn failed_files(&self) -> impl Iterator<Item = &FileSummary> {
        self.files.iter().filter(|f| matches!(f.status, FileStatus::Failed(_)))
    }

    pub fn stopped(&self) -> bool {
        !self.not_processed.is_empty()
    }
}

#[derive(Default)]
pub struct ImportOptions<'a> {
    /// Drop rows dated before this day.
    pub since: Option<NaiveDate>,
    /// Process everything, then roll every file back.
    pub dry_run: bool,
    /// Checked between files.
    pub stop: Option<&'a AtomicBool>,
}

/// Statement files under `path`, or `path` itself when it is a file.
pub fn discover_files(path: &Path, config: &SourceConfig) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(LedgerError::file_access(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
        ));
    }
    let mut files = Vec::new();
    let walker = WalkDir::new(path)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
    for entry in walker {
        let entry = entry.map_err(|e| {
            let at = e.path().unwrap_or(path).to_path_buf();
            LedgerError::file_access(at, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if config.accepts(entry.path()) {
            files.push(entry.into_path());
        } else {
            debug!("Skipping {}, does not look like a statement", entry.path().display());
        }
    }
    files.sort();
    Ok(files)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

/// Import every statement under `path` into `account_id`.
pub fn import_path(
    conn: &mut Connection,
    account_id: &str,
    path: &Path,
    config: &SourceConfig,
    options: &ImportOptions,
) -> Result<RunSummary> {
    require_account(conn, account_id)?;
    let files = discover_files(path, config)?;
    info!("Importing {} file(s) into {account_id}", files.len());

    let mut summary = RunSummary::default();
    for (i, file) in files.iter().enumerate() {
        if options.stop.map(|s| s.load(Ordering::SeqCst)).unwrap_or(false) {
            warn!("Stop requested; {} file(s) left unprocessed", files.len() - i);
            summary.not_processed = files[i..].to_vec();
            break;
        }
        let file_summary = import_file(conn, account_id, file, config, options);
        summary.totals.add(&file_summary.counts);
        summary.files.push(file_summary);
    }
    Ok(summary)
}

/// Import one file inside its own SQLite transaction.
///
/// Never fails: file-level problems are reported through `FileStatus::Failed`
/// with zero committed rows.
pub fn import_file(
    conn: &mut Connection,
    account_id: &str,
    path: &Path,
    config: &SourceConfig,
    options: &ImportOptions,
) -> FileSummary {
    let mut summary = FileSummary::new(path);
    let result = (|| -> Result<()> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        process_rows(&tx, account_id, path, config, options, &mut summary)?;
        if options.dry_run {
            tx.rollback()?;
            summary.status = FileStatus::RolledBack;
        } else {
            tx.commit()?;
        }
        Ok(())
    })();

    match result {
        Ok(()) => info!(
            file = %path.display(),
            inserted = summary.counts.inserted,
            duplicate = summary.counts.duplicate,
            conflict = summary.counts.conflict,
            skipped = summary.counts.skipped(),
            "imported"
        ),
        Err(e) => {
            warn!("Import of {} failed, nothing committed: {e}", path.display());
            summary.fail(e.to_string());
        }
    }
    summary
}

fn process_rows(
    conn: &Connection,
    account_id: &str,
    path: &Path,
    config: &SourceConfig,
    options: &ImportOptions,
    summary: &mut FileSummary,
) -> Result<()> {
    let reconciler = Reconciler::new(conn, account_id)?;
    let reader = StatementReader::new(path, config.clone());

    for item in reader.rows()? {
        let raw = match item {
            Ok(raw) => raw,
            Err(LedgerError::Parse(e)) => {
                debug!("Skipping row: {e}");
                summary.counts.failed_parse += 1;
                summary.row_errors.push(LedgerError::Parse(e));
                continue;
            }
            Err(e) => return Err(e),
        };
        let txn = match normalize(&raw, &config.rules) {
            Ok(txn) => txn,
            Err(e) => {
                debug!("Skipping row in {}: {e}", reader.path().display());
                summary.counts.failed_normalize += 1;
                summary.row_errors.push(LedgerError::Normalization(e));
                continue;
            }
        };
        if options.since.is_some_and(|since| txn.date < since) {
            summary.counts.filtered += 1;
            continue;
        }
        summary.widen_period(txn.date);
        match reconciler.reconcile(&txn)? {
            Outcome::Inserted => summary.counts.inserted += 1,
            Outcome::Duplicate => summary.counts.duplicate += 1,
            Outcome::Conflict(conflict) => {
                summary.counts.conflict += 1;
                summary.conflicts.push(conflict);
            }
        }
    }
    statement_period(&reader, config, summary);
    Ok(())
}

/// A period declared in the file header replaces the one spanned by row dates.
fn statement_period(reader: &StatementReader, config: &SourceConfig, summary: &mut FileSummary) {
    let declared = match reader.statement_period() {
        Ok(Some(declared)) => declared,
        Ok(None) => return,
        Err(e) => {
            warn!("Ignoring statement period: {e}");
            return;
        }
    };
    match (parse_date(&declared.0, &config.rules), parse_date(&declared.1, &config.rules)) {
        (Ok(from), Ok(to)) => summary.period = Some((from, to)),
        _ => warn!(
            "Unreadable statement period '{} to {}' in {}",
            declared.0,
            declared.1,
            reader.path().display()
        ),
    }
}
