use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use csv::StringRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LedgerError, ParseError, Result};
use crate::models::{RawAmount, RawRow};
use crate::normalizer::{DateOrder, NormalizeRules, SignConvention};

// ---------------------------------------------------------------------------
// Dialects: enum dispatch, one strategy per statement format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectKind {
    Delimited,
    SantanderText,
    SantanderCard,
    Revolut,
}

const ALL_DIALECTS: &[DialectKind] = &[
    DialectKind::Delimited,
    DialectKind::SantanderText,
    DialectKind::SantanderCard,
    DialectKind::Revolut,
];

impl DialectKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Delimited => "delimited",
            Self::SantanderText => "santander_text",
            Self::SantanderCard => "santander_card",
            Self::Revolut => "revolut",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Delimited => "Delimited export (configurable columns)",
            Self::SantanderText => "Santander bank statement (TXT)",
            Self::SantanderCard => "Santander credit card report (tab separated)",
            Self::Revolut => "Revolut CSV export",
        }
    }

    /// File extensions picked up when importing a directory.
    pub fn default_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Delimited | Self::Revolut => &["csv"],
            Self::SantanderText | Self::SantanderCard => &["txt"],
        }
    }

    pub fn default_rules(&self) -> NormalizeRules {
        match self {
            Self::Delimited => NormalizeRules::new(DateOrder::Iso, SignConvention::ExpenseNegative),
            Self::SantanderText => NormalizeRules::new(DateOrder::DayFirst, SignConvention::ExpenseNegative),
            Self::SantanderCard => NormalizeRules::new(DateOrder::Iso, SignConvention::ExpenseNegative),
            Self::Revolut => NormalizeRules {
                // Older exports print "24 Nov 2023", newer ones a full timestamp.
                date_formats: vec!["%d %b %Y".into(), "%Y-%m-%d %H:%M:%S".into()],
                ..NormalizeRules::new(DateOrder::Iso, SignConvention::ExpenseNegative)
            },
        }
    }
}

pub fn all_dialects() -> &'static [DialectKind] {
    ALL_DIALECTS
}

pub fn get_by_key(key: &str) -> Result<DialectKind> {
    ALL_DIALECTS
        .iter()
        .find(|d| d.key() == key)
        .copied()
        .ok_or_else(|| LedgerError::UnknownDialect(key.to_string()))
}

// ---------------------------------------------------------------------------
// Source configuration
// ---------------------------------------------------------------------------

/// Column reference by header name or zero-based index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl ColumnRef {
    fn named(name: &str) -> Self {
        Self::Name(name.to_string())
    }

    fn resolve(&self, headers: Option<&StringRecord>) -> Option<usize> {
        match (self, headers) {
            (Self::Index(i), _) => Some(*i),
            (Self::Name(name), Some(headers)) => headers.iter().position(|h| h.trim() == name),
            (Self::Name(_), None) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelimitedLayout {
    pub delimiter: char,
    pub has_headers: bool,
    /// Preamble lines before the header (account name, balances, ...).
    pub skip_lines: usize,
    pub date: ColumnRef,
    pub description: ColumnRef,
    /// Single signed amount column. Ignored when a debit/credit pair is set.
    pub amount: Option<ColumnRef>,
    pub debit: Option<ColumnRef>,
    pub credit: Option<ColumnRef>,
}

impl Default for DelimitedLayout {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_headers: true,
            skip_lines: 0,
            date: ColumnRef::named("Date"),
            description: ColumnRef::named("Description"),
            amount: Some(ColumnRef::named("Amount")),
            debit: None,
            credit: None,
        }
    }
}

/// Everything needed to read one account's statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub dialect: DialectKind,
    #[serde(flatten)]
    pub rules: NormalizeRules,
    #[serde(default)]
    pub layout: DelimitedLayout,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
    /// Santander card reports: a banner or rows for another card are rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_last_four: Option<String>,
    /// Rows whose description contains one of these are not transactions.
    #[serde(default = "default_skip_descriptions")]
    pub skip_descriptions: Vec<String>,
}

fn default_skip_descriptions() -> Vec<String> {
    vec!["Beginning balance".into(), "INITIAL BALANCE".into()]
}

impl SourceConfig {
    pub fn for_dialect(dialect: DialectKind) -> Self {
        Self {
            dialect,
            rules: dialect.default_rules(),
            layout: DelimitedLayout::default(),
            extensions: Vec::new(),
            card_last_four: None,
            skip_descriptions: default_skip_descriptions(),
        }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        if self.extensions.is_empty() {
            self.dialect
                .default_extensions()
                .iter()
                .any(|e| e.eq_ignore_ascii_case(ext))
        } else {
            self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
        }
    }
}

// ---------------------------------------------------------------------------
// StatementReader
// ---------------------------------------------------------------------------

/// Each item is a raw row, a row-level `LedgerError::Parse`, or a
/// file-level error after which the sequence ends.
pub type Rows = Box<dyn Iterator<Item = Result<RawRow>>>;

pub struct StatementReader {
    path: PathBuf,
    config: SourceConfig,
}

impl StatementReader {
    pub fn new(path: impl Into<PathBuf>, config: SourceConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the file and start a fresh pass over its rows.
    pub fn rows(&self) -> Result<Rows> {
        debug!(path = %self.path.display(), dialect = self.config.dialect.key(), "reading statement");
        let rows = match self.config.dialect {
            DialectKind::Delimited => delimited_rows(&self.path, &self.config.layout)?,
            DialectKind::SantanderText => santander_text_rows(&self.path)?,
            DialectKind::SantanderCard => santander_card_rows(&self.path, self.config.card_last_four.clone())?,
            DialectKind::Revolut => revolut_rows(&self.path)?,
        };
        let skip = self.config.skip_descriptions.clone();
        if skip.is_empty() {
            return Ok(rows);
        }
        Ok(Box::new(rows.filter(move |item| match item {
            Ok(row) => !skip.iter().any(|s| row.description.contains(s.as_str())),
            Err(_) => true,
        })))
    }

    /// Raw `(from, to)` dates of the period a statement declares in its
    /// header. Only Santander TXT statements carry one.
    pub fn statement_period(&self) -> Result<Option<(String, String)>> {
        match self.config.dialect {
            DialectKind::SantanderText => santander_text_period(&self.path),
            _ => Ok(None),
        }
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| LedgerError::file_access(path, e))
}

fn row_error(path: &Path, line: u64, reason: impl Into<String>) -> LedgerError {
    LedgerError::Parse(ParseError {
        path: path.to_path_buf(),
        line,
        reason: reason.into(),
    })
}

fn csv_error(path: &Path, offset: u64, err: csv::Error) -> LedgerError {
    let line = err.position().map(|p| p.line()).unwrap_or(0) + offset;
    let reason = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(io) => LedgerError::file_access(path, io),
        _ => row_error(path, line, reason),
    }
}

fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).map(str::trim).unwrap_or("")
}

/// Stops the sequence after the first file-level error.
fn fuse_on_file_error(rows: impl Iterator<Item = Result<RawRow>> + 'static) -> Rows {
    let mut failed = false;
    Box::new(rows.filter_map(move |item| {
        if failed {
            return None;
        }
        if let Err(ref e) = item {
            if !matches!(e, LedgerError::Parse(_)) {
                failed = true;
            }
        }
        Some(item)
    }))
}

// ---------------------------------------------------------------------------
// Delimited parser
// ---------------------------------------------------------------------------

fn delimited_rows(path: &Path, layout: &DelimitedLayout) -> Result<Rows> {
    if !layout.delimiter.is_ascii() {
        return Err(LedgerError::Settings(format!(
            "delimiter {:?} must be a single ASCII character",
            layout.delimiter
        )));
    }
    let mut reader = BufReader::new(open(path)?);
    let mut skipped = String::new();
    for _ in 0..layout.skip_lines {
        skipped.clear();
        reader
            .read_line(&mut skipped)
            .map_err(|e| LedgerError::file_access(path, e))?;
    }
    let offset = layout.skip_lines as u64;

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(layout.delimiter as u8)
        .has_headers(layout.has_headers)
        .flexible(true)
        .from_reader(reader);

    let headers = if layout.has_headers {
        Some(rdr.headers().map_err(|e| csv_error(path, offset, e))?.clone())
    } else {
        None
    };
    let header_line = offset + 1;
    let resolve = |col: &ColumnRef, what: &str| {
        col.resolve(headers.as_ref())
            .ok_or_else(|| row_error(path, header_line, format!("no {what} column {col:?}")))
    };
    let idx_date = resolve(&layout.date, "date")?;
    let idx_desc = resolve(&layout.description, "description")?;
    let amount_cols = match (&layout.debit, &layout.credit, &layout.amount) {
        (Some(debit), Some(credit), _) => AmountColumns::Split {
            debit: resolve(debit, "debit")?,
            credit: resolve(credit, "credit")?,
        },
        (_, _, Some(amount)) => AmountColumns::Signed(resolve(amount, "amount")?),
        _ => {
            return Err(LedgerError::Settings(
                "delimited layout needs an amount column or a debit/credit pair".into(),
            ))
        }
    };

    let path = path.to_path_buf();
    let rows = rdr.into_records().filter_map(move |result| {
        let record = match result {
            Ok(record) => record,
            Err(e) => return Some(Err(csv_error(&path, offset, e))),
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0) + offset;
        if record.iter().all(|f| f.trim().is_empty()) {
            return None;
        }
        let description = field(&record, idx_desc);
        let max_idx = idx_date.max(idx_desc).max(amount_cols.max_index());
        if record.len() <= max_idx {
            return Some(Err(row_error(
                &path,
                line,
                format!("expected at least {} columns, found {}", max_idx + 1, record.len()),
            )));
        }
        let amount = match amount_cols.read(&record) {
            Some(amount) => amount,
            None => return Some(Err(row_error(&path, line, "missing amount"))),
        };
        Some(Ok(RawRow {
            line,
            date: field(&record, idx_date).to_string(),
            description: description.to_string(),
            amount,
        }))
    });
    Ok(fuse_on_file_error(rows))
}

enum AmountColumns {
    Signed(usize),
    Split { debit: usize, credit: usize },
}

impl AmountColumns {
    fn max_index(&self) -> usize {
        match self {
            Self::Signed(i) => *i,
            Self::Split { debit, credit } => (*debit).max(*credit),
        }
    }

    fn read(&self, record: &StringRecord) -> Option<RawAmount> {
        match self {
            Self::Signed(i) => {
                let v = field(record, *i);
                (!v.is_empty()).then(|| RawAmount::Signed(v.to_string()))
            }
            Self::Split { debit, credit } => {
                let (d, c) = (field(record, *debit), field(record, *credit));
                if !d.is_empty() {
                    Some(RawAmount::Debit(d.to_string()))
                } else if !c.is_empty() {
                    Some(RawAmount::Credit(c.to_string()))
                } else {
                    None
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Santander bank statement (Key:Value TXT)
// ---------------------------------------------------------------------------

/// Lines decoded as ISO-8859-15; the bank does not export UTF-8.
struct LatinLines {
    reader: BufReader<File>,
    buf: Vec<u8>,
}

impl Iterator for LatinLines {
    type Item = std::io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => Some(Ok(self.buf.iter().map(|&b| latin9_char(b)).collect())),
            Err(e) => Some(Err(e)),
        }
    }
}

fn latin9_char(b: u8) -> char {
    match b {
        0xA4 => '€',
        0xA6 => 'Š',
        0xA8 => 'š',
        0xB4 => 'Ž',
        0xB8 => 'ž',
        0xBC => 'Œ',
        0xBD => 'œ',
        0xBE => 'Ÿ',
        _ => b as char,
    }
}

#[derive(Default)]
struct PendingEntry {
    line: u64,
    date: Option<String>,
    description: Option<String>,
}

struct SantanderTextRows {
    path: PathBuf,
    lines: LatinLines,
    line: u64,
    pending: PendingEntry,
    done: bool,
}

impl SantanderTextRows {
    fn take_incomplete(&mut self) -> Option<LedgerError> {
        let pending = std::mem::take(&mut self.pending);
        pending
            .date
            .map(|_| row_error(&self.path, pending.line, "transaction without an Amount line"))
    }
}

impl Iterator for SantanderTextRows {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let text = match self.lines.next() {
                None => {
                    self.done = true;
                    return self.take_incomplete().map(Err);
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(LedgerError::file_access(&self.path, e)));
                }
                Some(Ok(text)) => text,
            };
            self.line += 1;
            let Some((token, value)) = text.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match token.trim() {
                "From" | "Account" | "Balance" => continue,
                "Date" => {
                    let incomplete = self.take_incomplete();
                    self.pending = PendingEntry {
                        line: self.line,
                        date: Some(value.to_string()),
                        description: None,
                    };
                    if let Some(err) = incomplete {
                        return Some(Err(err));
                    }
                }
                "Description" => {
                    if self.pending.date.is_none() {
                        return Some(Err(row_error(&self.path, self.line, "Description before Date")));
                    }
                    self.pending.description = Some(value.to_string());
                }
                "Amount" => {
                    let pending = std::mem::take(&mut self.pending);
                    return Some(match (pending.date, pending.description) {
                        (Some(date), Some(description)) => Ok(RawRow {
                            line: pending.line,
                            date,
                            description,
                            amount: RawAmount::Signed(value.to_string()),
                        }),
                        _ => Err(row_error(&self.path, self.line, "Amount without Date and Description")),
                    });
                }
                other => {
                    return Some(Err(row_error(
                        &self.path,
                        self.line,
                        format!("unrecognised token '{other}'"),
                    )))
                }
            }
        }
    }
}

fn santander_text_period(path: &Path) -> Result<Option<(String, String)>> {
    let lines = LatinLines {
        reader: BufReader::new(open(path)?),
        buf: Vec::new(),
    };
    for (i, text) in lines.enumerate() {
        let text = text.map_err(|e| LedgerError::file_access(path, e))?;
        let Some((token, value)) = text.split_once(':') else {
            continue;
        };
        match token.trim() {
            "From" => {
                let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
                let (from, to) = value
                    .split_once(" to ")
                    .ok_or_else(|| row_error(path, i as u64 + 1, format!("bad statement period '{value}'")))?;
                return Ok(Some((from.trim().to_string(), to.trim().to_string())));
            }
            // The header is over once transactions start.
            "Date" => break,
            _ => continue,
        }
    }
    Ok(None)
}

fn santander_text_rows(path: &Path) -> Result<Rows> {
    let lines = LatinLines {
        reader: BufReader::new(open(path)?),
        buf: Vec::new(),
    };
    Ok(Box::new(SantanderTextRows {
        path: path.to_path_buf(),
        lines,
        line: 0,
        pending: PendingEntry::default(),
        done: false,
    }))
}

// ---------------------------------------------------------------------------
// Santander credit card report (tab separated)
// ---------------------------------------------------------------------------

const CARD_NO: &str = "Card no.";
const CARD_DATE: &str = "Date";
const CARD_DESCRIPTION: &str = "Description";
const CARD_MONEY_IN: &str = "Money in";
const CARD_MONEY_OUT: &str = "Money out";
const CARD_PURCHASE_MARKER: &str = "PURCHASE - DOMESTIC";

fn santander_card_rows(path: &Path, card_last_four: Option<String>) -> Result<Rows> {
    let tabs = Regex::new("\t+")?;
    let spaces = Regex::new("[ ]+")?;
    let mut lines = BufReader::new(open(path)?).lines().enumerate().map(|(i, l)| (i as u64 + 1, l));

    // First line is a banner with the card number, then the column names.
    let mut header: Option<Vec<String>> = None;
    let mut header_line = 0;
    for (line, text) in lines.by_ref() {
        let text = text.map_err(|e| LedgerError::file_access(path, e))?;
        if line == 1 {
            if let Some(expected) = &card_last_four {
                let banner = text.trim_end();
                if !banner.ends_with(expected.as_str()) {
                    return Err(row_error(path, 1, format!("statement is for another card: '{banner}'")));
                }
            }
            continue;
        }
        if is_separator(&text) {
            continue;
        }
        let cleaned = spaces.replace_all(&tabs.replace_all(text.trim_end(), "\t"), " ").into_owned();
        header = Some(cleaned.split('\t').map(|h| h.trim().to_string()).collect());
        header_line = line;
        break;
    }
    let header = header.ok_or_else(|| row_error(path, 1, "no column header"))?;
    let column = |name: &str| {
        header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| row_error(path, header_line, format!("missing column '{name}'")))
    };
    let (idx_card, idx_date, idx_desc, idx_in, idx_out) = (
        column(CARD_NO)?,
        column(CARD_DATE)?,
        column(CARD_DESCRIPTION)?,
        column(CARD_MONEY_IN)?,
        column(CARD_MONEY_OUT)?,
    );

    let path = path.to_path_buf();
    let rows = lines.filter_map(move |(line, text)| {
        let text = match text {
            Ok(text) => text,
            Err(e) => return Some(Err(LedgerError::file_access(&path, e))),
        };
        if is_separator(&text) {
            return None;
        }
        let cleaned = spaces.replace_all(&text.trim_end_matches('\r').replace("\t\t", "\t"), " ").into_owned();
        let fields: Vec<&str> = cleaned.split('\t').map(str::trim).collect();
        let get = |i: usize| fields.get(i).copied().unwrap_or("");

        if let Some(expected) = &card_last_four {
            let card = get(idx_card);
            if !card.is_empty() && !card.ends_with(expected.as_str()) {
                return Some(Err(row_error(&path, line, format!("unexpected card number '{card}'"))));
            }
        }
        let amount = if !get(idx_in).is_empty() {
            RawAmount::Credit(get(idx_in).to_string())
        } else if !get(idx_out).is_empty() {
            RawAmount::Debit(get(idx_out).to_string())
        } else {
            return Some(Err(row_error(&path, line, "neither Money in nor Money out set")));
        };
        Some(Ok(RawRow {
            line,
            date: get(idx_date).to_string(),
            description: get(idx_desc).replace(CARD_PURCHASE_MARKER, ""),
            amount,
        }))
    });
    Ok(fuse_on_file_error(rows))
}

fn is_separator(line: &str) -> bool {
    line.trim().chars().all(|c| c == '-')
}

// ---------------------------------------------------------------------------
// Revolut CSV export
// ---------------------------------------------------------------------------

const REVOLUT_DELIMITERS: &[u8] = b";,";
const REVOLUT_COMPLETED: &str = "Completed Date";
const REVOLUT_STARTED: &str = "Started Date";
const REVOLUT_DESCRIPTION: &str = "Description";
const REVOLUT_REFERENCE: &str = "Reference";
const REVOLUT_PAID_OUT: &str = "Paid Out (GBP)";
const REVOLUT_PAID_IN: &str = "Paid In (GBP)";
const REVOLUT_AMOUNT: &str = "Amount";

struct RevolutColumns {
    completed: Option<usize>,
    started: Option<usize>,
    description: Option<usize>,
    reference: Option<usize>,
    paid_out: Option<usize>,
    paid_in: Option<usize>,
    amount: Option<usize>,
}

impl RevolutColumns {
    fn from_header(header: &[&str]) -> Option<Self> {
        let pos = |name: &str| header.iter().position(|h| h.trim().trim_matches('"') == name);
        let cols = Self {
            completed: pos(REVOLUT_COMPLETED),
            started: pos(REVOLUT_STARTED),
            description: pos(REVOLUT_DESCRIPTION),
            reference: pos(REVOLUT_REFERENCE),
            paid_out: pos(REVOLUT_PAID_OUT),
            paid_in: pos(REVOLUT_PAID_IN),
            amount: pos(REVOLUT_AMOUNT),
        };
        let has_date = cols.completed.is_some() || cols.started.is_some();
        let has_desc = cols.description.is_some() || cols.reference.is_some();
        let has_amount = cols.amount.is_some() || cols.paid_out.is_some() || cols.paid_in.is_some();
        (has_date && has_desc && has_amount).then_some(cols)
    }
}

fn pick(record: &StringRecord, idx: Option<usize>) -> &str {
    idx.map(|i| field(record, i)).unwrap_or("")
}

fn first_non_empty<'r>(record: &'r StringRecord, cols: &[Option<usize>]) -> &'r str {
    cols.iter()
        .map(|c| pick(record, *c))
        .find(|v| !v.is_empty())
        .unwrap_or("")
}

fn revolut_rows(path: &Path) -> Result<Rows> {
    let mut first = String::new();
    BufReader::new(open(path)?)
        .read_line(&mut first)
        .map_err(|e| LedgerError::file_access(path, e))?;
    let first = first.trim_start_matches('\u{feff}').trim_end();

    let (delimiter, cols) = REVOLUT_DELIMITERS
        .iter()
        .find_map(|&d| {
            let header: Vec<&str> = first.split(d as char).collect();
            RevolutColumns::from_header(&header).map(|cols| (d, cols))
        })
        .ok_or_else(|| row_error(path, 1, "header matches no known Revolut layout"))?;
    debug!(delimiter = %(delimiter as char), "revolut delimiter");

    let rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(open(path)?));

    let path = path.to_path_buf();
    let rows = rdr.into_records().filter_map(move |result| {
        let record = match result {
            Ok(record) => record,
            Err(e) => return Some(Err(csv_error(&path, 0, e))),
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.iter().all(|f| f.trim().is_empty()) {
            return None;
        }
        let amount = if !pick(&record, cols.paid_out).is_empty() {
            RawAmount::Debit(pick(&record, cols.paid_out).to_string())
        } else if !pick(&record, cols.amount).is_empty() {
            RawAmount::Signed(pick(&record, cols.amount).to_string())
        } else if !pick(&record, cols.paid_in).is_empty() {
            RawAmount::Credit(pick(&record, cols.paid_in).to_string())
        } else {
            return Some(Err(row_error(&path, line, "no amount in any amount column")));
        };
        Some(Ok(RawRow {
            line,
            date: first_non_empty(&record, &[cols.completed, cols.started]).to_string(),
            description: first_non_empty(&record, &[cols.description, cols.reference]).to_string(),
            amount,
        }))
    });
    Ok(fuse_on_file_error(rows))
}
