use clap::Args;
use comfy_table::{Cell, Table};

use crate::error::{LedgerError, Result};
use crate::normalizer::{DateOrder, SignConvention};
use crate::parser::{all_dialects, get_by_key, ColumnRef, SourceConfig};
use crate::settings::{load_settings, save_settings};

#[derive(Args)]
pub struct SetArgs {
    /// Account id the layout applies to
    pub account: String,
    /// Dialect key (see `sources list`)
    #[arg(long)]
    pub dialect: String,
    #[arg(long = "date-order", value_enum)]
    pub date_order: Option<DateOrder>,
    /// Explicit chrono date format, e.g. %d/%m/%Y (repeatable, tried in order)
    #[arg(long = "date-format")]
    pub date_formats: Vec<String>,
    #[arg(long, value_enum)]
    pub sign: Option<SignConvention>,
    #[arg(long)]
    pub delimiter: Option<char>,
    /// Preamble lines before the header row
    #[arg(long = "skip-lines")]
    pub skip_lines: Option<usize>,
    #[arg(long = "no-headers")]
    pub no_headers: bool,
    /// Column header name or zero-based index
    #[arg(long = "date-column")]
    pub date_column: Option<String>,
    #[arg(long = "description-column")]
    pub description_column: Option<String>,
    #[arg(long = "amount-column")]
    pub amount_column: Option<String>,
    #[arg(long = "debit-column", requires = "credit_column")]
    pub debit_column: Option<String>,
    #[arg(long = "credit-column", requires = "debit_column")]
    pub credit_column: Option<String>,
    /// File extensions picked up in directories (repeatable)
    #[arg(long = "extension")]
    pub extensions: Vec<String>,
    #[arg(long = "card-last-four")]
    pub card_last_four: Option<String>,
}

fn column(raw: &str) -> ColumnRef {
    raw.parse::<usize>()
        .map(ColumnRef::Index)
        .unwrap_or_else(|_| ColumnRef::Name(raw.to_string()))
}

fn build_config(args: SetArgs) -> Result<SourceConfig> {
    let mut cfg = SourceConfig::for_dialect(get_by_key(&args.dialect)?);
    if let Some(order) = args.date_order {
        cfg.rules.date_order = order;
        cfg.rules.date_formats.clear();
    }
    if !args.date_formats.is_empty() {
        cfg.rules.date_formats = args.date_formats;
    }
    if let Some(sign) = args.sign {
        cfg.rules.sign = sign;
    }

    let layout = &mut cfg.layout;
    if let Some(d) = args.delimiter {
        if !d.is_ascii() {
            return Err(LedgerError::Settings(format!("delimiter {d:?} must be ASCII")));
        }
        layout.delimiter = d;
    }
    if let Some(n) = args.skip_lines {
        layout.skip_lines = n;
    }
    layout.has_headers = !args.no_headers;
    if let Some(c) = &args.date_column {
        layout.date = column(c);
    }
    if let Some(c) = &args.description_column {
        layout.description = column(c);
    }
    if let Some(c) = &args.amount_column {
        layout.amount = Some(column(c));
    }
    if let (Some(debit), Some(credit)) = (&args.debit_column, &args.credit_column) {
        layout.debit = Some(column(debit));
        layout.credit = Some(column(credit));
        if args.amount_column.is_none() {
            layout.amount = None;
        }
    }

    cfg.extensions = args.extensions;
    cfg.card_last_four = args.card_last_four;
    Ok(cfg)
}

pub fn set(args: SetArgs) -> Result<()> {
    let account = args.account.clone();
    let cfg = build_config(args)?;
    let mut settings = load_settings()?;
    let dialect = cfg.dialect;
    settings.sources.insert(account.clone(), cfg);
    save_settings(&settings)?;
    println!("Source for {account}: {}", dialect.name());
    Ok(())
}

pub fn list() -> Result<()> {
    let settings = load_settings()?;

    let mut table = Table::new();
    table.set_header(vec!["Account", "Dialect", "Date order", "Sign", "Extensions"]);
    for (account, cfg) in &settings.sources {
        let extensions = if cfg.extensions.is_empty() {
            cfg.dialect.default_extensions().join(", ")
        } else {
            cfg.extensions.join(", ")
        };
        table.add_row(vec![
            Cell::new(account),
            Cell::new(cfg.dialect.key()),
            Cell::new(if cfg.rules.date_formats.is_empty() {
                format!("{:?}", cfg.rules.date_order)
            } else {
                cfg.rules.date_formats.join(" | ")
            }),
            Cell::new(format!("{:?}", cfg.rules.sign)),
            Cell::new(extensions),
        ]);
    }
    println!("Sources\n{table}");

    let mut dialects = Table::new();
    dialects.set_header(vec!["Key", "Format"]);
    for d in all_dialects() {
        dialects.add_row(vec![Cell::new(d.key()), Cell::new(d.name())]);
    }
    println!("Dialects\n{dialects}");
    Ok(())
}
