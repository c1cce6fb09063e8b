pub mod accounts;
pub mod annotate;
pub mod features;
pub mod import;
pub mod init;
pub mod share;
pub mod sources;
pub mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::{get_connection, init_db};
use crate::error::{LedgerError, Result};
use crate::models::NaturalKey;
use crate::normalizer::{normalize_description, parse_amount, parse_date, DateOrder, NormalizeRules, SignConvention};
use crate::settings::load_settings;

/// Open the configured store, refusing to create one outside `init`.
pub(crate) fn open_store() -> Result<Connection> {
    let db_path = load_settings()?.db_path();
    if !db_path.exists() {
        return Err(LedgerError::Settings(format!(
            "No database at {}. Run `ledgerkeep init` to set up.",
            db_path.display()
        )));
    }
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    Ok(conn)
}

/// Build a natural key from command-line text: ISO date, free text, plain amount.
pub(crate) fn parse_key(date: &str, description: &str, amount: &str) -> Result<NaturalKey> {
    let rules = NormalizeRules::new(DateOrder::Iso, SignConvention::ExpenseNegative);
    let date = parse_date(date, &rules).map_err(|reason| LedgerError::Settings(format!("date: {reason}")))?;
    let amount = parse_amount(amount).map_err(|reason| LedgerError::Settings(format!("amount: {reason}")))?;
    Ok(NaturalKey::new(date, normalize_description(description), amount))
}

#[derive(Parser)]
#[command(name = "ledgerkeep", about = "Import bank statements into a personal SQLite ledger.")]
pub struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for ledger data (default: ~/Documents/ledgerkeep)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Configure how an account's statements are read.
    Sources {
        #[command(subcommand)]
        command: SourcesCommands,
    },
    /// Import a statement file, or every statement under a directory.
    Import {
        /// Statement file or directory
        path: PathBuf,
        /// Account id to import into
        #[arg(long)]
        account: String,
        /// Dialect key, overriding the account's configured source
        #[arg(long)]
        dialect: Option<String>,
        /// Skip rows dated before this day (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,
        /// Process everything and report, but commit nothing
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// Attach or inspect text features.
    Features {
        #[command(subcommand)]
        command: FeaturesCommands,
    },
    /// Tag transactions with short descriptions from a rules CSV.
    Annotate {
        /// CSV with long_description_regex,short_description columns
        #[arg(long)]
        rules: PathBuf,
        /// Origin recorded on every feature written
        #[arg(long, default_value = "rules")]
        origin: String,
    },
    /// Mark a transaction as a shared expense.
    Share {
        /// Transaction date: YYYY-MM-DD
        date: String,
        description: String,
        /// Signed amount, e.g. -4.50
        #[arg(allow_hyphen_values = true)]
        amount: String,
        /// Clear the flag instead
        #[arg(long)]
        unset: bool,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Register a new account.
    Add {
        /// Account id, e.g. 'chase-1234'
        id: String,
        /// Free-form type: current, credit_card, savings, ...
        #[arg(long = "type")]
        account_type: Option<String>,
    },
    /// List all accounts.
    List,
    /// Reclassify an account.
    SetType {
        id: String,
        account_type: String,
    },
}

#[derive(Subcommand)]
pub enum SourcesCommands {
    /// Set the statement layout for an account.
    Set(sources::SetArgs),
    /// List configured sources and the available dialects.
    List,
}

#[derive(Subcommand)]
pub enum FeaturesCommands {
    /// Append a feature to a transaction.
    Add {
        /// Transaction date: YYYY-MM-DD
        date: String,
        description: String,
        /// Signed amount, e.g. -4.50
        #[arg(allow_hyphen_values = true)]
        amount: String,
        /// Feature name, e.g. short_description
        name: String,
        value: String,
        #[arg(long, default_value = crate::annotator::MANUAL_ORIGIN)]
        origin: String,
    },
    /// List a transaction's features.
    List {
        date: String,
        description: String,
        /// Signed amount, e.g. -4.50
        #[arg(allow_hyphen_values = true)]
        amount: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        origin: Option<String>,
        /// Only the newest feature per name
        #[arg(long)]
        latest: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_parse_key_normalizes_like_import() {
        let key = parse_key("2023-01-05", "  Coffee   Shop ", "-4.5").unwrap();
        assert_eq!(key.description, "Coffee Shop");
        assert_eq!(key.amount, Decimal::new(-450, 2));
        assert_eq!(key.date_sql(), "2023-01-05");
        assert!(parse_key("05/01/2023", "Coffee", "1").is_err());
        assert!(parse_key("2023-01-05", "Coffee", "abc").is_err());
    }

    #[test]
    fn test_cli_parses_import() {
        let cli = Cli::try_parse_from([
            "ledgerkeep", "import", "stmts/", "--account", "chase-1234", "--dry-run", "--since", "2023-09-01",
        ])
        .unwrap();
        match cli.command {
            Commands::Import { account, dry_run, since, dialect, .. } => {
                assert_eq!(account, "chase-1234");
                assert!(dry_run);
                assert_eq!(since.as_deref(), Some("2023-09-01"));
                assert!(dialect.is_none());
            }
            _ => panic!("expected import"),
        }
    }
}
