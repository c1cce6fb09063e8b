mod annotator;
mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
mod normalizer;
mod parser;
mod reconciler;
mod settings;

use clap::Parser;
use tracing_subscriber::{fmt as log_fmt, prelude::*, EnvFilter};

use annotator::FeatureFilter;
use cli::{AccountsCommands, Cli, Commands, FeaturesCommands, SourcesCommands};

fn main() {
    let cli = Cli::parse();

    // RUST_LOG > --verbose > info
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(log_fmt::layer().with_target(false).with_writer(std::io::stderr).compact())
        .init();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Accounts { command } => match command {
            AccountsCommands::Add { id, account_type } => cli::accounts::add(&id, account_type.as_deref()),
            AccountsCommands::List => cli::accounts::list(),
            AccountsCommands::SetType { id, account_type } => cli::accounts::set_type(&id, &account_type),
        },
        Commands::Sources { command } => match command {
            SourcesCommands::Set(args) => cli::sources::set(args),
            SourcesCommands::List => cli::sources::list(),
        },
        Commands::Import {
            path,
            account,
            dialect,
            since,
            dry_run,
        } => cli::import::run(&path, &account, dialect.as_deref(), since.as_deref(), dry_run),
        Commands::Features { command } => match command {
            FeaturesCommands::Add {
                date,
                description,
                amount,
                name,
                value,
                origin,
            } => cli::features::add(&date, &description, &amount, &name, &value, &origin),
            FeaturesCommands::List {
                date,
                description,
                amount,
                name,
                origin,
                latest,
            } => cli::features::list(&date, &description, &amount, FeatureFilter { name, origin }, latest),
        },
        Commands::Annotate { rules, origin } => cli::annotate::run(&rules, &origin),
        Commands::Share {
            date,
            description,
            amount,
            unset,
        } => cli::share::run(&date, &description, &amount, unset),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
