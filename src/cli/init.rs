use std::path::PathBuf;

use crate::db::{counts, get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings()?;

    if let Some(dir) = data_dir {
        // Canonicalizing needs the directory to exist.
        std::fs::create_dir_all(&dir)?;
        settings.data_dir = shellexpand_path(&dir);
    }
    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;

    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;
    let existing = counts(&conn)?;

    println!("Initialized ledgerkeep at {}", resolved.display());
    if existing.transactions > 0 {
        println!("Existing ledger kept: {} transactions", existing.transactions);
    }
    Ok(())
}
