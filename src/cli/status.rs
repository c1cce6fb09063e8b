use crate::db::{counts, get_connection};
use crate::error::Result;
use crate::fmt::{amount, format_bytes};
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings()?;
    let db_path = settings.db_path();

    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());
    println!("Sources:    {} configured", settings.sources.len());

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let conn = get_connection(&db_path)?;
        let c = counts(&conn)?;
        let balance: f64 = conn.query_row("SELECT COALESCE(SUM(amount), 0) FROM transactions", [], |r| r.get(0))?;

        println!();
        println!("Accounts:      {}", c.accounts);
        println!("Transactions:  {}", c.transactions);
        println!("Shared:        {}", c.shared);
        println!("Features:      {}", c.features);
        println!("Net amount:    {}", amount(crate::models::amount_from_sql(balance)));
    } else {
        println!();
        println!("Database not found. Run `ledgerkeep init` to set up.");
    }

    Ok(())
}
