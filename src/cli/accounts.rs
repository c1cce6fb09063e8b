use comfy_table::{Cell, Table};

use crate::cli::open_store;
use crate::db::{add_account, list_accounts, set_account_type};
use crate::error::Result;

pub fn add(id: &str, account_type: Option<&str>) -> Result<()> {
    let conn = open_store()?;
    let account = add_account(&conn, id, account_type)?;
    println!("Added account: {}", account.id);
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_store()?;
    let accounts = list_accounts(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Type", "Added"]);
    for account in accounts {
        table.add_row(vec![
            Cell::new(account.id),
            Cell::new(account.account_type.unwrap_or_default()),
            Cell::new(account.added_on),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}

pub fn set_type(id: &str, account_type: &str) -> Result<()> {
    let conn = open_store()?;
    set_account_type(&conn, id, account_type)?;
    println!("{id} is now {account_type}");
    Ok(())
}
