use crate::cli::{open_store, parse_key};
use crate::db::set_shared_expense;
use crate::error::Result;

pub fn run(date: &str, description: &str, amount: &str, unset: bool) -> Result<()> {
    let conn = open_store()?;
    let key = parse_key(date, description, amount)?;
    set_shared_expense(&conn, &key, !unset)?;
    if unset {
        println!("No longer shared: {key}");
    } else {
        println!("Shared expense: {key}");
    }
    Ok(())
}
