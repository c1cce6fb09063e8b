use std::path::Path;

use crate::annotator::{annotate_with_rules, load_rules};
use crate::cli::open_store;
use crate::error::Result;

pub fn run(rules: &Path, origin: &str) -> Result<()> {
    let conn = open_store()?;
    let rules = load_rules(rules)?;
    let result = annotate_with_rules(&conn, &rules, origin)?;
    println!(
        "{} annotated, {} already tagged by {origin}, {} unmatched",
        result.annotated, result.already_tagged, result.unmatched
    );
    Ok(())
}
