use comfy_table::{Cell, Table};

use crate::annotator::{add_feature, latest_features, list_features, FeatureFilter};
use crate::cli::{open_store, parse_key};
use crate::error::Result;

pub fn add(date: &str, description: &str, amount: &str, name: &str, value: &str, origin: &str) -> Result<()> {
    let conn = open_store()?;
    let key = parse_key(date, description, amount)?;
    let feature = add_feature(&conn, &key, name, value, origin)?;
    println!("{} = {} ({}) on {}", feature.name, feature.value, feature.origin, key);
    Ok(())
}

pub fn list(
    date: &str,
    description: &str,
    amount: &str,
    filter: FeatureFilter,
    latest: bool,
) -> Result<()> {
    let conn = open_store()?;
    let key = parse_key(date, description, amount)?;
    let features = if latest {
        latest_features(&conn, &key)?
            .into_iter()
            .filter(|f| filter.name.as_ref().map_or(true, |n| &f.name == n))
            .filter(|f| filter.origin.as_ref().map_or(true, |o| &f.origin == o))
            .collect()
    } else {
        list_features(&conn, &key, &filter)?
    };

    let mut table = Table::new();
    table.set_header(vec!["Name", "Value", "Origin", "Added"]);
    for f in features {
        table.add_row(vec![
            Cell::new(f.name),
            Cell::new(f.value),
            Cell::new(f.origin),
            Cell::new(f.added_on),
        ]);
    }
    println!("{key}\n{table}");
    Ok(())
}
