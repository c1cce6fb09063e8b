use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use rusqlite::{Connection, Row};
use tracing::{debug, info};

use crate::db::{get_transaction, list_transactions, now};
use crate::error::{LedgerError, Result};
use crate::models::{amount_from_sql, parse_sql_date, NaturalKey, TextFeature};

pub const MANUAL_ORIGIN: &str = "manual";
pub const SHORT_DESCRIPTION: &str = "short_description";
pub const CATEGORY: &str = "category";
pub const SUB_CATEGORY: &str = "sub_category";

#[derive(Debug, Clone, Default)]
pub struct FeatureFilter {
    pub name: Option<String>,
    pub origin: Option<String>,
}

/// Append a feature row. Identical calls append identical rows.
pub fn add_feature(
    conn: &Connection,
    key: &NaturalKey,
    name: &str,
    value: &str,
    origin: &str,
) -> Result<TextFeature> {
    if get_transaction(conn, key)?.is_none() {
        return Err(LedgerError::UnknownTransaction(key.to_string()));
    }
    let added_on = now();
    conn.execute(
        "INSERT INTO text_features (name, value, origin, added_on, t_date, t_description, t_amount) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            name,
            value,
            origin,
            added_on,
            key.date_sql(),
            key.description,
            key.amount_sql()
        ],
    )?;
    Ok(TextFeature {
        name: name.to_string(),
        value: value.to_string(),
        origin: origin.to_string(),
        added_on,
        transaction: key.clone(),
    })
}

fn feature_from_row(row: &Row) -> rusqlite::Result<TextFeature> {
    let date: String = row.get(4)?;
    Ok(TextFeature {
        name: row.get(0)?,
        value: row.get(1)?,
        origin: row.get(2)?,
        added_on: row.get(3)?,
        transaction: NaturalKey::new(parse_sql_date(&date)?, row.get::<_, String>(5)?, amount_from_sql(row.get(6)?)),
    })
}

/// Features of one transaction in insertion order.
pub fn list_features(conn: &Connection, key: &NaturalKey, filter: &FeatureFilter) -> Result<Vec<TextFeature>> {
    let mut stmt = conn.prepare_cached(
        "SELECT name, value, origin, added_on, t_date, t_description, t_amount FROM text_features \
         WHERE t_date = ?1 AND t_description = ?2 AND t_amount = ?3 \
           AND (?4 IS NULL OR name = ?4) AND (?5 IS NULL OR origin = ?5) \
         ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map(
            rusqlite::params![
                key.date_sql(),
                key.description,
                key.amount_sql(),
                filter.name,
                filter.origin
            ],
            feature_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// The most recently added feature for each name.
pub fn latest_features(conn: &Connection, key: &NaturalKey) -> Result<Vec<TextFeature>> {
    let mut latest: BTreeMap<String, TextFeature> = BTreeMap::new();
    for feature in list_features(conn, key, &FeatureFilter::default())? {
        latest.insert(feature.name.clone(), feature);
    }
    Ok(latest.into_values().collect())
}

// ---------------------------------------------------------------------------
// Rule-based short descriptions
// ---------------------------------------------------------------------------

pub struct DescriptionRule {
    pub pattern: Regex,
    pub short_description: String,
    pub category: Option<String>,
    pub sub_category: Option<String>,
}

impl DescriptionRule {
    fn features(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            (SHORT_DESCRIPTION, Some(self.short_description.as_str())),
            (CATEGORY, self.category.as_deref()),
            (SUB_CATEGORY, self.sub_category.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
    }
}

/// Load `long_description_regex,short_description` rows with optional
/// `category` and `sub_category` columns. Rows missing a regex or short
/// description are skipped.
pub fn load_rules(path: &Path) -> Result<Vec<DescriptionRule>> {
    let file = std::fs::File::open(path).map_err(|e| LedgerError::file_access(path, e))?;
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let headers = rdr.headers()?.clone();
    let col = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| LedgerError::Settings(format!("{} has no '{name}' column", path.display())))
    };
    let (idx_regex, idx_short) = (col("long_description_regex")?, col(SHORT_DESCRIPTION)?);
    let (idx_category, idx_sub) = (col(CATEGORY).ok(), col(SUB_CATEGORY).ok());
    let optional = |record: &csv::StringRecord, idx: Option<usize>| {
        idx.and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let mut rules = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let pattern = record.get(idx_regex).map(str::trim).unwrap_or("");
        let short = record.get(idx_short).map(str::trim).unwrap_or("");
        if pattern.is_empty() || short.is_empty() {
            continue;
        }
        rules.push(DescriptionRule {
            pattern: Regex::new(pattern)?,
            short_description: short.to_string(),
            category: optional(&record, idx_category),
            sub_category: optional(&record, idx_sub),
        });
    }
    debug!("Loaded {} description rules from {}", rules.len(), path.display());
    Ok(rules)
}

#[derive(Debug, Default, PartialEq)]
pub struct AnnotateResult {
    pub annotated: usize,
    pub already_tagged: usize,
    pub unmatched: usize,
}

/// Tag every transaction whose description matches a rule. First rule wins;
/// transactions already tagged by `origin` are left alone.
pub fn annotate_with_rules(conn: &Connection, rules: &[DescriptionRule], origin: &str) -> Result<AnnotateResult> {
    let filter = FeatureFilter {
        name: Some(SHORT_DESCRIPTION.to_string()),
        origin: Some(origin.to_string()),
    };
    let mut result = AnnotateResult::default();
    for txn in list_transactions(conn, None)? {
        let key = txn.key();
        if !list_features(conn, &key, &filter)?.is_empty() {
            result.already_tagged += 1;
            continue;
        }
        match rules.iter().find(|r| r.pattern.is_match(&txn.description)) {
            Some(rule) => {
                for (name, value) in rule.features() {
                    add_feature(conn, &key, name, value, origin)?;
                }
                result.annotated += 1;
            }
            None => result.unmatched += 1,
        }
    }
    info!(
        annotated = result.annotated,
        already_tagged = result.already_tagged,
        unmatched = result.unmatched,
        "rule annotation finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{insert_txn, key, test_db};

    #[test]
    fn test_unknown_transaction() {
        let (_dir, conn) = test_db();
        let err = add_feature(&conn, &key("2023-01-05", "Coffee", "-4.50"), SHORT_DESCRIPTION, "coffee", MANUAL_ORIGIN)
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownTransaction(_)));
        let count: i64 = conn.query_row("SELECT count(*) FROM text_features", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_identical_features_are_both_kept_in_order() {
        let (_dir, conn) = test_db();
        insert_txn(&conn, "2023-01-05", "Coffee Shop", -4.5, None);
        let k = key("2023-01-05", "Coffee Shop", "-4.50");
        add_feature(&conn, &k, SHORT_DESCRIPTION, "coffee", MANUAL_ORIGIN).unwrap();
        add_feature(&conn, &k, SHORT_DESCRIPTION, "coffee", MANUAL_ORIGIN).unwrap();
        add_feature(&conn, &k, "category", "eating out", "tree_v1.2").unwrap();

        let all = list_features(&conn, &k, &FeatureFilter::default()).unwrap();
        assert_eq!(
            all.iter().map(|f| f.value.as_str()).collect::<Vec<_>>(),
            vec!["coffee", "coffee", "eating out"]
        );
        assert_eq!(all[0].transaction, k);

        let manual = FeatureFilter {
            origin: Some(MANUAL_ORIGIN.into()),
            ..Default::default()
        };
        assert_eq!(list_features(&conn, &k, &manual).unwrap().len(), 2);
        let by_name = FeatureFilter {
            name: Some("category".into()),
            ..Default::default()
        };
        assert_eq!(list_features(&conn, &k, &by_name).unwrap()[0].origin, "tree_v1.2");
    }

    #[test]
    fn test_features_do_not_touch_transaction() {
        let (_dir, conn) = test_db();
        insert_txn(&conn, "2023-01-05", "Coffee Shop", -4.5, None);
        let k = key("2023-01-05", "Coffee Shop", "-4.5");
        let before = get_transaction(&conn, &k).unwrap().unwrap();
        add_feature(&conn, &k, SHORT_DESCRIPTION, "coffee", MANUAL_ORIGIN).unwrap();
        assert_eq!(get_transaction(&conn, &k).unwrap().unwrap(), before);
    }

    #[test]
    fn test_latest_features_picks_newest_per_name() {
        let (_dir, conn) = test_db();
        insert_txn(&conn, "2023-01-05", "TESCO STORES 1234", -20.0, None);
        let k = key("2023-01-05", "TESCO STORES 1234", "-20");
        add_feature(&conn, &k, SHORT_DESCRIPTION, "tesco", "rules_v1").unwrap();
        add_feature(&conn, &k, "category", "groceries", "rules_v1").unwrap();
        add_feature(&conn, &k, SHORT_DESCRIPTION, "Tesco", MANUAL_ORIGIN).unwrap();
        let latest = latest_features(&conn, &k).unwrap();
        assert_eq!(latest.len(), 2);
        let short = latest.iter().find(|f| f.name == SHORT_DESCRIPTION).unwrap();
        assert_eq!(short.value, "Tesco");
        assert_eq!(short.origin, MANUAL_ORIGIN);
    }

    #[test]
    fn test_annotate_with_rules_is_idempotent_per_origin() {
        let (dir, conn) = test_db();
        insert_txn(&conn, "2023-01-05", "CARD PAYMENT TO TESCO STORES", -20.0, None);
        insert_txn(&conn, "2023-01-06", "TFL TRAVEL CH", -2.8, None);
        insert_txn(&conn, "2023-01-07", "SOMETHING ELSE", -1.0, None);
        let rules_path = dir.path().join("mappings.csv");
        std::fs::write(
            &rules_path,
            "long_description_regex,short_description,category,sub_category\n\
             TESCO,tesco,groceries,supermarket\n^TFL,tfl,transport,\n,orphan,,\n",
        )
        .unwrap();
        let rules = load_rules(&rules_path).unwrap();
        assert_eq!(rules.len(), 2);

        let first = annotate_with_rules(&conn, &rules, "rules_v1").unwrap();
        assert_eq!(first, AnnotateResult { annotated: 2, already_tagged: 0, unmatched: 1 });
        let second = annotate_with_rules(&conn, &rules, "rules_v1").unwrap();
        assert_eq!(second, AnnotateResult { annotated: 0, already_tagged: 2, unmatched: 1 });

        let k = key("2023-01-06", "TFL TRAVEL CH", "-2.80");
        let features = list_features(&conn, &k, &FeatureFilter::default()).unwrap();
        let named: Vec<_> = features.iter().map(|f| (f.name.as_str(), f.value.as_str())).collect();
        assert_eq!(named, vec![(SHORT_DESCRIPTION, "tfl"), (CATEGORY, "transport")]);
        assert!(features.iter().all(|f| f.origin == "rules_v1"));

        let tesco = key("2023-01-05", "CARD PAYMENT TO TESCO STORES", "-20");
        let sub = FeatureFilter {
            name: Some(SUB_CATEGORY.into()),
            ..Default::default()
        };
        assert_eq!(list_features(&conn, &tesco, &sub).unwrap()[0].value, "supermarket");
    }

    #[test]
    fn test_load_rules_without_category_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.csv");
        std::fs::write(&path, "long_description_regex,short_description\nNETFLIX,netflix\n").unwrap();
        let rules = load_rules(&path).unwrap();
        assert_eq!(rules[0].category, None);
        assert_eq!(rules[0].features().collect::<Vec<_>>(), vec![(SHORT_DESCRIPTION, "netflix")]);
    }

    #[test]
    fn test_load_rules_requires_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "pattern,label\nA,b\n").unwrap();
        assert!(matches!(load_rules(&path), Err(LedgerError::Settings(_))));
    }
}
