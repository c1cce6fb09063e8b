use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::{LedgerError, Result};
use crate::models::{amount_from_sql, parse_sql_date, Account, NaturalKey, Transaction};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id TEXT PRIMARY KEY,
    account_type TEXT,
    added_on DATETIME DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS transactions (
    date DATE NOT NULL,
    description TEXT NOT NULL,
    amount REAL NOT NULL,
    account_id TEXT REFERENCES accounts(id),
    is_shared_expense INTEGER DEFAULT 0,
    added_on DATETIME DEFAULT (datetime('now')),
    updated_on DATETIME DEFAULT (datetime('now')),
    PRIMARY KEY (date, description, amount)
);

CREATE TABLE IF NOT EXISTS text_features (
    name TEXT,
    value TEXT,
    origin TEXT,
    added_on DATETIME DEFAULT (datetime('now')),
    t_date DATE NOT NULL,
    t_description TEXT NOT NULL,
    t_amount REAL NOT NULL,
    FOREIGN KEY (t_date, t_description, t_amount) REFERENCES transactions(date, description, amount)
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Timestamp in the same shape SQLite's `datetime('now')` produces.
pub fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

pub fn add_account(conn: &Connection, id: &str, account_type: Option<&str>) -> Result<Account> {
    conn.execute(
        "INSERT INTO accounts (id, account_type) VALUES (?1, ?2)",
        rusqlite::params![id, account_type],
    )?;
    get_account(conn, id)?.ok_or_else(|| LedgerError::UnknownAccount(id.to_string()))
}

pub fn get_account(conn: &Connection, id: &str) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            "SELECT id, account_type, added_on FROM accounts WHERE id = ?1",
            [id],
            |row| {
                Ok(Account {
                    id: row.get(0)?,
                    account_type: row.get(1)?,
                    added_on: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(account)
}

pub fn require_account(conn: &Connection, id: &str) -> Result<Account> {
    get_account(conn, id)?.ok_or_else(|| LedgerError::UnknownAccount(id.to_string()))
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare("SELECT id, account_type, added_on FROM accounts ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Account {
                id: row.get(0)?,
                account_type: row.get(1)?,
                added_on: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Reclassify an account. The identifier itself never changes.
pub fn set_account_type(conn: &Connection, id: &str, account_type: &str) -> Result<()> {
    let changed = conn.execute(
        "UPDATE accounts SET account_type = ?1 WHERE id = ?2",
        rusqlite::params![account_type, id],
    )?;
    if changed == 0 {
        return Err(LedgerError::UnknownAccount(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

const TRANSACTION_COLUMNS: &str =
    "date, description, amount, account_id, is_shared_expense, added_on, updated_on";

fn transaction_from_row(row: &Row) -> rusqlite::Result<Transaction> {
    let date: String = row.get(0)?;
    Ok(Transaction {
        date: parse_sql_date(&date)?,
        description: row.get(1)?,
        amount: amount_from_sql(row.get(2)?),
        account_id: row.get(3)?,
        is_shared_expense: row.get::<_, i64>(4)? != 0,
        added_on: row.get(5)?,
        updated_on: row.get(6)?,
    })
}

pub fn get_transaction(conn: &Connection, key: &NaturalKey) -> Result<Option<Transaction>> {
    let sql = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions \
         WHERE date = ?1 AND description = ?2 AND amount = ?3"
    );
    let txn = conn
        .query_row(
            &sql,
            rusqlite::params![key.date_sql(), key.description, key.amount_sql()],
            transaction_from_row,
        )
        .optional()?;
    Ok(txn)
}

/// All transactions, optionally for one account, oldest first.
pub fn list_transactions(conn: &Connection, account_id: Option<&str>) -> Result<Vec<Transaction>> {
    let sql = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions \
         WHERE ?1 IS NULL OR account_id = ?1 \
         ORDER BY date, description, amount"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([account_id], transaction_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn set_shared_expense(conn: &Connection, key: &NaturalKey, shared: bool) -> Result<()> {
    let changed = conn.execute(
        "UPDATE transactions SET is_shared_expense = ?1, updated_on = ?2 \
         WHERE date = ?3 AND description = ?4 AND amount = ?5",
        rusqlite::params![
            shared as i32,
            now(),
            key.date_sql(),
            key.description,
            key.amount_sql()
        ],
    )?;
    if changed == 0 {
        return Err(LedgerError::UnknownTransaction(key.to_string()));
    }
    Ok(())
}

pub struct StoreCounts {
    pub accounts: i64,
    pub transactions: i64,
    pub shared: i64,
    pub features: i64,
}

pub fn counts(conn: &Connection) -> Result<StoreCounts> {
    let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };
    Ok(StoreCounts {
        accounts: count("SELECT count(*) FROM accounts")?,
        transactions: count("SELECT count(*) FROM transactions")?,
        shared: count("SELECT count(*) FROM transactions WHERE is_shared_expense = 1")?,
        features: count("SELECT count(*) FROM text_features")?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    pub(crate) fn insert_txn(conn: &Connection, date: &str, description: &str, amount: f64, account: Option<&str>) {
        conn.execute(
            "INSERT INTO transactions (date, description, amount, account_id) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![date, description, amount, account],
        )
        .unwrap();
    }

    pub(crate) fn key(date: &str, description: &str, amount: &str) -> NaturalKey {
        NaturalKey::new(
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description,
            amount.parse::<Decimal>().unwrap(),
        )
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["accounts", "transactions", "text_features"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        add_account(&conn, "revolut", Some("current")).unwrap();
        init_db(&conn).unwrap();
        assert_eq!(list_accounts(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_account_ids_are_unique() {
        let (_dir, conn) = test_db();
        add_account(&conn, "revolut", None).unwrap();
        assert!(matches!(add_account(&conn, "revolut", Some("card")), Err(LedgerError::Db(_))));
    }

    #[test]
    fn test_set_account_type() {
        let (_dir, conn) = test_db();
        add_account(&conn, "santander_basic", Some("current")).unwrap();
        set_account_type(&conn, "santander_basic", "savings").unwrap();
        let account = require_account(&conn, "santander_basic").unwrap();
        assert_eq!(account.account_type.as_deref(), Some("savings"));
        assert!(matches!(
            set_account_type(&conn, "nope", "savings"),
            Err(LedgerError::UnknownAccount(_))
        ));
    }

    #[test]
    fn test_primary_key_rejects_same_triple() {
        let (_dir, conn) = test_db();
        insert_txn(&conn, "2023-01-05", "Coffee Shop", -4.5, None);
        let dup = conn.execute(
            "INSERT INTO transactions (date, description, amount) VALUES ('2023-01-05', 'Coffee Shop', -4.5)",
            [],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn test_foreign_key_on_account() {
        let (_dir, conn) = test_db();
        let res = conn.execute(
            "INSERT INTO transactions (date, description, amount, account_id) VALUES ('2023-01-05', 'X', 1.0, 'ghost')",
            [],
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_get_transaction_by_key() {
        let (_dir, conn) = test_db();
        add_account(&conn, "chase-1234", None).unwrap();
        insert_txn(&conn, "2023-01-05", "Coffee Shop", -4.5, Some("chase-1234"));
        let txn = get_transaction(&conn, &key("2023-01-05", "Coffee Shop", "-4.50"))
            .unwrap()
            .unwrap();
        assert_eq!(txn.amount, Decimal::new(-450, 2));
        assert_eq!(txn.account_id.as_deref(), Some("chase-1234"));
        assert!(!txn.is_shared_expense);
        assert!(get_transaction(&conn, &key("2023-01-05", "coffee shop", "-4.50")).unwrap().is_none());
    }

    #[test]
    fn test_set_shared_expense() {
        let (_dir, conn) = test_db();
        insert_txn(&conn, "2023-02-01", "Groceries", -60.0, None);
        let k = key("2023-02-01", "Groceries", "-60");
        set_shared_expense(&conn, &k, true).unwrap();
        assert!(get_transaction(&conn, &k).unwrap().unwrap().is_shared_expense);
        assert_eq!(counts(&conn).unwrap().shared, 1);
        let missing = key("2023-02-02", "Groceries", "-60");
        assert!(matches!(
            set_shared_expense(&conn, &missing, true),
            Err(LedgerError::UnknownTransaction(_))
        ));
    }

    #[test]
    fn test_list_transactions_filters_by_account() {
        let (_dir, conn) = test_db();
        add_account(&conn, "a", None).unwrap();
        add_account(&conn, "b", None).unwrap();
        insert_txn(&conn, "2023-01-02", "Two", -2.0, Some("a"));
        insert_txn(&conn, "2023-01-01", "One", -1.0, Some("b"));
        insert_txn(&conn, "2023-01-03", "Three", -3.0, Some("a"));
        assert_eq!(list_transactions(&conn, None).unwrap().len(), 3);
        let only_a = list_transactions(&conn, Some("a")).unwrap();
        assert_eq!(
            only_a.iter().map(|t| t.description.as_str()).collect::<Vec<_>>(),
            vec!["Two", "Three"]
        );
    }
}
