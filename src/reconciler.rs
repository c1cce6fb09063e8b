use rusqlite::{Connection, OptionalExtension};
use thiserror::Error;
use tracing::warn;

use crate::db::{now, require_account};
use crate::error::Result;
use crate::models::{NaturalKey, NewTransaction};

/// The same natural key is already claimed by another account.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{key} already belongs to {}, not {incoming_account}", .existing_account.as_deref().unwrap_or("no account"))]
pub struct ReconciliationConflict {
    pub key: NaturalKey,
    pub existing_account: Option<String>,
    pub incoming_account: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Inserted,
    Duplicate,
    Conflict(ReconciliationConflict),
}

/// Merges candidates for one account into the store.
///
/// Holds a connection that is expected to be inside an open SQLite
/// transaction; committing or rolling back is the caller's job.
pub struct Reconciler<'c> {
    conn: &'c Connection,
    account_id: String,
}

impl<'c> Reconciler<'c> {
    /// Fails with `UnknownAccount` if the account was never registered.
    pub fn new(conn: &'c Connection, account_id: &str) -> Result<Self> {
        require_account(conn, account_id)?;
        Ok(Self {
            conn,
            account_id: account_id.to_string(),
        })
    }

    pub fn reconcile(&self, txn: &NewTransaction) -> Result<Outcome> {
        let key = txn.key();
        let stamp = now();
        // The primary key decides; a concurrent writer loses the insert, never crashes.
        let inserted = self
            .conn
            .prepare_cached(
                "INSERT OR IGNORE INTO transactions (date, description, amount, account_id, added_on, updated_on) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            )?
            .execute(rusqlite::params![
                key.date_sql(),
                key.description,
                key.amount_sql(),
                self.account_id,
                stamp
            ])?;
        if inserted == 1 {
            return Ok(Outcome::Inserted);
        }

        let existing: Option<Option<String>> = self
            .conn
            .prepare_cached(
                "SELECT account_id FROM transactions WHERE date = ?1 AND description = ?2 AND amount = ?3",
            )?
            .query_row(
                rusqlite::params![key.date_sql(), key.description, key.amount_sql()],
                |row| row.get(0),
            )
            .optional()?;

        match existing.flatten() {
            Some(existing) if existing == self.account_id => Ok(Outcome::Duplicate),
            existing => {
                let conflict = ReconciliationConflict {
                    key,
                    existing_account: existing,
                    incoming_account: self.account_id.clone(),
                };
                warn!("Reconciliation conflict: {conflict}");
                Ok(Outcome::Conflict(conflict))
            }
        }
    }
}
