use std::fmt;

use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: String,
    pub account_type: Option<String>,
    pub added_on: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub account_id: Option<String>,
    pub is_shared_expense: bool,
    pub added_on: String,
    pub updated_on: String,
}

impl Transaction {
    pub fn key(&self) -> NaturalKey {
        NaturalKey::new(self.date, self.description.clone(), self.amount)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextFeature {
    pub name: String,
    pub value: String,
    pub origin: String,
    pub added_on: String,
    pub transaction: NaturalKey,
}

/// The (date, description, amount) triple that identifies a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NaturalKey {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
}

impl NaturalKey {
    pub fn new(date: NaiveDate, description: impl Into<String>, amount: Decimal) -> Self {
        Self {
            date,
            description: description.into(),
            amount: amount.round_dp(2),
        }
    }

    /// Date as stored in the DATE columns.
    pub fn date_sql(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Amount as stored in the REAL columns.
    pub fn amount_sql(&self) -> f64 {
        amount_to_sql(self.amount)
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {} | {}", self.date, self.description, self.amount)
    }
}

/// Canonical record produced by the normalizer, ready for reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
}

impl NewTransaction {
    pub fn key(&self) -> NaturalKey {
        NaturalKey::new(self.date, self.description.clone(), self.amount)
    }
}

/// Amount as a source file spelled it, before sign normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawAmount {
    /// One signed column; meaning of the sign depends on the source.
    Signed(String),
    /// Money leaving the account, whatever sign the file printed.
    Debit(String),
    /// Money entering the account.
    Credit(String),
}

impl RawAmount {
    pub fn raw(&self) -> &str {
        match self {
            Self::Signed(s) | Self::Debit(s) | Self::Credit(s) => s,
        }
    }
}

/// Intermediate representation from a statement parser before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub line: u64,
    pub date: String,
    pub description: String,
    pub amount: RawAmount,
}

pub fn amount_to_sql(amount: Decimal) -> f64 {
    amount.round_dp(2).to_f64().unwrap_or_default()
}

pub fn amount_from_sql(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(2)
}

pub fn parse_sql_date(raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}
