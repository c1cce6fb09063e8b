use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::NormalizationError;
use crate::models::{NewTransaction, RawAmount, RawRow};

/// Which calendar field comes first in a source's dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    /// 2023-01-05
    Iso,
    /// 05/01/2023, 5 Jan 2023
    DayFirst,
    /// 01/05/2023, Jan 5 2023
    MonthFirst,
}

impl DateOrder {
    fn formats(&self) -> &'static [&'static str] {
        match self {
            Self::Iso => &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"],
            // Two-digit years first: %Y would read "23" as the year 23.
            Self::DayFirst => &["%d/%m/%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d %b %Y", "%d %B %Y"],
            Self::MonthFirst => &["%m/%d/%y", "%m/%d/%Y", "%m-%d-%Y", "%m.%d.%Y", "%b %d %Y", "%b %d, %Y"],
        }
    }
}

/// How a source's single signed amount column spells expenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SignConvention {
    #[default]
    ExpenseNegative,
    ExpensePositive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeRules {
    pub date_order: DateOrder,
    /// Explicit chrono formats, tried in order; replace the `date_order`
    /// family when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub date_formats: Vec<String>,
    #[serde(default)]
    pub sign: SignConvention,
}

impl NormalizeRules {
    pub fn new(date_order: DateOrder, sign: SignConvention) -> Self {
        Self {
            date_order,
            date_formats: Vec::new(),
            sign,
        }
    }
}

pub fn normalize(row: &RawRow, rules: &NormalizeRules) -> Result<NewTransaction, NormalizationError> {
    let error = |field: &'static str, raw: &str, reason: String| NormalizationError {
        line: row.line,
        field,
        raw: raw.to_string(),
        reason,
    };

    let date = parse_date(&row.date, rules).map_err(|reason| error("date", &row.date, reason))?;

    let description = normalize_description(&row.description);
    if description.is_empty() {
        return Err(error("description", &row.description, "empty description".into()));
    }

    let raw_amount = row.amount.raw();
    let value = parse_amount(raw_amount).map_err(|reason| error("amount", raw_amount, reason))?;
    let amount = match (&row.amount, rules.sign) {
        (RawAmount::Signed(_), SignConvention::ExpenseNegative) => value,
        (RawAmount::Signed(_), SignConvention::ExpensePositive) => -value,
        (RawAmount::Debit(_), _) => -value.abs(),
        (RawAmount::Credit(_), _) => value.abs(),
    };

    Ok(NewTransaction {
        date,
        description,
        amount,
    })
}

pub fn parse_date(raw: &str, rules: &NormalizeRules) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty date".into());
    }
    let formats: Vec<&str> = if rules.date_formats.is_empty() {
        rules.date_order.formats().to_vec()
    } else {
        rules.date_formats.iter().map(String::as_str).collect()
    };
    for fmt in &formats {
        if let Some(date) = parse_with(raw, fmt).filter(|d| d.year() >= MIN_YEAR) {
            return Ok(date);
        }
    }
    Err(format!("does not match {:?}", formats))
}

const MIN_YEAR: i32 = 1000;

fn parse_with(raw: &str, fmt: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
        return Some(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
        return Some(dt.date());
    }
    // Exports that stamp a time onto the date, e.g. "2023-01-05 10:15:00".
    [" %H:%M:%S", " %H:%M", "T%H:%M:%S"]
        .iter()
        .find_map(|suffix| NaiveDateTime::parse_from_str(raw, &format!("{fmt}{suffix}")).ok())
        .map(|dt| dt.date())
}

/// Parse a money string into a 2 dp decimal.
///
/// Handles currency symbols, thousands separators, surrounding quotes,
/// `(12.50)` and `12.50-` negatives.
pub fn parse_amount(raw: &str) -> Result<Decimal, String> {
    let s: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '"' | '$' | '£' | '€') && !c.is_whitespace())
        .collect();
    if s.is_empty() {
        return Err("empty amount".into());
    }
    let (negative, digits) = if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        (true, inner.to_string())
    } else if let Some(inner) = s.strip_suffix('-') {
        (true, inner.to_string())
    } else if let Some(inner) = s.strip_prefix('+') {
        (false, inner.to_string())
    } else {
        (false, s)
    };
    let value = Decimal::from_str(&digits).map_err(|e| e.to_string())?;
    let value = if negative { -value.abs() } else { value };
    Ok(value.round_dp(2))
}

/// Trim and collapse whitespace runs; content and case are kept verbatim.
pub fn normalize_description(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, description: &str, amount: RawAmount) -> RawRow {
        RawRow {
            line: 7,
            date: date.into(),
            description: description.into(),
            amount,
        }
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56"), Ok(dec("1234.56")));
        assert_eq!(parse_amount("\"500.00\""), Ok(dec("500")));
        assert_eq!(parse_amount("  -42.50  "), Ok(dec("-42.5")));
        assert_eq!(parse_amount("0"), Ok(Decimal::ZERO));
        assert!(parse_amount("not_a_number").is_err());
        assert!(parse_amount("   ").is_err());
    }

    #[test]
    fn test_parse_amount_negative_conventions() {
        assert_eq!(parse_amount("(500.00)"), Ok(dec("-500")));
        assert_eq!(parse_amount("(1,234.56)"), Ok(dec("-1234.56")));
        assert_eq!(parse_amount("12.30-"), Ok(dec("-12.3")));
        assert_eq!(parse_amount("-$50.00"), Ok(dec("-50")));
        assert_eq!(parse_amount("£1,000.00"), Ok(dec("1000")));
    }

    #[test]
    fn test_parse_amount_rounds_to_cents() {
        assert_eq!(parse_amount("4.505"), Ok(dec("4.50")));
        assert_eq!(parse_amount("4.515"), Ok(dec("4.52")));
    }

    #[test]
    fn test_parse_date_by_order() {
        let day_first = NormalizeRules::new(DateOrder::DayFirst, SignConvention::ExpenseNegative);
        let month_first = NormalizeRules::new(DateOrder::MonthFirst, SignConvention::ExpenseNegative);
        assert_eq!(parse_date("05/01/2023", &day_first), Ok(ymd(2023, 1, 5)));
        assert_eq!(parse_date("05/01/2023", &month_first), Ok(ymd(2023, 5, 1)));
        assert_eq!(parse_date("24 Nov 2023", &day_first), Ok(ymd(2023, 11, 24)));
        assert!(parse_date("13/25/2023", &month_first).is_err());
    }

    #[test]
    fn test_parse_date_never_crosses_families() {
        let iso = NormalizeRules::new(DateOrder::Iso, SignConvention::ExpenseNegative);
        let day_first = NormalizeRules::new(DateOrder::DayFirst, SignConvention::ExpenseNegative);
        assert_eq!(parse_date("2023-01-05", &iso), Ok(ymd(2023, 1, 5)));
        assert_eq!(parse_date("2023-01-05 10:15:00", &iso), Ok(ymd(2023, 1, 5)));
        assert!(parse_date("05/01/2023", &iso).is_err());
        assert!(parse_date("2023-01-05", &day_first).is_err());
    }

    #[test]
    fn test_parse_date_explicit_format() {
        let mut rules = NormalizeRules::new(DateOrder::Iso, SignConvention::ExpenseNegative);
        rules.date_formats = vec!["%Y%m%d".into()];
        assert_eq!(parse_date("20230105", &rules), Ok(ymd(2023, 1, 5)));
        assert!(parse_date("2023-01-05", &rules).is_err());
    }

    #[test]
    fn test_explicit_formats_tried_in_order() {
        let mut rules = NormalizeRules::new(DateOrder::Iso, SignConvention::ExpenseNegative);
        rules.date_formats = vec!["%d %b %Y".into(), "%Y-%m-%d %H:%M:%S".into()];
        assert_eq!(parse_date("24 Nov 2023", &rules), Ok(ymd(2023, 11, 24)));
        assert_eq!(parse_date("2023-11-25 09:00:00", &rules), Ok(ymd(2023, 11, 25)));
        assert!(parse_date("25/11/2023", &rules).is_err());
    }

    #[test]
    fn test_two_digit_years() {
        let day_first = NormalizeRules::new(DateOrder::DayFirst, SignConvention::ExpenseNegative);
        let month_first = NormalizeRules::new(DateOrder::MonthFirst, SignConvention::ExpenseNegative);
        assert_eq!(parse_date("05/01/23", &day_first), Ok(ymd(2023, 1, 5)));
        assert_eq!(parse_date("01/05/23", &month_first), Ok(ymd(2023, 1, 5)));
        assert_eq!(parse_date("05/01/2023", &day_first), Ok(ymd(2023, 1, 5)));
        // %Y alone would accept these as the year 23.
        let iso = NormalizeRules::new(DateOrder::Iso, SignConvention::ExpenseNegative);
        assert!(parse_date("23-01-05", &iso).is_err());
        assert!(parse_date("05-01-23", &day_first).is_err());
    }

    #[test]
    fn test_expense_positive_source_is_flipped() {
        let rules = NormalizeRules::new(DateOrder::Iso, SignConvention::ExpensePositive);
        let txn = normalize(&row("2023-01-05", "Coffee Shop", RawAmount::Signed("50".into())), &rules).unwrap();
        assert_eq!(txn.amount, dec("-50.00"));
        let txn = normalize(&row("2023-01-06", "Salary", RawAmount::Signed("-2000.00".into())), &rules).unwrap();
        assert_eq!(txn.amount, dec("2000"));
    }

    #[test]
    fn test_debit_and_credit_columns_ignore_printed_sign() {
        let rules = NormalizeRules::new(DateOrder::Iso, SignConvention::ExpensePositive);
        let debit = normalize(&row("2023-01-05", "Rent", RawAmount::Debit("-900".into())), &rules).unwrap();
        let credit = normalize(&row("2023-01-05", "Refund", RawAmount::Credit("15.00".into())), &rules).unwrap();
        assert_eq!(debit.amount, dec("-900"));
        assert_eq!(credit.amount, dec("15"));
    }

    #[test]
    fn test_description_whitespace_collapsed_case_kept() {
        assert_eq!(normalize_description("  CARD  PAYMENT\tTo  Tesco "), "CARD PAYMENT To Tesco");
        assert_eq!(normalize_description("Café  Nero"), "Café Nero");
    }

    #[test]
    fn test_normalization_error_carries_context() {
        let rules = NormalizeRules::new(DateOrder::Iso, SignConvention::ExpenseNegative);
        let err = normalize(&row("2023-01-05", "Coffee", RawAmount::Signed("abc".into())), &rules).unwrap_err();
        assert_eq!(err.line, 7);
        assert_eq!(err.field, "amount");
        assert_eq!(err.raw, "abc");

        let err = normalize(&row("yesterday", "Coffee", RawAmount::Signed("1".into())), &rules).unwrap_err();
        assert_eq!(err.field, "date");

        let err = normalize(&row("2023-01-05", "   ", RawAmount::Signed("1".into())), &rules).unwrap_err();
        assert_eq!(err.field, "description");
    }
}
