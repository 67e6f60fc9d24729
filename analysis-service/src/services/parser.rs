//! CSV transaction parser.
//!
//! Turns raw delimited-text bytes into an ordered sequence of validated
//! transactions. The contract is fail-fast: the first invalid row
//! aborts the whole parse, there is no row-level recovery.

use csv::{ReaderBuilder, Trim};
use thiserror::Error;

use crate::models::Transaction;

/// Column names the header must contain, exact and case-sensitive.
/// Any other columns are ignored.
pub const REQUIRED_COLUMNS: [&str; 3] = ["date", "description", "amount"];

#[derive(Debug, Error)]
pub enum CsvParseError {
    #[error("CSV must contain date, description, and amount columns")]
    MissingColumns,

    #[error("row {row}: missing value for '{column}'")]
    MissingValue { row: usize, column: &'static str },

    #[error("row {row}: invalid amount '{value}'")]
    InvalidAmount { row: usize, value: String },

    #[error("row {row}: invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { row: usize, value: String },

    #[error("malformed CSV: {0}")]
    Malformed(#[from] csv::Error),
}

/// Parse CSV bytes into transactions, preserving input row order.
///
/// Fields are trimmed of surrounding whitespace and blank lines are
/// skipped. A header-only input yields an empty vector; callers that
/// need a non-empty batch enforce that precondition themselves.
pub fn parse_transactions(bytes: &[u8]) -> Result<Vec<Transaction>, CsvParseError> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(bytes);

    let headers = reader.headers()?.clone();
    let columns = REQUIRED_COLUMNS.map(|name| headers.iter().position(|h| h == name));
    let [Some(date_idx), Some(description_idx), Some(amount_idx)] = columns else {
        return Err(CsvParseError::MissingColumns);
    };

    let mut transactions = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        // 1-based data row number, header excluded.
        let row = i + 1;

        let date = field(&record, date_idx, "date", row)?;
        let description = field(&record, description_idx, "description", row)?;
        let raw_amount = field(&record, amount_idx, "amount", row)?;

        let amount: f64 = raw_amount
            .parse()
            .ok()
            .filter(|a: &f64| a.is_finite())
            .ok_or_else(|| CsvParseError::InvalidAmount {
                row,
                value: raw_amount.clone(),
            })?;

        let transaction = Transaction {
            date,
            description,
            amount,
        };

        if transaction.parse_date().is_err() {
            return Err(CsvParseError::InvalidDate {
                row,
                value: transaction.date,
            });
        }

        transactions.push(transaction);
    }

    Ok(transactions)
}

fn field(
    record: &csv::StringRecord,
    index: usize,
    column: &'static str,
    row: usize,
) -> Result<String, CsvParseError> {
    match record.get(index) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(CsvParseError::MissingValue { row, column }),
    }
}
