//! Domain types for transaction analysis.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One financial transaction: a calendar date, the raw merchant
/// description from the statement, and the charged amount.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Transaction {
    #[validate(length(min = 1, message = "date is required"))]
    pub date: String,

    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,

    pub amount: f64,
}

impl Transaction {
    /// Parse the transaction date as an ISO calendar date (YYYY-MM-DD).
    pub fn parse_date(&self) -> Result<NaiveDate, chrono::ParseError> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
    }
}

/// Canonical merchant identity produced by the analyzer for a single
/// transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedMerchant {
    pub merchant: String,
    pub category: String,
    pub sub_category: String,
    /// Confidence score in [0, 1].
    pub confidence: f64,
    pub is_subscription: bool,
    pub flags: Vec<String>,
}

/// A pattern amount is either an exact figure (14.99) or a descriptive
/// string for variable spend ("~31.50", "20-50"). Consumers must not
/// assume the numeric form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternAmount {
    Fixed(f64),
    Approximate(String),
}

/// A recurring or variable spending behavior detected across a batch
/// of transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(rename = "type")]
    pub pattern_type: String,
    pub merchant: String,
    pub amount: PatternAmount,
    pub frequency: String,
    /// Confidence score in [0, 1].
    pub confidence: f64,
    pub next_expected: Option<String>,
    pub notes: Option<String>,
}

/// Pairs the original statement description with its normalized merchant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    pub original: String,
    pub normalized: NormalizedMerchant,
}
