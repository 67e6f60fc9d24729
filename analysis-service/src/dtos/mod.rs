//! Request and response shapes for the HTTP API.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{NormalizedMerchant, NormalizedTransaction, Pattern, Transaction};

#[derive(Debug, Deserialize, Validate)]
pub struct MerchantAnalysisRequest {
    #[validate(nested)]
    pub transaction: Transaction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MerchantAnalysisResponse {
    pub normalized: NormalizedMerchant,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PatternAnalysisRequest {
    #[validate(length(min = 1, message = "transactions must not be empty"), nested)]
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PatternAnalysisResponse {
    pub patterns: Vec<Pattern>,
}

/// Full report for one analyzed CSV upload.
///
/// `normalized_transactions` is deduplicated by merchant name (first
/// occurrence wins); the aggregate figures cover every parsed row.
#[derive(Debug, Serialize, Deserialize)]
pub struct CsvAnalysisResponse {
    pub normalized_transactions: Vec<NormalizedTransaction>,
    pub detected_patterns: Vec<Pattern>,
    pub total_amount: f64,
    pub average_amount: f64,
    pub total_transactions: usize,
    pub merchant_count: usize,
}
