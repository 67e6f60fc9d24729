//! Single-transaction and batch analysis orchestration.

use std::sync::Arc;

use service_core::error::AppError;
use thiserror::Error;

use super::analyzer::{AnalyzerError, TransactionAnalyzer};
use super::metrics::record_analyzer_request;
use crate::models::{NormalizedMerchant, Pattern, Transaction};

/// Analysis failure with a fixed user-facing message.
///
/// The underlying analyzer error is preserved as the source so callers
/// can surface it as diagnostic metadata, but it never becomes part of
/// the primary message shown to the caller.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to analyze merchant information")]
    Merchant(#[source] AnalyzerError),

    #[error("Failed to analyze transaction patterns")]
    Patterns(#[source] AnalyzerError),
}

impl AnalysisError {
    pub fn into_cause(self) -> AnalyzerError {
        match self {
            AnalysisError::Merchant(cause) | AnalysisError::Patterns(cause) => cause,
        }
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        let message = err.to_string();
        AppError::UpstreamError {
            message,
            cause: anyhow::Error::new(err.into_cause()),
        }
    }
}

/// Orchestrates calls to the external analyzer for single transactions
/// and ad-hoc batches. Reused by the CSV upload pipeline.
#[derive(Clone)]
pub struct AnalysisService {
    analyzer: Arc<dyn TransactionAnalyzer>,
}

impl AnalysisService {
    pub fn new(analyzer: Arc<dyn TransactionAnalyzer>) -> Self {
        Self { analyzer }
    }

    pub fn analyzer(&self) -> &Arc<dyn TransactionAnalyzer> {
        &self.analyzer
    }

    /// Normalize the merchant identity of one transaction.
    pub async fn analyze_merchant(
        &self,
        transaction: &Transaction,
    ) -> Result<NormalizedMerchant, AnalysisError> {
        match self.analyzer.normalize_merchant(transaction).await {
            Ok(normalized) => {
                record_analyzer_request("merchant", "ok");
                Ok(normalized)
            }
            Err(e) => {
                tracing::error!(error = %e, "Merchant normalization failed");
                record_analyzer_request("merchant", "error");
                Err(AnalysisError::Merchant(e))
            }
        }
    }

    /// Detect spending patterns across a batch of transactions.
    pub async fn analyze_patterns(
        &self,
        transactions: &[Transaction],
    ) -> Result<Vec<Pattern>, AnalysisError> {
        match self.analyzer.detect_patterns(transactions).await {
            Ok(patterns) => {
                record_analyzer_request("patterns", "ok");
                tracing::debug!(
                    transaction_count = transactions.len(),
                    pattern_count = patterns.len(),
                    "Pattern detection completed"
                );
                Ok(patterns)
            }
            Err(e) => {
                tracing::error!(error = %e, "Pattern detection failed");
                record_analyzer_request("patterns", "error");
                Err(AnalysisError::Patterns(e))
            }
        }
    }
}
