//! CSV upload orchestration.
//!
//! Sequences parsing, concurrent per-record merchant normalization,
//! merchant deduplication, batch pattern detection, and aggregate
//! computation into one analysis report.

use std::collections::HashSet;

use futures::future::try_join_all;
use service_core::error::AppError;

use super::analysis::{AnalysisError, AnalysisService};
use super::metrics::{record_csv_rows, record_csv_upload};
use super::parser;
use crate::dtos::CsvAnalysisResponse;
use crate::models::NormalizedTransaction;

#[derive(Clone)]
pub struct UploadService {
    analysis: AnalysisService,
}

impl UploadService {
    pub fn new(analysis: AnalysisService) -> Self {
        Self { analysis }
    }

    /// Analyze an uploaded CSV file end to end.
    ///
    /// Normalization calls are all started before any result is
    /// awaited; the join preserves original record order regardless of
    /// completion order and aborts the batch on the first failure.
    pub async fn analyze_csv(&self, bytes: &[u8]) -> Result<CsvAnalysisResponse, AppError> {
        let transactions = parser::parse_transactions(bytes).map_err(|e| {
            record_csv_upload("rejected");
            AppError::BadRequest(anyhow::Error::new(e))
        })?;

        // A header-only file would divide by zero in the averages below.
        if transactions.is_empty() {
            record_csv_upload("rejected");
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "CSV file contains no transaction rows"
            )));
        }

        tracing::info!(
            transaction_count = transactions.len(),
            "Analyzing uploaded CSV"
        );

        let normalized = try_join_all(
            transactions
                .iter()
                .map(|tx| self.analysis.analyze_merchant(tx)),
        )
        .await
        .map_err(|e| {
            record_csv_upload("failed");
            process_failure(e)
        })?;

        let normalized_transactions = dedup_by_merchant(
            transactions
                .iter()
                .zip(normalized)
                .map(|(tx, normalized)| NormalizedTransaction {
                    original: tx.description.clone(),
                    normalized,
                })
                .collect(),
        );

        // Patterns run over the full, un-deduplicated batch.
        let detected_patterns = self
            .analysis
            .analyze_patterns(&transactions)
            .await
            .map_err(|e| {
                record_csv_upload("failed");
                process_failure(e)
            })?;

        let total_transactions = transactions.len();
        let total_amount = round2(transactions.iter().map(|tx| tx.amount).sum());
        let average_amount = round2(total_amount / total_transactions as f64);
        let merchant_count = normalized_transactions.len();

        record_csv_upload("ok");
        record_csv_rows(total_transactions);

        Ok(CsvAnalysisResponse {
            normalized_transactions,
            detected_patterns,
            total_amount,
            average_amount,
            total_transactions,
            merchant_count,
        })
    }
}

/// Translate an analysis failure at the upload boundary: the caller
/// sees a fixed "Failed to process CSV file" message while the cause
/// chain rides along as diagnostics.
fn process_failure(err: AnalysisError) -> AppError {
    AppError::BadRequest(anyhow::Error::new(err).context("Failed to process CSV file"))
}

/// Keep only the first occurrence of each merchant name, compared
/// case-insensitively via explicit case folding. Input order is
/// preserved, as is the casing of the first occurrence.
fn dedup_by_merchant(transactions: Vec<NormalizedTransaction>) -> Vec<NormalizedTransaction> {
    let mut seen = HashSet::new();
    transactions
        .into_iter()
        .filter(|tx| seen.insert(tx.normalized.merchant.to_lowercase()))
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Transaction;
    use crate::services::analyzer::mock::MockAnalyzer;
    use std::sync::Arc;
    use std::time::Duration;

    fn tx(date: &str, description: &str, amount: f64) -> Transaction {
        Transaction {
            date: date.to_string(),
            description: description.to_string(),
            amount,
        }
    }

    fn normalized(merchant: &str) -> NormalizedTransaction {
        NormalizedTransaction {
            original: merchant.to_uppercase(),
            normalized: MockAnalyzer::normalized(merchant),
        }
    }

    fn service(mock: MockAnalyzer) -> (UploadService, Arc<MockAnalyzer>) {
        let analyzer = Arc::new(mock);
        let upload = UploadService::new(AnalysisService::new(analyzer.clone()));
        (upload, analyzer)
    }

    #[test]
    fn round2_truncates_to_cents() {
        assert_eq!(round2(44.98 / 2.0), 22.49);
        assert_eq!(round2(0.1 + 0.2), 0.3);
    }

    #[test]
    fn dedup_keeps_first_seen_casing() {
        let deduped = dedup_by_merchant(vec![
            normalized("Amazon"),
            normalized("AMAZON"),
            normalized("Netflix"),
        ]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].normalized.merchant, "Amazon");
        assert_eq!(deduped[1].normalized.merchant, "Netflix");
    }

    #[tokio::test]
    async fn computes_aggregates_over_all_rows() {
        let (upload, _) = service(MockAnalyzer::new());
        let csv = b"date,description,amount\n\
            2024-01-25,AMAZON.COM,29.99\n\
            2024-01-24,NETFLIX.COM,14.99\n";

        let report = upload.analyze_csv(csv).await.unwrap();
        assert_eq!(report.total_amount, 44.98);
        assert_eq!(report.average_amount, 22.49);
        assert_eq!(report.total_transactions, 2);
        assert_eq!(report.merchant_count, 2);
    }

    #[tokio::test]
    async fn preserves_input_order_under_scrambled_completion() {
        let mock = MockAnalyzer::new()
            .with_latency("FIRST", Duration::from_millis(80))
            .with_latency("SECOND", Duration::from_millis(40))
            .with_latency("THIRD", Duration::from_millis(5));
        let (upload, _) = service(mock);

        let csv = b"date,description,amount\n\
            2024-01-01,FIRST,1.00\n\
            2024-01-02,SECOND,2.00\n\
            2024-01-03,THIRD,3.00\n";

        let report = upload.analyze_csv(csv).await.unwrap();
        let originals: Vec<_> = report
            .normalized_transactions
            .iter()
            .map(|nt| nt.original.as_str())
            .collect();
        assert_eq!(originals, vec!["FIRST", "SECOND", "THIRD"]);
    }

    #[tokio::test]
    async fn rejects_header_only_csv_before_calling_analyzer() {
        let (upload, analyzer) = service(MockAnalyzer::new());
        let err = upload
            .analyze_csv(b"date,description,amount\n")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("no transaction rows"));
        assert_eq!(analyzer.normalize_calls(), 0);
        assert_eq!(analyzer.pattern_calls(), 0);
    }

    #[tokio::test]
    async fn analyzer_failure_translates_to_process_failure() {
        let (upload, _) = service(MockAnalyzer::new().failing_merchant("socket closed"));
        let csv = b"date,description,amount\n2024-01-25,AMAZON.COM,29.99\n";

        let err = upload.analyze_csv(csv).await.unwrap_err();
        let service_core::error::AppError::BadRequest(inner) = err else {
            panic!("expected BadRequest, got {err:?}");
        };
        assert_eq!(inner.to_string(), "Failed to process CSV file");
        let chain: Vec<String> = inner.chain().map(|c| c.to_string()).collect();
        assert!(chain
            .iter()
            .any(|c| c == "Failed to analyze merchant information"));
        assert!(chain.iter().any(|c| c.contains("socket closed")));
    }
}
