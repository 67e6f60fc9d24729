//! Mock analyzer implementation for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{AnalyzerError, TransactionAnalyzer};
use crate::models::{NormalizedMerchant, Pattern, Transaction};

/// Deterministic analyzer stand-in.
///
/// Configured per test with canned merchant normalizations (keyed by
/// transaction description), per-description latencies to scramble
/// completion order, canned patterns, and optional failures. Call
/// counts are recorded so tests can assert the analyzer boundary was
/// (or was not) invoked.
#[derive(Default)]
pub struct MockAnalyzer {
    merchants: HashMap<String, NormalizedMerchant>,
    latencies: HashMap<String, Duration>,
    patterns: Vec<Pattern>,
    fail_merchant: Option<String>,
    fail_patterns: Option<String>,
    normalize_calls: AtomicUsize,
    pattern_calls: AtomicUsize,
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a transaction description to a canned normalization.
    pub fn with_merchant(mut self, description: &str, normalized: NormalizedMerchant) -> Self {
        self.merchants.insert(description.to_string(), normalized);
        self
    }

    /// Delay normalization of the given description to simulate
    /// variable per-call latency.
    pub fn with_latency(mut self, description: &str, latency: Duration) -> Self {
        self.latencies.insert(description.to_string(), latency);
        self
    }

    pub fn with_patterns(mut self, patterns: Vec<Pattern>) -> Self {
        self.patterns = patterns;
        self
    }

    /// Make every normalization call fail with the given message.
    pub fn failing_merchant(mut self, message: &str) -> Self {
        self.fail_merchant = Some(message.to_string());
        self
    }

    /// Make every pattern detection call fail with the given message.
    pub fn failing_patterns(mut self, message: &str) -> Self {
        self.fail_patterns = Some(message.to_string());
        self
    }

    pub fn normalize_calls(&self) -> usize {
        self.normalize_calls.load(Ordering::SeqCst)
    }

    pub fn pattern_calls(&self) -> usize {
        self.pattern_calls.load(Ordering::SeqCst)
    }

    /// Convenience builder for a plausible normalization result.
    pub fn normalized(merchant: &str) -> NormalizedMerchant {
        NormalizedMerchant {
            merchant: merchant.to_string(),
            category: "Shopping".to_string(),
            sub_category: "Online Retail".to_string(),
            confidence: 0.95,
            is_subscription: false,
            flags: vec!["online_purchase".to_string()],
        }
    }
}

#[async_trait]
impl TransactionAnalyzer for MockAnalyzer {
    async fn normalize_merchant(
        &self,
        transaction: &Transaction,
    ) -> Result<NormalizedMerchant, AnalyzerError> {
        self.normalize_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.fail_merchant {
            return Err(AnalyzerError::Api(message.clone()));
        }

        if let Some(latency) = self.latencies.get(&transaction.description) {
            tokio::time::sleep(*latency).await;
        }

        Ok(self
            .merchants
            .get(&transaction.description)
            .cloned()
            .unwrap_or_else(|| NormalizedMerchant {
                merchant: transaction.description.clone(),
                category: "Uncategorized".to_string(),
                sub_category: "Unknown".to_string(),
                confidence: 0.5,
                is_subscription: false,
                flags: vec![],
            }))
    }

    async fn detect_patterns(
        &self,
        _transactions: &[Transaction],
    ) -> Result<Vec<Pattern>, AnalyzerError> {
        self.pattern_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.fail_patterns {
            return Err(AnalyzerError::Api(message.clone()));
        }

        Ok(self.patterns.clone())
    }

    async fn health_check(&self) -> Result<(), AnalyzerError> {
        Ok(())
    }
}
