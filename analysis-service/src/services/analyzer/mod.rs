//! Analyzer abstractions and implementations.
//!
//! The merchant/pattern analysis capability is an external black box.
//! This module exposes it behind a narrow two-operation trait so the
//! orchestration layer is testable with a deterministic stand-in and
//! portable to any backing analysis engine.

pub mod mock;
pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NormalizedMerchant, Pattern, Transaction};

/// Error type for analyzer operations.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Analyzer not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Malformed analyzer response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),
}

/// Trait for transaction analyzers.
///
/// Implementations issue exactly one external call per invocation and
/// never retry; retry policy, if any, belongs to the caller's boundary.
#[async_trait]
pub trait TransactionAnalyzer: Send + Sync {
    /// Normalize the merchant identity of a single transaction.
    async fn normalize_merchant(
        &self,
        transaction: &Transaction,
    ) -> Result<NormalizedMerchant, AnalyzerError>;

    /// Detect spending patterns across a batch of transactions.
    ///
    /// An empty batch is passed through as-is; the analyzer is
    /// authoritative on how to respond to it.
    async fn detect_patterns(
        &self,
        transactions: &[Transaction],
    ) -> Result<Vec<Pattern>, AnalyzerError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), AnalyzerError>;
}
