//! HTTP handlers for analysis-service.

use axum::extract::{Multipart, State};
use axum::Json;
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::{
    CsvAnalysisResponse, MerchantAnalysisRequest, MerchantAnalysisResponse,
    PatternAnalysisRequest, PatternAnalysisResponse,
};
use crate::models::Transaction;
use crate::startup::AppState;

/// Maximum accepted CSV upload size.
pub const MAX_UPLOAD_BYTES: usize = 1024 * 1024; // 1 MiB

/// Normalize the merchant of one transaction.
pub async fn analyze_merchant(
    State(state): State<AppState>,
    Json(req): Json<MerchantAnalysisRequest>,
) -> Result<Json<MerchantAnalysisResponse>, AppError> {
    req.validate()?;
    check_dates(std::slice::from_ref(&req.transaction))?;

    let normalized = state.analysis.analyze_merchant(&req.transaction).await?;
    Ok(Json(MerchantAnalysisResponse { normalized }))
}

/// Detect patterns across an ad-hoc batch of transactions.
pub async fn analyze_patterns(
    State(state): State<AppState>,
    Json(req): Json<PatternAnalysisRequest>,
) -> Result<Json<PatternAnalysisResponse>, AppError> {
    req.validate()?;
    check_dates(&req.transactions)?;

    let patterns = state.analysis.analyze_patterns(&req.transactions).await?;
    Ok(Json(PatternAnalysisResponse { patterns }))
}

/// Upload and analyze a CSV file of transactions.
pub async fn upload_transactions(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CsvAnalysisResponse>, AppError> {
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or("").to_string();
        if content_type != "text/csv" {
            return Err(AppError::UnsupportedMediaType(format!(
                "expected a text/csv upload, got '{}'",
                content_type
            )));
        }

        let data = field.bytes().await.map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e))
        })?;
        file = Some(data);
        break;
    }

    let data = file.ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("No file uploaded")))?;

    if data.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::PayloadTooLarge(
            "CSV uploads are limited to 1 MiB".to_string(),
        ));
    }

    let report = state.upload.analyze_csv(&data).await?;
    Ok(Json(report))
}

fn check_dates(transactions: &[Transaction]) -> Result<(), AppError> {
    for tx in transactions {
        if tx.parse_date().is_err() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "invalid date '{}', expected an ISO date (YYYY-MM-DD)",
                tx.date
            )));
        }
    }
    Ok(())
}
