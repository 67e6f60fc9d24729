//! Integration tests for the single-merchant and batch-pattern endpoints.

mod common;

use analysis_service::models::{Pattern, PatternAmount};
use analysis_service::services::analyzer::mock::MockAnalyzer;
use common::TestApp;
use reqwest::{Client, StatusCode};
use serde_json::json;

fn transaction(date: &str, description: &str, amount: f64) -> serde_json::Value {
    json!({ "date": date, "description": description, "amount": amount })
}

#[tokio::test]
async fn analyze_merchant_returns_normalized_result() {
    let mock =
        MockAnalyzer::new().with_merchant("AMAZON.COM*KB8LL", MockAnalyzer::normalized("Amazon"));
    let app = TestApp::spawn(mock).await;

    let response = Client::new()
        .post(format!("{}/api/analyze/merchant", app.address))
        .json(&json!({ "transaction": transaction("2024-01-25", "AMAZON.COM*KB8LL", 29.99) }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["normalized"]["merchant"], "Amazon");
    assert_eq!(body["normalized"]["category"], "Shopping");
    assert_eq!(body["normalized"]["is_subscription"], false);
    assert_eq!(app.analyzer.normalize_calls(), 1);
}

#[tokio::test]
async fn merchant_failure_surfaces_fixed_message_with_cause_as_details() {
    let app = TestApp::spawn(MockAnalyzer::new().failing_merchant("connection reset")).await;

    let response = Client::new()
        .post(format!("{}/api/analyze/merchant", app.address))
        .json(&json!({ "transaction": transaction("2024-01-25", "AMAZON.COM*KB8LL", 29.99) }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "Failed to analyze merchant information");
    let details = body["details"].as_str().unwrap();
    assert!(details.contains("connection reset"));
}

#[tokio::test]
async fn analyze_patterns_returns_detected_patterns() {
    let mock = MockAnalyzer::new().with_patterns(vec![Pattern {
        pattern_type: "recurring".to_string(),
        merchant: "Netflix".to_string(),
        amount: PatternAmount::Fixed(14.99),
        frequency: "monthly".to_string(),
        confidence: 0.85,
        next_expected: Some("2024-02-01".to_string()),
        notes: Some("Regular monthly subscription".to_string()),
    }]);
    let app = TestApp::spawn(mock).await;

    let response = Client::new()
        .post(format!("{}/api/analyze/patterns", app.address))
        .json(&json!({ "transactions": [
            transaction("2024-01-25", "NETFLIX.COM", 14.99),
            transaction("2023-12-25", "NETFLIX.COM", 14.99),
        ]}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["patterns"][0]["type"], "recurring");
    assert_eq!(body["patterns"][0]["merchant"], "Netflix");
    assert_eq!(body["patterns"][0]["amount"], 14.99);
    assert_eq!(app.analyzer.pattern_calls(), 1);
}

#[tokio::test]
async fn patterns_failure_surfaces_fixed_message() {
    let app = TestApp::spawn(MockAnalyzer::new().failing_patterns("model overloaded")).await;

    let response = Client::new()
        .post(format!("{}/api/analyze/patterns", app.address))
        .json(&json!({ "transactions": [transaction("2024-01-25", "NETFLIX.COM", 14.99)] }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "Failed to analyze transaction patterns");
    assert!(body["details"].as_str().unwrap().contains("model overloaded"));
}

#[tokio::test]
async fn empty_transaction_batch_is_rejected_before_the_analyzer() {
    let app = TestApp::spawn(MockAnalyzer::new()).await;

    let response = Client::new()
        .post(format!("{}/api/analyze/patterns", app.address))
        .json(&json!({ "transactions": [] }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.analyzer.pattern_calls(), 0);
}

#[tokio::test]
async fn non_iso_date_is_rejected() {
    let app = TestApp::spawn(MockAnalyzer::new()).await;

    let response = Client::new()
        .post(format!("{}/api/analyze/merchant", app.address))
        .json(&json!({ "transaction": transaction("Jan 25, 2024", "AMAZON.COM", 29.99) }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.analyzer.normalize_calls(), 0);
}
