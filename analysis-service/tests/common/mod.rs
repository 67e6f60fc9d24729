//! Test helper module for analysis-service integration tests.

#![allow(dead_code)]

use analysis_service::config::{AnalysisConfig, OpenAiSettings};
use analysis_service::services::analyzer::mock::MockAnalyzer;
use analysis_service::startup::Application;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;

/// Test application wrapper for integration tests.
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub analyzer: Arc<MockAnalyzer>,
}

impl TestApp {
    /// Spawn a test application on a random port with the given mock
    /// analyzer standing in for the external boundary.
    pub async fn spawn(mock: MockAnalyzer) -> Self {
        let analyzer = Arc::new(mock);

        let config = AnalysisConfig {
            common: CoreConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            service_name: "analysis-service-test".to_string(),
            log_level: "warn".to_string(),
            otlp_endpoint: None,
            openai: OpenAiSettings {
                api_key: "test-key".to_string(),
                model: "gpt-4o-mini".to_string(),
                base_url: "http://127.0.0.1:9".to_string(),
            },
        };

        let app = Application::build_with_analyzer(config, analyzer.clone())
            .await
            .expect("Failed to build application");
        let port = app.port();

        tokio::spawn(app.run_until_stopped());

        Self {
            address: format!("http://127.0.0.1:{}", port),
            port,
            analyzer,
        }
    }
}

/// Build a multipart form carrying one file field.
pub fn csv_form(bytes: &[u8], content_type: &str) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(bytes.to_vec())
            .file_name("transactions.csv")
            .mime_str(content_type)
            .expect("invalid mime type"),
    )
}
