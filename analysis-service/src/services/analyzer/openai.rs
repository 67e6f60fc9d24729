//! OpenAI-backed transaction analyzer.
//!
//! Uses the Chat Completions API with strict JSON-schema response
//! formats so the model output is structured and schema-validated.
//! Malformed or missing structured output is treated as a failure of
//! the call, never coerced.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{AnalyzerError, TransactionAnalyzer};
use crate::models::{NormalizedMerchant, Pattern, Transaction};

/// OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT_MERCHANT: &str = "You are a financial transaction analyzer. \
     Extract structured information from transaction data.";

const SYSTEM_PROMPT_PATTERNS: &str = "You are a financial transaction pattern analyzer. \
     Extract patterns from transaction data.";

/// OpenAI analyzer configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    /// Override for self-hosted gateways and tests.
    pub base_url: String,
}

/// OpenAI-backed analyzer.
pub struct OpenAiAnalyzer {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiAnalyzer {
    pub fn new(config: OpenAiConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Issue one structured chat completion and return the raw JSON
    /// content string of the first choice.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: String,
        schema_name: &'static str,
        schema: Value,
    ) -> Result<String, AnalyzerError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaSpec {
                    name: schema_name,
                    strict: true,
                    schema,
                },
            },
        };

        tracing::debug!(
            model = %self.config.model,
            schema = schema_name,
            "Sending request to OpenAI API"
        );

        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalyzerError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(AnalyzerError::RateLimited);
            }

            return Err(AnalyzerError::Api(format!(
                "OpenAI API error {}: {}",
                status, error_text
            )));
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AnalyzerError::Api(format!("Failed to parse response: {}", e)))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AnalyzerError::InvalidResponse("no choices returned".to_string()))?;

        if let Some(refusal) = choice.message.refusal {
            return Err(AnalyzerError::InvalidResponse(format!(
                "completion refused: {}",
                refusal
            )));
        }

        choice
            .message
            .content
            .ok_or_else(|| AnalyzerError::InvalidResponse("empty completion content".to_string()))
    }
}

#[async_trait]
impl TransactionAnalyzer for OpenAiAnalyzer {
    async fn normalize_merchant(
        &self,
        transaction: &Transaction,
    ) -> Result<NormalizedMerchant, AnalyzerError> {
        let prompt = format!(
            "Analyze this transaction and normalize the merchant information:\n\
             Transaction Description: {}\n\
             Amount: {}\n\
             Date: {}\n\n\
             Please provide:\n\
             1. Normalized merchant name (e.g., Amazon, Apple)\n\
             2. Category\n\
             3. Sub-category\n\
             4. Whether it's likely a subscription\n\
             5. Relevant flags (e.g., online_purchase, marketplace)",
            transaction.description, transaction.amount, transaction.date
        );

        let content = self
            .complete(
                SYSTEM_PROMPT_MERCHANT,
                prompt,
                "merchant_analysis",
                merchant_schema(),
            )
            .await?;

        serde_json::from_str(&content).map_err(|e| {
            AnalyzerError::InvalidResponse(format!("merchant analysis did not match schema: {}", e))
        })
    }

    async fn detect_patterns(
        &self,
        transactions: &[Transaction],
    ) -> Result<Vec<Pattern>, AnalyzerError> {
        let serialized = serde_json::to_string_pretty(transactions)
            .map_err(|e| AnalyzerError::InvalidRequest(e.to_string()))?;

        let prompt = format!(
            "Analyze these transactions for patterns:\n\
             {}\n\n\
             Look for:\n\
             1. Payment types (e.g. subscription)\n\
             2. Normalized merchant name (e.g., Amazon, Apple, etc.)\n\
             3. Recurring amounts (charged amount, put ~ for variable amounts e.g. ~31.50)\n\
             4. Frequency of transactions (e.g., daily, weekly, monthly, yearly, 2-3 times a month)\n\
             5. Next expected transaction dates (YYYY-MM-DD) (if applicable)\n\
             6. Notes on the patterns (if applicable)",
            serialized
        );

        let content = self
            .complete(
                SYSTEM_PROMPT_PATTERNS,
                prompt,
                "pattern_analysis",
                pattern_schema(),
            )
            .await?;

        let analysis: PatternAnalysis = serde_json::from_str(&content).map_err(|e| {
            AnalyzerError::InvalidResponse(format!("pattern analysis did not match schema: {}", e))
        })?;

        Ok(analysis.patterns)
    }

    async fn health_check(&self) -> Result<(), AnalyzerError> {
        if self.config.api_key.is_empty() {
            return Err(AnalyzerError::NotConfigured(
                "OpenAI API key is not set".to_string(),
            ));
        }
        Ok(())
    }
}

/// JSON schema for the merchant normalization response.
fn merchant_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "merchant": { "type": "string" },
            "category": { "type": "string" },
            "sub_category": { "type": "string" },
            "confidence": { "type": "number" },
            "is_subscription": { "type": "boolean" },
            "flags": { "type": "array", "items": { "type": "string" } }
        },
        "required": [
            "merchant",
            "category",
            "sub_category",
            "confidence",
            "is_subscription",
            "flags"
        ],
        "additionalProperties": false
    })
}

/// JSON schema for the pattern detection response.
fn pattern_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "patterns": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "type": { "type": "string" },
                        "merchant": { "type": "string" },
                        "amount": { "anyOf": [ { "type": "number" }, { "type": "string" } ] },
                        "frequency": { "type": "string" },
                        "confidence": { "type": "number" },
                        "next_expected": { "type": ["string", "null"] },
                        "notes": { "type": ["string", "null"] }
                    },
                    "required": [
                        "type",
                        "merchant",
                        "amount",
                        "frequency",
                        "confidence",
                        "next_expected",
                        "notes"
                    ],
                    "additionalProperties": false
                }
            }
        },
        "required": ["patterns"],
        "additionalProperties": false
    })
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaSpec,
}

#[derive(Debug, Serialize)]
struct JsonSchemaSpec {
    name: &'static str,
    strict: bool,
    schema: Value,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Wire shape of the structured pattern response.
#[derive(Debug, Deserialize)]
struct PatternAnalysis {
    patterns: Vec<Pattern>,
}
