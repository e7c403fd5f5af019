//! External text oracle.
//!
//! The core consults the oracle in four modes: complexity classification,
//! cluster assignment, similarity judgment and answer generation. All four
//! are fallible; every call site in the core resolves a failure with a
//! deterministic fallback instead of retrying.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::templates;
use crate::types::Strategy;

/// Contract with the external text oracle. Implementations return free text;
/// the core parses responses leniently.
#[async_trait]
pub trait TextOracle: Send + Sync {
    /// Expected to answer with one of: simple, moderate, complex.
    async fn classify_complexity(&self, query: &str) -> Result<String>;

    /// Expected to answer with a `GROUP: <name>` line given a summary of
    /// existing groups.
    async fn cluster_query(&self, query: &str, existing_groups: &str) -> Result<String>;

    /// Expected to answer with SIMILAR or DIFFERENT.
    async fn judge_similarity(&self, first: &str, second: &str) -> Result<String>;

    /// Free-form answer generation using the strategy's persona prompt.
    async fn generate(&self, strategy: Strategy, context: &str, question: &str) -> Result<String>;
}

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Analysis calls want determinism; generation wants some creativity.
const ANALYSIS_TEMPERATURE: f32 = 0.0;
const GENERATION_TEMPERATURE: f32 = 0.7;

/// OpenAI-compatible chat-completions oracle.
pub struct OpenAiOracle {
    endpoint: String,
    api_key: String,
    model: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiOracle {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(15))
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        let model = model.into();
        tracing::info!(model = %model, "creating OpenAI-compatible oracle");

        Ok(Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model,
            client,
        })
    }

    /// Point at a different OpenAI-compatible endpoint (proxies, local
    /// servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": temperature,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow!("oracle request to {} failed: {}", self.endpoint, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| anyhow!("failed to read oracle response body: {}", e))?;

        // Gateways sometimes return HTML error pages with a 200 status;
        // surface those as a clear error instead of a JSON parse failure.
        let trimmed = text.trim_start();
        if trimmed.starts_with('<') {
            let preview: String = trimmed.chars().take(200).collect();
            return Err(anyhow!(
                "oracle endpoint {} returned HTML instead of JSON (HTTP {}): {}",
                self.endpoint,
                status,
                preview
            ));
        }

        let completion: ChatCompletion = serde_json::from_str(&text).map_err(|e| {
            let preview: String = text.chars().take(300).collect();
            anyhow!(
                "failed to parse oracle response (HTTP {}): {}. Body: {}",
                status,
                e,
                preview
            )
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("oracle response contained no choices"))
    }
}

#[async_trait]
impl TextOracle for OpenAiOracle {
    async fn classify_complexity(&self, query: &str) -> Result<String> {
        self.complete(&templates::complexity_prompt(query), ANALYSIS_TEMPERATURE)
            .await
    }

    async fn cluster_query(&self, query: &str, existing_groups: &str) -> Result<String> {
        self.complete(
            &templates::clustering_prompt(query, existing_groups),
            ANALYSIS_TEMPERATURE,
        )
        .await
    }

    async fn judge_similarity(&self, first: &str, second: &str) -> Result<String> {
        self.complete(
            &templates::similarity_prompt(first, second),
            ANALYSIS_TEMPERATURE,
        )
        .await
    }

    async fn generate(&self, strategy: Strategy, context: &str, question: &str) -> Result<String> {
        self.complete(
            &templates::strategy_prompt(strategy, context, question),
            GENERATION_TEMPERATURE,
        )
        .await
    }
}
