//! Completion service collaborator.
//!
//! The orchestrators depend on the [`CompletionClient`] trait, not a concrete
//! transport, so tests substitute canned clients and per-stage failure
//! isolation stays practical. [`HttpCompletionClient`] talks to an
//! OpenAI-compatible chat-completions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use leadscout_shared::{LeadScoutError, Result};

/// Timeout for one completion call, the longest allowance in the pipeline.
const COMPLETION_TIMEOUT_SECS: u64 = 60;

/// User-Agent string for completion requests.
const USER_AGENT: &str = concat!("LeadScout/", env!("CARGO_PKG_VERSION"));

/// Collaborator handle for the generative completion service.
///
/// The reply carries no structural guarantee; callers must defensively parse.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `prompt` and return the raw completion text.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;

    /// Model identifier, used for extraction-cache keying.
    fn model_id(&self) -> &str;
}

// ---------------------------------------------------------------------------
// HttpCompletionClient
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

/// [`CompletionClient`] backed by an OpenAI-compatible HTTP endpoint.
pub struct HttpCompletionClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpCompletionClient {
    /// Create a client against `endpoint` (base URL without the
    /// `/chat/completions` suffix; overridable for tests).
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(COMPLETION_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                LeadScoutError::Completion(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.1,
            "max_tokens": max_tokens,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LeadScoutError::Timeout("completion call".into())
                } else {
                    LeadScoutError::Completion(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let snippet: String = detail.chars().take(200).collect();
            return Err(LeadScoutError::Completion(format!(
                "HTTP {status}: {snippet}"
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LeadScoutError::Completion(format!("invalid response: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LeadScoutError::Completion("response carried no choices".into()))?;

        debug!(chars = text.len(), "completion received");
        Ok(text)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
