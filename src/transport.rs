use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::error::{AgentError, Result};
use crate::models::{ChatMessage, ChatRequest, ChatResponse};

const MAX_RETRY_DURATION: Duration = Duration::from_secs(120);

/// Text-completion service used for classification, polishing and chit-chat
#[async_trait]
pub trait Transport: Send + Sync {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse>;
}

/// Send a system + user prompt and return the first choice's content.
pub async fn complete(
    tx: &dyn Transport,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
    max_tokens: i32,
    response_format: Option<serde_json::Value>,
) -> Result<String> {
    let request = ChatRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
        temperature,
        max_tokens,
        response_format,
    };

    let response = tx.chat(&request).await?;
    response
        .first_content()
        .map(str::to_string)
        .ok_or_else(|| AgentError::Completion("completion service returned no choices".to_string()))
}

/// Chat-completions client for any OpenAI-compatible endpoint (Groq, OpenAI, Ollama)
pub struct OpenAiTransport {
    client: Client,
    endpoint: String,
    api_key: String,
    max_attempts: u8,
}

impl OpenAiTransport {
    pub fn new(cfg: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
            api_key: cfg.api_key.clone(),
            max_attempts: cfg.max_attempts.max(1),
        })
    }
}

#[async_trait]
impl Transport for OpenAiTransport {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let start_time = Instant::now();
        let mut attempts = 0;

        while attempts < self.max_attempts {
            if start_time.elapsed() > MAX_RETRY_DURATION {
                return Err(AgentError::Completion(format!(
                    "request timed out after {} seconds (max retry duration exceeded)",
                    MAX_RETRY_DURATION.as_secs()
                )));
            }

            attempts += 1;

            match self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(req)
                .send()
                .await
            {
                Ok(response) => {
                    if response.status().is_success() {
                        return response.json().await.map_err(|e| {
                            AgentError::Completion(format!(
                                "failed to parse completion response: {e}"
                            ))
                        });
                    }

                    if attempts >= self.max_attempts {
                        let status = response.status();
                        return Err(AgentError::Completion(format!(
                            "completion API error after {} attempts ({}): {}",
                            attempts,
                            status,
                            response
                                .text()
                                .await
                                .unwrap_or_else(|_| "Unknown error".to_string())
                        )));
                    }
                    tracing::warn!(
                        attempt = attempts,
                        status = %response.status(),
                        "completion request rejected, retrying"
                    );
                }
                Err(e) => {
                    if attempts >= self.max_attempts {
                        return Err(AgentError::Completion(format!(
                            "failed to send completion request after {attempts} attempts: {e}"
                        )));
                    }
                    tracing::warn!(attempt = attempts, "completion request failed: {}", e);
                }
            }

            // Exponential backoff with jitter
            let base_delay =
                Duration::from_millis(200 * 2u64.pow(u32::from(attempts.saturating_sub(1))));
            let jitter = rand::thread_rng().gen_range(0.8..=1.2);
            let delay = Duration::from_millis((base_delay.as_millis() as f64 * jitter) as u64);
            sleep(std::cmp::min(delay, Duration::from_secs(30))).await;
        }

        Err(AgentError::Completion(format!(
            "completion request failed after {} attempts",
            self.max_attempts
        )))
    }
}
