//! OpenRouter-backed synthesis oracle.
//!
//! HTTP client for an OpenRouter-compatible chat-completions endpoint,
//! composed from connection pooling (reqwest), token-bucket rate limiting,
//! and exponential-backoff retry for transient errors. Each requested
//! variant is fetched with its own completion call so one slow or failed
//! call cannot sink the whole batch; partial batches are returned as-is.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::models::OracleConfig;
use crate::domain::ports::{OracleError, ProposeRequest, SynthesisOracle};

use super::prompts::{build_prompt, strip_code_fences};
use super::rate_limiter::TokenBucketRateLimiter;
use super::retry::RetryPolicy;

/// Chat-completions request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// HTTP synthesis oracle speaking the OpenRouter wire format.
pub struct OpenRouterOracle {
    http_client: ReqwestClient,
    api_key: String,
    base_url: String,
    model: String,
    rate_limiter: TokenBucketRateLimiter,
    retry_policy: RetryPolicy,
}

impl OpenRouterOracle {
    /// Create a client from configuration. Fails when no API key is set
    /// or the HTTP client cannot be built.
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                OracleError::Connection(
                    "oracle API key not configured (set CRUCIBLE_ORACLE__API_KEY)".to_string(),
                )
            })?;
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| OracleError::Connection(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            rate_limiter: TokenBucketRateLimiter::new(config.requests_per_second),
            retry_policy: RetryPolicy::new(
                config.max_retries,
                config.initial_backoff_ms,
                config.max_backoff_ms,
            ),
        })
    }

    /// One rate-limited, retried completion call returning code text.
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, OracleError> {
        self.retry_policy
            .execute(|| async {
                self.rate_limiter.acquire().await;
                self.send(prompt, temperature).await
            })
            .await
    }

    async fn send(&self, prompt: &str, temperature: f32) -> Result<String, OracleError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature,
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout
                } else {
                    OracleError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(OracleError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| OracleError::MalformedResponse(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| OracleError::MalformedResponse("response has no choices".to_string()))?;

        let code = strip_code_fences(&content);
        if code.is_empty() {
            return Err(OracleError::MalformedResponse(
                "response contained no code".to_string(),
            ));
        }
        Ok(code)
    }
}

#[async_trait]
impl SynthesisOracle for OpenRouterOracle {
    async fn propose(&self, request: ProposeRequest) -> Result<Vec<String>, OracleError> {
        let n = request.n_variants.max(1);
        let mut variants = Vec::with_capacity(n);
        let mut last_error = None;

        // Repair requests want faithful fixes; generation wants diversity.
        let temperature = match request.kind {
            crate::domain::ports::ProposalKind::Repair { .. } => 0.3,
            _ => 0.7,
        };

        for variant in 0..n {
            let prompt = build_prompt(&request, variant);
            match self.complete(&prompt, temperature).await {
                Ok(code) => variants.push(code),
                Err(err) => {
                    warn!(
                        kind = request.kind.as_str(),
                        variant,
                        error = %err,
                        "oracle variant failed"
                    );
                    last_error = Some(err);
                }
            }
        }

        if variants.is_empty() {
            Err(last_error.unwrap_or_else(|| {
                OracleError::MalformedResponse("no variants produced".to_string())
            }))
        } else {
            debug!(
                kind = request.kind.as_str(),
                requested = n,
                produced = variants.len(),
                "oracle batch complete"
            );
            Ok(variants)
        }
    }
}
