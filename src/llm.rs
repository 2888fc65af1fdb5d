//! LLM client: chat-completion wire types and the OpenRouter implementation.
//!
//! The [`LlmClient`] trait is the seam between the pipeline and the network.
//! Production code uses [`OpenRouterClient`]; tests inject a deterministic
//! stub so `run_analysis`/`run_assignment` become pure functions of their
//! text inputs.
//!
//! ## Failure policy
//!
//! One attempt per call, no automatic retry. The UI flow is a blocking
//! action-per-step pipeline where the user is present; surfacing the mapped
//! error immediately and letting them press the button again is the contract.
//! Status mapping: 401/403 → [`ForgeError::AuthFailed`], 429 →
//! [`ForgeError::RateLimited`], transport/timeout → [`ForgeError::Network`] /
//! [`ForgeError::ApiTimeout`], any other non-2xx → [`ForgeError::ApiError`].

use crate::error::ForgeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default OpenRouter-compatible endpoint base.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// One message in a chat-completion conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A fully-assembled chat-completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

/// Token accounting reported by the provider (zeroed when absent).
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

/// The provider's answer: generated text plus token usage.
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub content: String,
    pub usage: Usage,
}

/// Seam between the pipeline and the chat-completion provider.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, ForgeError>;
}

// ── Wire response types ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

// ── OpenRouter client ────────────────────────────────────────────────────

/// Chat-completion client for OpenRouter (or any OpenAI-compatible endpoint).
#[derive(Debug)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout_secs: u64,
}

impl OpenRouterClient {
    /// Build a client for the given endpoint and key.
    ///
    /// `timeout_secs` bounds the whole request; a hung provider surfaces as
    /// [`ForgeError::ApiTimeout`] rather than blocking the session forever.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ForgeError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ForgeError::MissingApiKey);
        }
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ForgeError::Network {
                detail: e.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout_secs,
        })
    }

    /// Build a client from `OPENROUTER_API_KEY` (and optional
    /// `ASSIGNFORGE_BASE_URL`) in the environment.
    pub fn from_env(timeout_secs: u64) -> Result<Self, ForgeError> {
        let api_key =
            std::env::var("OPENROUTER_API_KEY").map_err(|_| ForgeError::MissingApiKey)?;
        let base_url = std::env::var("ASSIGNFORGE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url, api_key, timeout_secs)
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, ForgeError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %request.model, messages = request.messages.len(), "Sending chat completion");

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ForgeError::ApiTimeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    ForgeError::Network {
                        detail: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let detail = truncate_detail(&detail);
            warn!(%status, "LLM provider returned an error");
            return Err(match status.as_u16() {
                401 | 403 => ForgeError::AuthFailed {
                    status: status.as_u16(),
                    detail,
                },
                429 => ForgeError::RateLimited { detail },
                code => ForgeError::ApiError {
                    status: code,
                    detail,
                },
            });
        }

        let completion: CompletionResponse =
            response.json().await.map_err(|e| ForgeError::EmptyCompletion {
                detail: e.to_string(),
            })?;

        let usage = completion.usage.unwrap_or_default();
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ForgeError::EmptyCompletion {
                detail: "response contained no choices".to_string(),
            })?;

        if content.trim().is_empty() {
            return Err(ForgeError::EmptyCompletion {
                detail: "response text was empty".to_string(),
            });
        }

        debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "Chat completion received"
        );

        Ok(ChatCompletion {
            content: content.trim().to_string(),
            usage,
        })
    }
}

/// Keep provider error bodies readable in a single log/UI line.
fn truncate_detail(body: &str) -> String {
    let body = body.trim();
    if body.len() > 400 {
        let mut end = 400;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors_set_roles() {
        assert_eq!(ChatMessage::system("s").role, "system");
        assert_eq!(ChatMessage::user("u").role, "user");
    }

    #[test]
    fn request_serialises_without_null_max_tokens() {
        let req = ChatRequest {
            model: "test/model".into(),
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.0,
            max_tokens: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("max_tokens"), "got: {json}");
        assert!(json.contains("\"model\":\"test/model\""));
    }

    #[test]
    fn empty_key_is_rejected() {
        let err = OpenRouterClient::new(DEFAULT_BASE_URL, "  ", 60).unwrap_err();
        assert!(err.is_auth());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client =
            OpenRouterClient::new("https://openrouter.ai/api/v1/", "sk-test", 60).unwrap();
        assert_eq!(client.base_url, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn usage_defaults_to_zero_when_fields_missing() {
        let usage: Usage = serde_json::from_str("{}").unwrap();
        assert_eq!(usage.prompt_tokens, 0);
        assert_eq!(usage.completion_tokens, 0);
    }

    #[test]
    fn truncate_detail_caps_long_bodies() {
        let long = "x".repeat(1000);
        let out = truncate_detail(&long);
        assert!(out.len() < 500);
        assert!(out.ends_with('…'));
        assert_eq!(truncate_detail("short"), "short");
    }
}
