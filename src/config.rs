//! Configuration for the analysis/assignment generation pipeline.
//!
//! Every knob lives in one [`GenerationConfig`] built via its
//! [`GenerationConfigBuilder`], so a config can be shared between the CLI,
//! the web state, and tests, and logged in one place.

use crate::error::ForgeError;
use crate::llm::LlmClient;
use std::fmt;
use std::sync::Arc;

/// Default OpenRouter model identifier.
///
/// A free-tier model keeps the out-of-the-box experience keyless-billing
/// friendly; override with `--model` or `ASSIGNFORGE_MODEL`.
pub const DEFAULT_MODEL: &str = "z-ai/glm-4.5-air:free";

/// Default sampling temperature.
///
/// Zero keeps the output deterministic and faithful to the source document,
/// which matters more for academic writing than creative variation.
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

/// Configuration for one analysis or assignment generation run.
///
/// Built via [`GenerationConfig::builder()`] or [`GenerationConfig::default()`].
///
/// # Example
/// ```rust
/// use assignforge::GenerationConfig;
///
/// let config = GenerationConfig::builder()
///     .model("anthropic/claude-3-7-sonnet")
///     .temperature(0.2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Model identifier on the OpenRouter endpoint. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Sampling temperature, clamped to 0.0–2.0. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens the model may generate, or `None` for the provider
    /// default. Default: None.
    pub max_tokens: Option<usize>,

    /// Per-request timeout in seconds. Default: 120.
    ///
    /// Long-document assignment generation routinely runs past 60s on free
    /// models; 120 covers that while still bounding a hung provider.
    pub api_timeout_secs: u64,

    /// Chat-completion endpoint base URL. Default: the OpenRouter API.
    pub base_url: String,

    /// Explicit API key. If `None`, `OPENROUTER_API_KEY` is read from the
    /// environment when a client is resolved.
    pub api_key: Option<String>,

    /// Pre-constructed client. Takes precedence over `api_key`/environment;
    /// this is the injection point for deterministic stubs in tests.
    pub client: Option<Arc<dyn LlmClient>>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            api_timeout_secs: 120,
            base_url: crate::llm::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            client: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("client", &self.client.as_ref().map(|_| "<dyn LlmClient>"))
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn client(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, ForgeError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(ForgeError::InvalidConfig(
                "Model identifier must not be empty".into(),
            ));
        }
        if !(0.0..=2.0).contains(&c.temperature) {
            return Err(ForgeError::InvalidConfig(format!(
                "Temperature must be 0.0–2.0, got {}",
                c.temperature
            )));
        }
        if let Some(0) = c.max_tokens {
            return Err(ForgeError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = GenerationConfig::default();
        assert_eq!(c.model, DEFAULT_MODEL);
        assert_eq!(c.temperature, 0.0);
        assert_eq!(c.api_timeout_secs, 120);
        assert!(c.max_tokens.is_none());
        assert!(c.client.is_none());
    }

    #[test]
    fn temperature_is_clamped() {
        let c = GenerationConfig::builder().temperature(5.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
        let c = GenerationConfig::builder().temperature(-1.0).build().unwrap();
        assert_eq!(c.temperature, 0.0);
    }

    #[test]
    fn empty_model_is_rejected() {
        let err = GenerationConfig::builder().model("  ").build().unwrap_err();
        assert!(matches!(err, ForgeError::InvalidConfig(_)));
    }

    #[test]
    fn zero_max_tokens_is_rejected() {
        let err = GenerationConfig::builder().max_tokens(0).build().unwrap_err();
        assert!(matches!(err, ForgeError::InvalidConfig(_)));
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = GenerationConfig::builder().api_key("sk-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
