use crate::config::Config;
use crate::error::{env_error, generation_error, AppResult};
use async_trait::async_trait;
use rig::completion::{Chat, Message};
use rig::providers::gemini::Client as GeminiClient;
use tracing::info;

/// A text-completion service that answers one prompt at a time
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Model name used in logs
    fn name(&self) -> &str;

    /// Send one request and return the raw reply text
    async fn complete(&self, preamble: &str, prompt: &str) -> AppResult<String>;
}

/// Google Gemini through Rig
pub struct GeminiModel {
    client: GeminiClient,
    model: String,
    temperature: f64,
}

impl GeminiModel {
    pub fn new(api_key: &str, model: impl Into<String>, temperature: f64) -> Self {
        Self {
            client: GeminiClient::new(api_key),
            model: model.into(),
            temperature,
        }
    }

    /// Build the model from config, failing early when no API key is set
    pub fn from_config(config: &Config) -> AppResult<Self> {
        if config.gemini_api_key.trim().is_empty() {
            return Err(env_error("GEMINI_API_KEY"));
        }
        info!("Using Gemini model: {}", config.gemini_model);
        Ok(Self::new(
            &config.gemini_api_key,
            config.gemini_model.clone(),
            config.temperature,
        ))
    }
}

#[async_trait]
impl CompletionModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, preamble: &str, prompt: &str) -> AppResult<String> {
        // The preamble carries the current time, so the agent is built per request
        let agent = self
            .client
            .agent(&self.model)
            .preamble(preamble)
            .temperature(self.temperature)
            .build();

        let response = agent
            .chat(prompt.to_string(), Vec::<Message>::new())
            .await
            .map_err(|e| generation_error(&format!("Rig API request failed: {}", e)))?;

        info!("Received response from Gemini");
        Ok(response)
    }
}

/// Stand-in used when no model can be built, so store and export commands
/// keep working; every completion fails with the original reason
pub struct UnavailableModel {
    reason: String,
}

impl UnavailableModel {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl CompletionModel for UnavailableModel {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn complete(&self, _preamble: &str, _prompt: &str) -> AppResult<String> {
        Err(generation_error(&format!("No model available: {}", self.reason)))
    }
}
