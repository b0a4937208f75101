use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Provider-agnostic generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub provider: Provider,
    pub params: GenerationParams,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Why a review could not be produced.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReviewError {
    #[error("No response from {provider}\n{diagnostic}")]
    NoResponse { provider: String, diagnostic: String },

    #[error("{provider} failed to generate a review: {message}")]
    Provider { provider: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl ReviewError {
    pub fn provider(provider: &str, message: impl fmt::Display) -> Self {
        ReviewError::Provider {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }

    pub fn no_response(provider: &str, diagnostic: impl Into<String>) -> Self {
        ReviewError::NoResponse {
            provider: provider.to_string(),
            diagnostic: diagnostic.into(),
        }
    }
}

pub type ReviewResult = std::result::Result<String, ReviewError>;

/// A fully described HTTP call, built before anything touches the network.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: serde_json::Value,
}

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    fn provider_name(&self) -> &str;

    fn prepare_request(&self, prompt: &str, params: &GenerationParams) -> ProviderRequest;

    /// Performs the single call for `request` and normalizes the reply.
    async fn execute(&self, request: ProviderRequest) -> ReviewResult;

    async fn generate_review(&self, prompt: &str, params: &GenerationParams) -> ReviewResult {
        let request = self.prepare_request(prompt, params);
        self.execute(request).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Anthropic,
    Ollama,
}

/// Registered provider names. New providers are added here and in
/// [`create_adapter`].
const PROVIDERS: &[(&str, Provider)] = &[
    ("openai", Provider::OpenAI),
    ("anthropic", Provider::Anthropic),
    ("ollama", Provider::Ollama),
];

impl Provider {
    pub fn name(&self) -> &'static str {
        PROVIDERS
            .iter()
            .find(|(_, provider)| provider == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }

    /// Environment variable holding the credential, for providers that need one.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAI => Some("OPENAI_API_KEY"),
            Provider::Anthropic => Some("ANTHROPIC_API_KEY"),
            Provider::Ollama => None,
        }
    }
}

impl FromStr for Provider {
    type Err = ReviewError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let wanted = name.trim().to_ascii_lowercase();
        PROVIDERS
            .iter()
            .find(|(key, _)| *key == wanted)
            .map(|(_, provider)| *provider)
            .ok_or_else(|| {
                let known: Vec<&str> = PROVIDERS.iter().map(|(key, _)| *key).collect();
                ReviewError::Config(format!(
                    "unknown provider '{}' (expected one of: {})",
                    name,
                    known.join(", ")
                ))
            })
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn create_adapter(config: &ModelConfig) -> Result<Box<dyn LLMAdapter>, ReviewError> {
    let api_key = match config.provider.api_key_env() {
        Some(env_name) => Some(
            config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    ReviewError::Config(format!(
                        "{} API key not found. Set {} or provide api_key in config",
                        config.provider, env_name
                    ))
                })?,
        ),
        None => None,
    };

    let client = build_client(config.timeout_secs)?;

    match config.provider {
        Provider::OpenAI => Ok(Box::new(crate::adapters::OpenAIAdapter::new(
            client,
            api_key.unwrap_or_default(),
            config.base_url.clone(),
        ))),
        Provider::Anthropic => Ok(Box::new(crate::adapters::AnthropicAdapter::new(
            client,
            api_key.unwrap_or_default(),
            config.base_url.clone(),
        ))),
        Provider::Ollama => Ok(Box::new(crate::adapters::OllamaAdapter::new(
            client,
            config.base_url.clone(),
        ))),
    }
}

fn build_client(timeout_secs: Option<u64>) -> Result<Client, ReviewError> {
    let mut builder = Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| ReviewError::Config(format!("failed to build HTTP client: {}", e)))
}

/// Sends a prepared request once and hands back the raw body of a successful
/// response. Transport failures and non-2xx statuses become provider errors.
pub(crate) async fn send_once(
    client: &Client,
    provider: &str,
    request: ProviderRequest,
) -> Result<String, ReviewError> {
    let mut builder = client.post(&request.url).json(&request.body);
    for (name, value) in &request.headers {
        builder = builder.header(*name, value);
    }

    let response = builder
        .send()
        .await
        .map_err(|e| ReviewError::provider(provider, format!("request failed: {}", e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ReviewError::provider(provider, format!("failed to read response: {}", e)))?;

    if !status.is_success() {
        return Err(ReviewError::provider(
            provider,
            format!("API error ({}): {}", status, body),
        ));
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_config(provider: Provider, api_key: Option<&str>) -> ModelConfig {
        ModelConfig {
            provider,
            params: GenerationParams {
                model: "test-model".to_string(),
                temperature: 0.5,
                max_tokens: 64,
            },
            api_key: api_key.map(str::to_string),
            base_url: None,
            timeout_secs: None,
        }
    }

    #[test]
    fn provider_names_round_trip_through_registry() {
        for (name, provider) in PROVIDERS {
            assert_eq!(name.parse::<Provider>().unwrap(), *provider);
            assert_eq!(provider.name(), *name);
        }
        assert_eq!(" OpenAI ".parse::<Provider>().unwrap(), Provider::OpenAI);
    }

    #[test]
    fn unknown_provider_is_config_error() {
        let err = "bard".parse::<Provider>().unwrap_err();
        match err {
            ReviewError::Config(message) => {
                assert!(message.contains("bard"));
                assert!(message.contains("openai, anthropic, ollama"));
            }
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn missing_credential_is_config_error() {
        for provider in [Provider::OpenAI, Provider::Anthropic] {
            let err = create_adapter(&model_config(provider, None)).err().unwrap();
            assert!(matches!(err, ReviewError::Config(_)));

            let err = create_adapter(&model_config(provider, Some("  "))).err().unwrap();
            assert!(matches!(err, ReviewError::Config(_)));
        }
    }

    #[test]
    fn selects_adapter_for_provider() {
        let adapter = create_adapter(&model_config(Provider::Anthropic, Some("k"))).unwrap();
        assert_eq!(adapter.provider_name(), "Anthropic");

        let adapter = create_adapter(&model_config(Provider::Ollama, None)).unwrap();
        assert_eq!(adapter.provider_name(), "Ollama");
    }

    #[test]
    fn failure_messages_carry_diagnostics() {
        let err = ReviewError::no_response("OpenAI", "{\"choices\":[]}");
        assert_eq!(err.to_string(), "No response from OpenAI\n{\"choices\":[]}");

        let err = ReviewError::provider("OpenAI", "boom");
        assert_eq!(err.to_string(), "OpenAI failed to generate a review: boom");
    }
}
