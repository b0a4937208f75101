use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::adapters::llm::{
    send_once, GenerationParams, LLMAdapter, ProviderRequest, ReviewError, ReviewResult,
};

const PROVIDER: &str = "Anthropic";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const HUMAN_PROMPT: &str = "\n\nHuman:";
const AI_PROMPT: &str = "\n\nAssistant:";

pub struct AnthropicAdapter {
    client: Client,
    api_key: String,
    base_url: String,
}

/// Text completion request. The output budget is `max_tokens_to_sample`
/// rather than the chat API's `max_tokens`.
#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: String,
    max_tokens_to_sample: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    completion: String,
}

impl AnthropicAdapter {
    pub fn new(client: Client, api_key: String, base_url: Option<String>) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            client,
            api_key,
            base_url,
        }
    }

    fn wrap_prompt(prompt: &str) -> String {
        format!("{} {}{}", HUMAN_PROMPT, prompt, AI_PROMPT)
    }

    fn parse_response(body: &str) -> ReviewResult {
        let response: CompletionResponse = serde_json::from_str(body).map_err(|e| {
            ReviewError::provider(PROVIDER, format!("failed to parse response: {}", e))
        })?;

        let text = response.completion.trim();
        if text.is_empty() {
            return Err(ReviewError::no_response(PROVIDER, body));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl LLMAdapter for AnthropicAdapter {
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    fn prepare_request(&self, prompt: &str, params: &GenerationParams) -> ProviderRequest {
        let request = CompletionRequest {
            model: &params.model,
            prompt: Self::wrap_prompt(prompt),
            max_tokens_to_sample: params.max_tokens,
            temperature: params.temperature,
        };

        ProviderRequest {
            url: format!("{}/complete", self.base_url),
            headers: vec![
                ("x-api-key", self.api_key.clone()),
                ("anthropic-version", API_VERSION.to_string()),
            ],
            body: serde_json::to_value(request).unwrap_or_default(),
        }
    }

    async fn execute(&self, request: ProviderRequest) -> ReviewResult {
        let body = send_once(&self.client, PROVIDER, request).await?;
        Self::parse_response(&body)
    }
}
