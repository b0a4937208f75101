use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::adapters::llm::{
    send_once, GenerationParams, LLMAdapter, ProviderRequest, ReviewError, ReviewResult,
};

const PROVIDER: &str = "Ollama";
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

pub struct OllamaAdapter {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

impl OllamaAdapter {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Self { client, base_url }
    }

    fn parse_response(body: &str) -> ReviewResult {
        let response: OllamaResponse = serde_json::from_str(body).map_err(|e| {
            ReviewError::provider(PROVIDER, format!("failed to parse response: {}", e))
        })?;

        let text = response.response.trim();
        if text.is_empty() {
            return Err(ReviewError::no_response(PROVIDER, body));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl LLMAdapter for OllamaAdapter {
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    fn prepare_request(&self, prompt: &str, params: &GenerationParams) -> ProviderRequest {
        // Accept the "ollama:<model>" spelling as well as the bare model name.
        let model = params
            .model
            .strip_prefix("ollama:")
            .unwrap_or(&params.model);

        let request = OllamaRequest {
            model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: params.temperature,
                num_predict: params.max_tokens,
            },
        };

        ProviderRequest {
            url: format!("{}/api/generate", self.base_url),
            headers: Vec::new(),
            body: serde_json::to_value(request).unwrap_or_default(),
        }
    }

    async fn execute(&self, request: ProviderRequest) -> ReviewResult {
        let body = send_once(&self.client, PROVIDER, request).await?;
        Self::parse_response(&body)
    }
}
