use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::adapters::llm::{
    send_once, GenerationParams, LLMAdapter, ProviderRequest, ReviewError, ReviewResult,
};

const PROVIDER: &str = "OpenAI";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAIAdapter {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
    /// Legacy completions return plain text instead of a message.
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAIAdapter {
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

    fn parse_response(body: &str) -> ReviewResult {
        let response: OpenAIResponse = serde_json::from_str(body).map_err(|e| {
            ReviewError::provider(PROVIDER, format!("failed to parse response: {}", e))
        })?;

        let Some(choice) = response.choices.into_iter().next() else {
            return Err(ReviewError::no_response(PROVIDER, body));
        };

        let text = choice
            .message
            .and_then(|m| m.content)
            .or(choice.text)
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(ReviewError::no_response(PROVIDER, body));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl LLMAdapter for OpenAIAdapter {
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    fn prepare_request(&self, prompt: &str, params: &GenerationParams) -> ProviderRequest {
        let request = OpenAIRequest {
            model: &params.model,
            messages: vec![Message {
                role: "system",
                content: prompt,
            }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        ProviderRequest {
            url: format!("{}/chat/completions", self.base_url),
            headers: vec![("Authorization", format!("Bearer {}", self.api_key))],
            body: serde_json::to_value(request).unwrap_or_default(),
        }
    }

    async fn execute(&self, request: ProviderRequest) -> ReviewResult {
        let body = send_once(&self.client, PROVIDER, request).await?;
        Self::parse_response(&body)
    }
}
