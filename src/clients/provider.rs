use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";
pub const DEFAULT_MODEL: &str = "sonar";

const SYSTEM_PROMPT: &str = "You are a helpful search assistant. Provide clear, concise, and accurate answers based on web search results. Format your response in markdown for readability.";

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Non-2xx answer from the provider. The body text is preserved so the
    /// caller can surface what the provider actually said.
    #[error("Provider API error: {status} - {body}")]
    Upstream { status: u16, body: String },

    #[error("Provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    return_citations: bool,
    return_images: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    /// URLs cited by the answer, in citation order. Absent on models that
    /// do not cite.
    #[serde(default)]
    pub citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    pub content: Option<String>,
}

impl ChatResponse {
    /// The answer text, or a fixed placeholder when the provider returned
    /// no usable message.
    #[must_use]
    pub fn answer(&self) -> String {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_else(|| "No response received".to_string())
    }
}

/// Client for a Perplexity-style chat-completions endpoint.
///
/// The base URL is configurable so tests can point it at a local stub.
#[derive(Clone)]
pub struct ProviderClient {
    client: Client,
    base_url: String,
    model: String,
}

impl ProviderClient {
    #[must_use]
    pub fn new(client: Client, base_url: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// One best-effort round trip: no retries, no policy beyond the shared
    /// client's defaults.
    pub async fn chat_completion(
        &self,
        api_key: &str,
        query: &str,
    ) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: query,
                },
            ],
            return_citations: true,
            return_images: false,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream { status, body });
        }

        Ok(response.json().await?)
    }
}
