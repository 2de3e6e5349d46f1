//! HTTP provider clients.
//!
//! OpenAI-compatible chat completions (OpenAI, Groq), Anthropic messages and
//! Gemini generateContent. Every failure is mapped onto [`ProviderError`].

use super::profile::{ProviderConfig, ProviderType};
use super::prompt::build_prompt;
use super::ContentProvider;
use crate::error::ProviderError;
use crate::types::GenerationRequest;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Map a transport-level reqwest error.
pub(crate) fn map_http_error(error: reqwest::Error, timeout: Duration) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(timeout)
    } else if let Some(status) = error.status() {
        map_status(status, error.to_string())
    } else if error.is_connect() {
        ProviderError::Network(format!("Connection error: {}", error))
    } else if error.is_decode() {
        ProviderError::InvalidResponse(format!("Failed to decode response: {}", error))
    } else {
        ProviderError::Network(format!("HTTP error: {}", error))
    }
}

/// Map a non-success HTTP status.
pub(crate) fn map_status(status: StatusCode, body: String) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthFailed(body),
        429 => ProviderError::RateLimited(body),
        408 => ProviderError::Timeout(Duration::ZERO),
        code => ProviderError::ServerError {
            status: code,
            message: body,
        },
    }
}

fn build_provider_http_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {}", e)))
}

async fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(map_status(status, body))
}

fn require_key(id: &str, api_key: &Option<String>) -> Result<String, ProviderError> {
    api_key
        .clone()
        .ok_or_else(|| ProviderError::MissingCredentials(id.to_string()))
}

/// Settings shared by every HTTP client.
#[derive(Debug, Clone)]
struct ClientSettings {
    id: String,
    model: String,
    base_url: String,
    api_key: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl ClientSettings {
    fn from_config(id: &str, config: &ProviderConfig) -> Self {
        Self {
            id: id.to_string(),
            model: config.model.clone(),
            base_url: config.endpoint_or_default(),
            api_key: config.resolve_api_key(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.call_timeout(),
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Client for OpenAI-compatible chat completion APIs (OpenAI, Groq).
pub struct OpenAiCompatibleClient {
    client: Client,
    settings: ClientSettings,
}

impl OpenAiCompatibleClient {
    fn new(settings: ClientSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_provider_http_client(settings.timeout)?,
            settings,
        })
    }
}

#[async_trait]
impl ContentProvider for OpenAiCompatibleClient {
    fn id(&self) -> &str {
        &self.settings.id
    }

    fn check_ready(&self) -> Result<(), ProviderError> {
        require_key(&self.settings.id, &self.settings.api_key).map(|_| ())
    }

    async fn call(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let api_key = require_key(&self.settings.id, &self.settings.api_key)?;
        let prompt = build_prompt(request);
        let body = ChatCompletionRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(prompt.system),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(prompt.user),
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            stream: false,
        };

        let url = format!("{}/chat/completions", self.settings.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_http_error(e, self.settings.timeout))?;
        let response = check_status(response).await?;

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".to_string()))
    }
}

/// Anthropic messages API client.
pub struct AnthropicClient {
    client: Client,
    settings: ClientSettings,
}

impl AnthropicClient {
    fn new(settings: ClientSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_provider_http_client(settings.timeout)?,
            settings,
        })
    }
}

#[async_trait]
impl ContentProvider for AnthropicClient {
    fn id(&self) -> &str {
        &self.settings.id
    }

    fn check_ready(&self) -> Result<(), ProviderError> {
        require_key(&self.settings.id, &self.settings.api_key).map(|_| ())
    }

    async fn call(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let api_key = require_key(&self.settings.id, &self.settings.api_key)?;
        let prompt = build_prompt(request);
        let mut body = json!({
            "model": self.settings.model,
            "max_tokens": self.settings.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "system": prompt.system,
            "messages": [{ "role": "user", "content": prompt.user }],
        });
        if let Some(temp) = self.settings.temperature {
            body["temperature"] = json!(temp);
        }

        let url = format!("{}/messages", self.settings.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_http_error(e, self.settings.timeout))?;
        let response = check_status(response).await?;

        #[derive(Deserialize)]
        struct AnthropicResponse {
            content: Vec<AnthropicContent>,
        }

        #[derive(Deserialize)]
        struct AnthropicContent {
            #[serde(default)]
            text: Option<String>,
        }

        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        let text: String = completion
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect();
        if text.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "No text content in response".to_string(),
            ));
        }
        Ok(text)
    }
}

/// Gemini generateContent client.
pub struct GeminiClient {
    client: Client,
    settings: ClientSettings,
}

impl GeminiClient {
    fn new(settings: ClientSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_provider_http_client(settings.timeout)?,
            settings,
        })
    }
}

#[async_trait]
impl ContentProvider for GeminiClient {
    fn id(&self) -> &str {
        &self.settings.id
    }

    fn check_ready(&self) -> Result<(), ProviderError> {
        require_key(&self.settings.id, &self.settings.api_key).map(|_| ())
    }

    async fn call(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let api_key = require_key(&self.settings.id, &self.settings.api_key)?;
        let prompt = build_prompt(request);
        let mut generation_config = json!({});
        if let Some(temp) = self.settings.temperature {
            generation_config["temperature"] = json!(temp);
        }
        if let Some(max_tokens) = self.settings.max_tokens {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }
        let body = json!({
            "systemInstruction": { "parts": [{ "text": prompt.system }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt.user }] }],
            "generationConfig": generation_config,
        });

        let url = format!(
            "{}/models/{}:generateContent",
            self.settings.base_url, self.settings.model
        );
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_http_error(e, self.settings.timeout))?;
        let response = check_status(response).await?;

        #[derive(Deserialize)]
        struct GeminiResponse {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }

        #[derive(Deserialize)]
        struct Candidate {
            content: Option<CandidateContent>,
        }

        #[derive(Deserialize)]
        struct CandidateContent {
            #[serde(default)]
            parts: Vec<Part>,
        }

        #[derive(Deserialize)]
        struct Part {
            #[serde(default)]
            text: Option<String>,
        }

        let completion: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        completion
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("No candidates in response".to_string()))
    }
}

/// Factory for provider clients.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a client for `config`, registered under `id`.
    ///
    /// A missing API key is not an error here; the client reports it through
    /// [`ContentProvider::check_ready`] so the cascade can skip it.
    pub fn create_client(
        id: &str,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn ContentProvider>, ProviderError> {
        let settings = ClientSettings::from_config(id, config);
        let client: Arc<dyn ContentProvider> = match config.provider_type {
            ProviderType::OpenAI | ProviderType::Groq => {
                Arc::new(OpenAiCompatibleClient::new(settings)?)
            }
            ProviderType::Anthropic => Arc::new(AnthropicClient::new(settings)?),
            ProviderType::Gemini => Arc::new(GeminiClient::new(settings)?),
        };
        Ok(client)
    }
}
