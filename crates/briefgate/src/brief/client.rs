//! Perplexity chat-completions client.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::{prompt, AccountInputs, ApiMeta, Brief};
use crate::config::{ApiConfig, Config};
use crate::error::{Error, Result};

/// Something that can produce a brief for an account.
#[async_trait]
pub trait BriefProvider: Send + Sync {
    /// Research `inputs` with `model` and return the brief.
    async fn generate(&self, inputs: &AccountInputs, model: &str) -> Result<Brief>;
}

/// Client for the Perplexity chat completions endpoint.
#[derive(Debug, Clone)]
pub struct PerplexityClient {
    http: reqwest::Client,
    api_key: String,
    settings: ApiConfig,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct WebSearchOptions<'a> {
    search_context_size: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    search_recency_filter: &'a str,
    web_search_options: WebSearchOptions<'a>,
    return_related_questions: bool,
    return_images: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: Option<String>,
    created: Option<i64>,
    #[serde(default)]
    usage: Value,
    #[serde(default)]
    search_results: Vec<Value>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

impl PerplexityClient {
    /// Create a client with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: ApiConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            settings,
        })
    }

    /// Create a client from the application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSecret`] if no API key is configured, or an
    /// error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.secrets.api_key()?;
        Self::new(config.api.clone(), api_key)
    }

    fn request_body(&self, inputs: &AccountInputs, model: &str) -> Result<Value> {
        let user = prompt::user_prompt(inputs);
        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt::system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            search_recency_filter: &self.settings.search_recency,
            web_search_options: WebSearchOptions {
                search_context_size: &self.settings.search_context_size,
            },
            return_related_questions: false,
            return_images: false,
        };
        Ok(serde_json::to_value(request)?)
    }
}

#[async_trait]
impl BriefProvider for PerplexityClient {
    #[instrument(name = "perplexity_brief", skip(self, inputs), fields(company = %inputs.company))]
    async fn generate(&self, inputs: &AccountInputs, model: &str) -> Result<Brief> {
        let body = self.request_body(inputs, model)?;
        info!(endpoint = %self.settings.endpoint, model, "Requesting brief");

        let response = self
            .http
            .post(&self.settings.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), bytes = text.len(), "Brief API responded");

        if status != StatusCode::OK {
            return Err(Error::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_completion(&text)
    }
}

/// Decode a chat-completions response body into a brief.
///
/// The first choice's message content must be a JSON brief, optionally
/// wrapped in a markdown code fence. Response metadata is attached as
/// [`Brief::api_meta`].
///
/// # Errors
///
/// Returns [`Error::ApiResponse`] if the body has no choices or the content
/// is not a JSON object.
pub fn parse_completion(body: &str) -> Result<Brief> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| Error::ApiResponse(format!("response is not valid JSON: {e}")))?;

    let content = response
        .choices
        .first()
        .map(|choice| choice.message.content.as_str())
        .ok_or_else(|| Error::ApiResponse("response has no choices".to_string()))?;

    let content = strip_code_fence(content);
    let value: Value = serde_json::from_str(content)
        .map_err(|e| Error::ApiResponse(format!("brief is not valid JSON: {e}")))?;
    if !value.is_object() {
        return Err(Error::ApiResponse("brief is not a JSON object".to_string()));
    }

    let mut brief: Brief = serde_json::from_value(value)
        .map_err(|e| Error::ApiResponse(format!("brief has an unexpected shape: {e}")))?;
    brief.api_meta = Some(ApiMeta {
        model: response.model,
        created: response.created,
        usage: response.usage,
        search_results: response.search_results,
    });
    Ok(brief)
}

/// Remove a surrounding ```` ``` ```` / ```` ```json ```` fence, if any.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
