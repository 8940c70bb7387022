use std::fmt;

use async_trait::async_trait;
use nd_core::{language_name, Error, InferenceModel, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::fallback::{fallback_summary, placeholder_translation};
use crate::rate_limiter::RateLimiter;
use crate::Config;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama3-70b-8192";

const SUMMARY_INSTRUCTION: &str =
    "You are a concise news summarizer. Create a 2-3 sentence summary that captures the key points of the article.";
const SUMMARY_UNAVAILABLE: &str = "Summary unavailable.";

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

fn chat_endpoint(base_url: &str) -> Result<Url> {
    let mut base = Url::parse(base_url)
        .map_err(|e| Error::Inference(format!("Invalid API base URL {}: {}", base_url, e)))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("chat/completions")
        .map_err(|e| Error::Inference(format!("Invalid API base URL {}: {}", base_url, e)))
}

/// Chat-completion client for Groq's OpenAI-compatible API.
///
/// Every request goes through a shared [`RateLimiter`]. Without an API key, or
/// when a request fails, the local heuristics are used instead.
pub struct GroqModel {
    client: Client,
    api_key: Option<String>,
    endpoint: Url,
    model: String,
    limiter: RateLimiter,
    max_summary_tokens: u32,
    temperature: f32,
}

impl fmt::Debug for GroqModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroqModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .field("limiter", &self.limiter)
            .finish()
    }
}

impl GroqModel {
    /// Must be called from within a Tokio runtime, which hosts the rate limiter.
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.api_key.clone().filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!("No API key configured, summaries and translations use local fallbacks");
        }

        Ok(Self {
            client: Client::new(),
            api_key,
            endpoint: chat_endpoint(&config.base_url)?,
            model: config.model_name.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            limiter: RateLimiter::with_timeout(config.requests_per_minute, config.request_timeout),
            max_summary_tokens: config.max_summary_tokens,
            temperature: config.temperature,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn request(&self, instruction: String, content: String, max_tokens: Option<u32>) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instruction,
                },
                ChatMessage {
                    role: "user",
                    content,
                },
            ],
            max_tokens,
            temperature: self.temperature,
        }
    }

    /// Sends one completion request through the rate limiter. `Ok(None)` means the
    /// model answered with empty content.
    async fn complete(&self, api_key: &str, request: ChatRequest) -> Result<Option<String>> {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let api_key = api_key.to_string();

        self.limiter
            .execute(move || async move {
                let response = client
                    .post(endpoint)
                    .bearer_auth(api_key)
                    .json(&request)
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    return Err(Error::Inference(format!("Groq API responded with status: {}", status)));
                }

                let body = response.json::<ChatResponse>().await?;
                let choice = body
                    .choices
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::Inference("Groq API returned no choices".to_string()))?;
                Ok(choice.message.content.filter(|c| !c.is_empty()))
            })
            .await
    }
}

#[async_trait]
impl InferenceModel for GroqModel {
    fn name(&self) -> &str {
        "Groq"
    }

    async fn summarize(&self, content: &str, title: &str) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return fallback_summary(content);
        };

        let request = self.request(
            SUMMARY_INSTRUCTION.to_string(),
            format!("Title: {}\n\nContent: {}", title, content),
            Some(self.max_summary_tokens),
        );
        match self.complete(api_key, request).await {
            Ok(Some(summary)) => summary,
            Ok(None) => SUMMARY_UNAVAILABLE.to_string(),
            Err(e) => {
                tracing::warn!("Error generating summary with Groq, using fallback: {}", e);
                fallback_summary(content)
            }
        }
    }

    async fn translate(&self, text: &str, language: &str) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return placeholder_translation(language);
        };

        let request = self.request(
            format!(
                "You are a translator. Translate the provided text accurately to {}.",
                language_name(language)
            ),
            text.to_string(),
            None,
        );
        match self.complete(api_key, request).await {
            Ok(Some(translated)) => translated,
            Ok(None) => text.to_string(),
            Err(e) => {
                tracing::warn!("Error translating text to {}, keeping original: {}", language, e);
                text.to_string()
            }
        }
    }
}
