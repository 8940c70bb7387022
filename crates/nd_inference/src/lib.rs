use std::fmt;
use std::time::Duration;

pub mod coalesce;
pub mod models;
pub mod rate_limiter;
pub mod summary;
pub mod translation;

#[cfg(test)]
mod test_support;

pub use coalesce::Coalescer;
pub use models::create_model;
pub use rate_limiter::RateLimiter;
pub use summary::SummaryEnricher;
pub use translation::TranslationCache;

#[derive(Clone)]
pub struct Config {
    /// Credential for the completion API. Without it every call uses the local fallbacks.
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub base_url: String,
    pub requests_per_minute: u32,
    /// Upper bound on a single API call, including its wait for the response body.
    pub request_timeout: Option<Duration>,
    pub max_summary_tokens: u32,
    pub temperature: f32,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .field("requests_per_minute", &self.requests_per_minute)
            .field("request_timeout", &self.request_timeout)
            .field("max_summary_tokens", &self.max_summary_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model_name: None,
            base_url: models::groq::DEFAULT_BASE_URL.to_string(),
            requests_per_minute: 30,
            request_timeout: Some(Duration::from_secs(30)),
            max_summary_tokens: 150,
            temperature: 0.3,
        }
    }
}

pub mod prelude {
    pub use super::models::create_model;
    pub use super::{Config, SummaryEnricher, TranslationCache};
    pub use nd_core::{Article, Error, InferenceModel, Language, Result, TranslatedContent};
}
