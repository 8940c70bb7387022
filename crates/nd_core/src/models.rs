use std::fmt;

use async_trait::async_trait;

/// Text generation used by the summary and translation layers.
///
/// Implementations never fail: when the backing model is unavailable they
/// degrade to local text instead of surfacing an error.
#[async_trait]
pub trait InferenceModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Summarize an article body in a few sentences
    async fn summarize(&self, content: &str, title: &str) -> String;

    /// Translate text into the language identified by `language` (a language code)
    async fn translate(&self, text: &str, language: &str) -> String;
}
