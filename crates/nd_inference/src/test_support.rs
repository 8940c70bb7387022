use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use nd_core::{Article, ArticleId, InferenceModel, NewArticle};

use crate::models::fallback::FallbackModel;

/// Offline model that counts how often it is asked for text.
#[derive(Default)]
pub struct CountingModel {
    inner: FallbackModel,
    delay: Option<Duration>,
    summaries: AtomicUsize,
    translations: AtomicUsize,
}

impl fmt::Debug for CountingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountingModel")
            .field("summaries", &self.summaries())
            .field("translations", &self.translations())
            .finish()
    }
}

impl CountingModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps first, so concurrent callers overlap.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn summaries(&self) -> usize {
        self.summaries.load(Ordering::SeqCst)
    }

    pub fn translations(&self) -> usize {
        self.translations.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl InferenceModel for CountingModel {
    fn name(&self) -> &str {
        "Counting"
    }

    async fn summarize(&self, content: &str, title: &str) -> String {
        self.summaries.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.inner.summarize(content, title).await
    }

    async fn translate(&self, text: &str, language: &str) -> String {
        self.translations.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.inner.translate(text, language).await
    }
}

pub fn article(id: ArticleId, language: &str, content: Option<&str>, summary: Option<&str>) -> Article {
    Article::from_new(
        id,
        NewArticle {
            title: format!("Headline {}", id),
            url: format!("https://news.example/{}", id),
            content: content.map(str::to_string),
            summary: summary.map(str::to_string),
            language: language.to_string(),
            ..Default::default()
        },
    )
}
