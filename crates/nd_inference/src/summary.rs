use std::sync::Arc;

use futures::future::try_join_all;
use nd_core::types::non_empty;
use nd_core::{Article, ArticleId, ArticlePatch, ArticleStore, InferenceModel, Result};

use crate::coalesce::Coalescer;

/// Makes sure articles handed to readers carry a summary, generating and
/// persisting it the first time an article without one is served.
#[derive(Clone)]
pub struct SummaryEnricher {
    store: Arc<dyn ArticleStore>,
    model: Arc<dyn InferenceModel>,
    in_flight: Arc<Coalescer<ArticleId, Article>>,
}

impl SummaryEnricher {
    pub fn new(store: Arc<dyn ArticleStore>, model: Arc<dyn InferenceModel>) -> Self {
        Self {
            store,
            model,
            in_flight: Arc::new(Coalescer::new()),
        }
    }

    pub async fn ensure_summary(&self, article: Article) -> Result<Article> {
        if article.has_summary() {
            return Ok(article);
        }

        let store = self.store.clone();
        let model = self.model.clone();
        self.in_flight
            .run(article.id, move || summarize_article(store, model, article))
            .await
    }

    /// Runs [`SummaryEnricher::ensure_summary`] over a listing, keeping its order.
    pub async fn ensure_summaries(&self, articles: Vec<Article>) -> Result<Vec<Article>> {
        try_join_all(articles.into_iter().map(|article| self.ensure_summary(article))).await
    }
}

async fn summarize_article(
    store: Arc<dyn ArticleStore>,
    model: Arc<dyn InferenceModel>,
    article: Article,
) -> Result<Article> {
    // The caller's copy may predate a summary persisted by an earlier request.
    let current = store.get_article(article.id).await?.unwrap_or(article);
    if current.has_summary() {
        return Ok(current);
    }
    let Some(content) = current.summarizable_content() else {
        return Ok(current);
    };

    tracing::debug!("Generating summary for article {}", current.id);
    let summary = model.summarize(content, &current.title).await;

    match store
        .update_article(current.id, ArticlePatch::summary(summary.clone()))
        .await?
    {
        Some(updated) => Ok(updated),
        None => {
            tracing::warn!("Article {} disappeared before its summary was stored", current.id);
            Ok(Article {
                summary: non_empty(Some(summary)),
                ..current
            })
        }
    }
}
