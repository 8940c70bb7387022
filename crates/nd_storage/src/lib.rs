use nd_core::{Article, ArticleStore, Error, NewArticle, Result};
use std::cmp::Reverse;
use std::sync::Arc;

pub mod backends;

pub use backends::*;

/// Orders articles by publication date, newest first; undated articles go last.
pub(crate) fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by_key(|article| Reverse(article.published_at));
}

/// Builds the article store named by `kind` ("memory" or "sqlite").
///
/// `backend_url` is only used by durable backends.
pub async fn create_storage(
    kind: &str,
    backend_url: Option<&str>,
    memory_config: MemoryConfig,
) -> Result<Arc<dyn ArticleStore>> {
    match kind {
        "memory" => {
            if backend_url.is_some() {
                tracing::warn!("Ignoring backend URL for in-memory storage");
            }
            Ok(Arc::new(MemoryStorage::with_config(memory_config)))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let url = backend_url.unwrap_or(sqlite::DEFAULT_DATABASE_URL);
            Ok(Arc::new(SqliteStorage::connect(url).await?))
        }
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => Err(Error::Storage(
            "SQLite storage is not available: build with the `sqlite` feature".to_string(),
        )),
        other => Err(Error::Storage(format!("Unknown storage backend: {}", other))),
    }
}

/// Stores articles coming from a news feed, reusing the existing record for a URL already seen.
pub async fn ingest_articles(store: &dyn ArticleStore, articles: Vec<NewArticle>) -> Result<Vec<Article>> {
    let mut stored = Vec::with_capacity(articles.len());
    let mut created = 0usize;
    for article in articles {
        match store.get_article_by_url(&article.url).await? {
            Some(existing) => stored.push(existing),
            None => {
                stored.push(store.create_article(article).await?);
                created += 1;
            }
        }
    }
    tracing::info!("Ingested {} articles ({} new)", stored.len(), created);
    Ok(stored)
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, ingest_articles};
}
