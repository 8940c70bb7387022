use async_trait::async_trait;

use crate::types::{Article, ArticleId, ArticlePatch, ArticleQuery, NewArticle, NewTranslation, Translation};
use crate::Result;

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// List articles matching the query, newest first
    async fn list_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>>;

    async fn get_article(&self, id: ArticleId) -> Result<Option<Article>>;

    async fn get_article_by_url(&self, url: &str) -> Result<Option<Article>>;

    async fn create_article(&self, article: NewArticle) -> Result<Article>;

    /// Apply a partial update, returning the updated record if the article exists
    async fn update_article(&self, id: ArticleId, patch: ArticlePatch) -> Result<Option<Article>>;

    /// Case-insensitive substring search over title, description and content
    async fn search_articles(&self, query: &str, limit: usize, offset: usize) -> Result<Vec<Article>>;

    async fn get_translation(&self, article_id: ArticleId, language: &str) -> Result<Option<Translation>>;

    /// Store a translation, replacing any previous one for the same (article, language)
    async fn create_translation(&self, translation: NewTranslation) -> Result<Translation>;
}
