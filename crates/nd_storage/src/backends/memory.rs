use async_trait::async_trait;
use lru::LruCache;
use nd_core::{
    Article, ArticleId, ArticlePatch, ArticleQuery, ArticleStore, NewArticle, NewTranslation, Result,
    Translation,
};
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::sort_newest_first;

type TranslationKey = (ArticleId, String);

#[derive(Debug, Clone, Default)]
pub struct MemoryConfig {
    /// Upper bound on cached translations; least recently used ones are evicted past it.
    pub translation_capacity: Option<NonZeroUsize>,
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_translation_capacity(mut self, capacity: usize) -> Self {
        self.translation_capacity = NonZeroUsize::new(capacity);
        self
    }
}

pub struct MemoryStore {
    articles: BTreeMap<ArticleId, Article>,
    by_url: HashMap<String, ArticleId>,
    translations: LruCache<TranslationKey, Translation>,
    next_article_id: ArticleId,
    next_translation_id: i64,
}

impl MemoryStore {
    pub fn new(config: &MemoryConfig) -> Self {
        let translations = match config.translation_capacity {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };
        Self {
            articles: BTreeMap::new(),
            by_url: HashMap::new(),
            translations,
            next_article_id: 1,
            next_translation_id: 1,
        }
    }

    pub fn list_articles(&self, query: &ArticleQuery) -> Vec<Article> {
        let mut articles: Vec<Article> = self
            .articles
            .values()
            .filter(|article| query.accepts(article))
            .cloned()
            .collect();
        sort_newest_first(&mut articles);
        articles.into_iter().skip(query.offset).take(query.limit).collect()
    }

    pub fn get_article(&self, id: ArticleId) -> Option<Article> {
        self.articles.get(&id).cloned()
    }

    pub fn get_article_by_url(&self, url: &str) -> Option<Article> {
        self.by_url.get(url).and_then(|id| self.get_article(*id))
    }

    pub fn create_article(&mut self, new: NewArticle) -> Article {
        let id = self.next_article_id;
        self.next_article_id += 1;

        let article = Article::from_new(id, new);
        self.by_url.entry(article.url.clone()).or_insert(id);
        self.articles.insert(id, article.clone());
        article
    }

    /// Inserts a record with its id as given, e.g. when restoring a snapshot.
    pub fn insert_article(&mut self, article: Article) -> Article {
        self.next_article_id = self.next_article_id.max(article.id + 1);
        self.by_url.entry(article.url.clone()).or_insert(article.id);
        self.articles.insert(article.id, article.clone());
        article
    }

    pub fn update_article(&mut self, id: ArticleId, patch: ArticlePatch) -> Option<Article> {
        let article = self.articles.get_mut(&id)?;
        patch.apply(article);
        Some(article.clone())
    }

    pub fn search_articles(&self, query: &str, limit: usize, offset: usize) -> Vec<Article> {
        self.articles
            .values()
            .filter(|article| article.matches(query))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Reading a translation marks it as recently used.
    pub fn get_translation(&mut self, article_id: ArticleId, language: &str) -> Option<Translation> {
        self.translations
            .get(&(article_id, language.to_string()))
            .cloned()
    }

    pub fn create_translation(&mut self, new: NewTranslation) -> Translation {
        let id = self.next_translation_id;
        self.next_translation_id += 1;

        let key = (new.article_id, new.language.clone());
        let translation = Translation::from_new(id, new);
        if let Some((evicted, _)) = self.translations.push(key.clone(), translation.clone()) {
            if evicted != key {
                tracing::debug!("Evicted translation for article {} ({})", evicted.0, evicted.1);
            }
        }
        translation
    }

    pub fn translation_count(&self) -> usize {
        self.translations.len()
    }
}

pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::new())
    }

    pub fn with_config(config: MemoryConfig) -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::new(&config))),
        }
    }

    pub async fn insert_article(&self, article: Article) -> Article {
        self.store.write().await.insert_article(article)
    }

    pub async fn translation_count(&self) -> usize {
        self.store.read().await.translation_count()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArticleStore for MemoryStorage {
    async fn list_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>> {
        let store = self.store.read().await;
        Ok(store.list_articles(query))
    }

    async fn get_article(&self, id: ArticleId) -> Result<Option<Article>> {
        let store = self.store.read().await;
        Ok(store.get_article(id))
    }

    async fn get_article_by_url(&self, url: &str) -> Result<Option<Article>> {
        let store = self.store.read().await;
        Ok(store.get_article_by_url(url))
    }

    async fn create_article(&self, article: NewArticle) -> Result<Article> {
        let mut store = self.store.write().await;
        Ok(store.create_article(article))
    }

    async fn update_article(&self, id: ArticleId, patch: ArticlePatch) -> Result<Option<Article>> {
        let mut store = self.store.write().await;
        Ok(store.update_article(id, patch))
    }

    async fn search_articles(&self, query: &str, limit: usize, offset: usize) -> Result<Vec<Article>> {
        let store = self.store.read().await;
        Ok(store.search_articles(query, limit, offset))
    }

    async fn get_translation(&self, article_id: ArticleId, language: &str) -> Result<Option<Translation>> {
        let mut store = self.store.write().await;
        Ok(store.get_translation(article_id, language))
    }

    async fn create_translation(&self, translation: NewTranslation) -> Result<Translation> {
        let mut store = self.store.write().await;
        Ok(store.create_translation(translation))
    }
}
