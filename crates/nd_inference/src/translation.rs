use std::sync::Arc;

use futures::future::try_join_all;
use nd_core::{
    Article, ArticleId, ArticleStore, Error, InferenceModel, Language, NewTranslation, Result, TranslatedContent,
};

use crate::coalesce::Coalescer;

/// Serves article translations, reusing stored ones and only asking the model
/// for (article, language) pairs that have not been translated yet.
#[derive(Clone)]
pub struct TranslationCache {
    store: Arc<dyn ArticleStore>,
    model: Arc<dyn InferenceModel>,
    in_flight: Arc<Coalescer<(ArticleId, Language), TranslatedContent>>,
}

impl TranslationCache {
    pub fn new(store: Arc<dyn ArticleStore>, model: Arc<dyn InferenceModel>) -> Self {
        Self {
            store,
            model,
            in_flight: Arc::new(Coalescer::new()),
        }
    }

    pub async fn get_translation(&self, article_id: ArticleId, language: Language) -> Result<TranslatedContent> {
        if let Some(cached) = cached_translation(self.store.as_ref(), article_id, language).await? {
            return Ok(cached);
        }

        let article = self
            .store
            .get_article(article_id)
            .await?
            .ok_or(Error::ArticleNotFound(article_id))?;

        if article.language == language.code() {
            return Ok(TranslatedContent::from(&article));
        }

        let store = self.store.clone();
        let model = self.model.clone();
        self.in_flight
            .run((article_id, language), move || translate_article(store, model, article, language))
            .await
    }

    /// Translates an article into every supported language other than its own.
    pub async fn translate_to_all(&self, article_id: ArticleId) -> Result<Vec<(Language, TranslatedContent)>> {
        let article = self
            .store
            .get_article(article_id)
            .await?
            .ok_or(Error::ArticleNotFound(article_id))?;

        let targets: Vec<Language> = Language::ALL
            .into_iter()
            .filter(|language| language.code() != article.language)
            .collect();
        let translations = try_join_all(
            targets
                .iter()
                .map(|language| self.get_translation(article_id, *language)),
        )
        .await?;

        Ok(targets.into_iter().zip(translations).collect())
    }
}

async fn cached_translation(
    store: &dyn ArticleStore,
    article_id: ArticleId,
    language: Language,
) -> Result<Option<TranslatedContent>> {
    match store.get_translation(article_id, language.code()).await? {
        Some(translation) if translation.is_complete() => {
            tracing::debug!("Translation cache hit for article {} ({})", article_id, language);
            Ok(Some(translation.into()))
        }
        _ => Ok(None),
    }
}

async fn translate_optional(model: &dyn InferenceModel, text: Option<&str>, language: &str) -> String {
    match text {
        Some(text) => model.translate(text, language).await,
        None => String::new(),
    }
}

async fn translate_article(
    store: Arc<dyn ArticleStore>,
    model: Arc<dyn InferenceModel>,
    article: Article,
    language: Language,
) -> Result<TranslatedContent> {
    // A request that finished between our cache check and now already did the work.
    if let Some(cached) = cached_translation(store.as_ref(), article.id, language).await? {
        return Ok(cached);
    }

    tracing::debug!("Translating article {} to {}", article.id, language);
    let code = language.code();
    let summary = article.summary.as_deref().filter(|s| !s.is_empty());
    let (title, summary, content) = tokio::join!(
        model.translate(&article.title, code),
        translate_optional(model.as_ref(), summary, code),
        translate_optional(model.as_ref(), article.summarizable_content(), code),
    );

    store
        .create_translation(NewTranslation {
            article_id: article.id,
            language: code.to_string(),
            title: Some(title.clone()),
            summary: Some(summary.clone()),
            content: Some(content.clone()),
        })
        .await?;

    Ok(TranslatedContent {
        title,
        summary,
        content,
    })
}
