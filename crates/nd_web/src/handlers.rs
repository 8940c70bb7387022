use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use nd_core::{Article, ArticleId, ArticleQuery, Category, Language, NewArticle, TranslatedContent};
use nd_storage::ingest_articles;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

const DEFAULT_SEARCH_LIMIT: usize = 20;

#[derive(Debug, Default, Deserialize)]
pub struct NewsParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub category: Option<String>,
    pub language: Option<String>,
}

impl From<NewsParams> for ArticleQuery {
    fn from(params: NewsParams) -> Self {
        let defaults = ArticleQuery::default();
        ArticleQuery {
            limit: params.limit.unwrap_or(defaults.limit),
            offset: params.offset.unwrap_or(defaults.offset),
            category: params.category,
            language: params
                .language
                .filter(|language| !language.is_empty())
                .unwrap_or(defaults.language),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Body of `POST /api/news`: a single article or a batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IngestBody {
    Many(Vec<NewArticle>),
    One(NewArticle),
}

impl IngestBody {
    pub fn into_articles(self) -> Vec<NewArticle> {
        match self {
            IngestBody::Many(articles) => articles,
            IngestBody::One(article) => vec![article],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CategoryInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub preferred_language: &'static str,
    pub dark_mode: bool,
    pub auto_play_audio: bool,
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NewsParams>,
) -> ApiResult<Json<Vec<Article>>> {
    let articles = state.store.list_articles(&params.into()).await?;
    Ok(Json(state.summaries.ensure_summaries(articles).await?))
}

pub async fn create_articles(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IngestBody>,
) -> ApiResult<(StatusCode, Json<Vec<Article>>)> {
    let articles = body.into_articles();
    if articles
        .iter()
        .any(|article| article.title.trim().is_empty() || article.url.trim().is_empty())
    {
        return Err(ApiError::BadRequest("Article title and url are required".to_string()));
    }
    let stored = ingest_articles(state.store.as_ref(), articles).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn search_articles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Article>>> {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Search query is required".to_string()));
    }
    let articles = state
        .store
        .search_articles(
            query,
            params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
            params.offset.unwrap_or_default(),
        )
        .await?;
    Ok(Json(articles))
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ArticleId>,
) -> ApiResult<Json<Article>> {
    let article = state
        .store
        .get_article(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Article not found".to_string()))?;
    Ok(Json(state.summaries.ensure_summary(article).await?))
}

pub async fn translate_article(
    State(state): State<Arc<AppState>>,
    Path((id, language)): Path<(ArticleId, String)>,
) -> ApiResult<Json<TranslatedContent>> {
    let language: Language = language.parse()?;
    Ok(Json(state.translations.get_translation(id, language).await?))
}

pub async fn translate_to_all(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ArticleId>,
) -> ApiResult<Json<Map<String, Value>>> {
    let translations = state.translations.translate_to_all(id).await?;
    let mut body = Map::new();
    for (language, content) in translations {
        let content = serde_json::to_value(content).map_err(|e| ApiError::Internal(e.into()))?;
        body.insert(language.code().to_string(), content);
    }
    Ok(Json(body))
}

pub async fn list_languages() -> Json<Vec<LanguageInfo>> {
    Json(
        Language::ALL
            .into_iter()
            .map(|language| LanguageInfo {
                code: language.code(),
                name: language.label(),
            })
            .collect(),
    )
}

pub async fn list_categories() -> Json<Vec<CategoryInfo>> {
    Json(
        Category::ALL
            .into_iter()
            .map(|category| CategoryInfo {
                id: category.id(),
                name: category.name(),
                icon: category.icon(),
            })
            .collect(),
    )
}

pub async fn get_preferences() -> Json<Preferences> {
    Json(Preferences {
        preferred_language: nd_core::types::DEFAULT_LANGUAGE,
        dark_mode: false,
        auto_play_audio: false,
    })
}
