use axum::{
    routing::{get, post},
    Router,
};
use nd_core::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/news", get(handlers::list_articles).post(handlers::create_articles))
        .route("/api/news/search", get(handlers::search_articles))
        .route("/api/news/:id", get(handlers::get_article))
        .route("/api/news/:id/translate/:language", get(handlers::translate_article))
        .route("/api/news/:id/translations", post(handlers::translate_to_all))
        .route("/api/languages", get(handlers::list_languages))
        .route("/api/categories", get(handlers::list_categories))
        .route("/api/preferences", get(handlers::get_preferences))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Binds `addr` and serves the API until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🌐 Serving news API on http://{}", listener.local_addr()?);
    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
}

pub mod prelude {
    pub use crate::{create_app, serve, ApiError, AppState};
    pub use nd_core::{Article, Error, Result};
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use nd_core::{ArticleStore, InferenceModel, NewArticle};
    use nd_inference::models::fallback::FallbackModel;
    use nd_storage::MemoryStorage;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn app_with(articles: Vec<NewArticle>) -> (Router, Arc<MemoryStorage>) {
        let store = Arc::new(MemoryStorage::new());
        for article in articles {
            store.create_article(article).await.unwrap();
        }
        let model: Arc<dyn InferenceModel> = Arc::new(FallbackModel::new());
        (create_app(AppState::new(store.clone(), model)), store)
    }

    fn story(title: &str, url: &str, content: Option<&str>) -> NewArticle {
        NewArticle {
            title: title.to_string(),
            url: url.to_string(),
            content: content.map(str::to_string),
            category: Some("sports".to_string()),
            ..Default::default()
        }
    }

    async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                request = request.header("content-type", "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };
        let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_list_fills_missing_summaries() {
        let (app, store) = app_with(vec![story(
            "Cup final",
            "https://news.example/cup",
            Some("India won the match. It was historic."),
        )])
        .await;

        let (status, body) = send(app, Method::GET, "/api/news?category=general", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["summary"], "India won the match. It was historic.");
        assert_eq!(
            store.get_article(1).await.unwrap().unwrap().summary.as_deref(),
            Some("India won the match. It was historic.")
        );
    }

    #[tokio::test]
    async fn test_get_article_not_found() {
        let (app, _) = app_with(vec![]).await;

        let (status, body) = send(app, Method::GET, "/api/news/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "message": "Article not found" }));
    }

    #[tokio::test]
    async fn test_translate_route_status_mapping() {
        let (app, _) = app_with(vec![story("Cup final", "https://news.example/cup", Some("Body."))]).await;

        let (status, body) = send(app.clone(), Method::GET, "/api/news/1/translate/fr", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Unsupported language");

        let (status, _) = send(app.clone(), Method::GET, "/api/news/999/translate/ta", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(app, Method::GET, "/api/news/1/translate/ta", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "[Translation to ta would appear here]");
    }

    #[tokio::test]
    async fn test_translate_to_all_returns_every_other_language() {
        let (app, store) = app_with(vec![story("Cup final", "https://news.example/cup", Some("Body."))]).await;

        let (status, body) = send(app, Method::POST, "/api/news/1/translations", None).await;
        assert_eq!(status, StatusCode::OK);
        let languages = body.as_object().unwrap();
        assert_eq!(languages.len(), 6);
        assert!(!languages.contains_key("en"));
        assert_eq!(languages["ml"]["title"], "[Translation to ml would appear here]");
        assert_eq!(store.translation_count().await, 6);
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let (app, _) = app_with(vec![
            story("Monsoon arrives", "https://news.example/rain", None),
            story("Cup final", "https://news.example/cup", None),
        ])
        .await;

        let (status, _) = send(app.clone(), Method::GET, "/api/news/search", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(app, Method::GET, "/api/news/search?q=monsoon", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["title"], "Monsoon arrives");
    }

    #[tokio::test]
    async fn test_ingest_single_and_batch() {
        let (app, _) = app_with(vec![]).await;

        let single = json!({ "title": "Cup final", "url": "https://news.example/cup" });
        let (status, body) = send(app.clone(), Method::POST, "/api/news", Some(single)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body[0]["id"], 1);

        let batch = json!([
            { "title": "Cup final", "url": "https://news.example/cup" },
            { "title": "Monsoon arrives", "url": "https://news.example/rain", "language": "hi" }
        ]);
        let (status, body) = send(app.clone(), Method::POST, "/api/news", Some(batch)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body[0]["id"], 1);
        assert_eq!(body[1]["id"], 2);
        assert_eq!(body[1]["language"], "hi");

        let missing_url = json!({ "title": "No link", "url": "" });
        let (status, _) = send(app, Method::POST, "/api/news", Some(missing_url)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_static_listings() {
        let (app, _) = app_with(vec![]).await;

        let (_, languages) = send(app.clone(), Method::GET, "/api/languages", None).await;
        assert_eq!(languages.as_array().unwrap().len(), 7);
        assert_eq!(languages[0]["code"], "en");

        let (_, categories) = send(app.clone(), Method::GET, "/api/categories", None).await;
        assert_eq!(categories[0]["id"], "general");

        let (_, preferences) = send(app, Method::GET, "/api/preferences", None).await;
        assert_eq!(
            preferences,
            json!({ "preferredLanguage": "en", "darkMode": false, "autoPlayAudio": false })
        );
    }
}
