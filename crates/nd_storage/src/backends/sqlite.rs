use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nd_core::{
    Article, ArticleId, ArticlePatch, ArticleQuery, ArticleStore, Error, NewArticle, NewTranslation, Result,
    Translation,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:articles.db";

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT,
        content TEXT,
        summary TEXT,
        url TEXT NOT NULL,
        url_to_image TEXT,
        published_at TEXT,
        source TEXT,
        source_id TEXT,
        category TEXT,
        language TEXT NOT NULL DEFAULT 'en'
    )
    "#,
    "CREATE INDEX IF NOT EXISTS articles_url ON articles (url)",
    r#"
    CREATE TABLE IF NOT EXISTS translations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        article_id INTEGER NOT NULL,
        language TEXT NOT NULL,
        title TEXT,
        summary TEXT,
        content TEXT,
        UNIQUE (article_id, language)
    )
    "#,
];

fn storage_error(context: &'static str) -> impl Fn(sqlx::Error) -> Error {
    move |e| Error::Storage(format!("{}: {}", context, e))
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
        .map(|v| v.with_timezone(&Utc))
}

fn article_from_row(row: &SqliteRow) -> Result<Article> {
    let map = storage_error("Failed to decode article");
    Ok(Article {
        id: row.try_get("id").map_err(&map)?,
        title: row.try_get("title").map_err(&map)?,
        description: row.try_get("description").map_err(&map)?,
        content: row.try_get("content").map_err(&map)?,
        summary: row.try_get("summary").map_err(&map)?,
        url: row.try_get("url").map_err(&map)?,
        url_to_image: row.try_get("url_to_image").map_err(&map)?,
        published_at: parse_timestamp(row.try_get("published_at").map_err(&map)?),
        source: row.try_get("source").map_err(&map)?,
        source_id: row.try_get("source_id").map_err(&map)?,
        category: row.try_get("category").map_err(&map)?,
        language: row.try_get("language").map_err(&map)?,
    })
}

fn translation_from_row(row: &SqliteRow) -> Result<Translation> {
    let map = storage_error("Failed to decode translation");
    Ok(Translation {
        id: row.try_get("id").map_err(&map)?,
        article_id: row.try_get("article_id").map_err(&map)?,
        language: row.try_get("language").map_err(&map)?,
        title: row.try_get("title").map_err(&map)?,
        summary: row.try_get("summary").map_err(&map)?,
        content: row.try_get("content").map_err(&map)?,
    })
}

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Connects to (creating if needed) the database at `url` and runs migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(storage_error("Invalid database URL"))?
            .create_if_missing(true);
        // Every pooled connection to `:memory:` would get its own database.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(storage_error("Failed to connect to database"))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("Failed to run migration {}: {}", i, e)))?;
        }

        tracing::info!("Connected to SQLite database at {}", url);
        Ok(Self { pool })
    }

    async fn fetch_article(&self, id: ArticleId) -> Result<Option<Article>> {
        let row = sqlx::query("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("Failed to load article"))?;
        row.as_ref().map(article_from_row).transpose()
    }
}

#[async_trait]
impl ArticleStore for SqliteStorage {
    async fn list_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM articles
            WHERE language = ?1 AND (?2 IS NULL OR category = ?2)
            ORDER BY published_at IS NULL, published_at DESC, id
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(&query.language)
        .bind(query.category_filter())
        .bind(query.limit as i64)
        .bind(query.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("Failed to list articles"))?;

        rows.iter().map(article_from_row).collect()
    }

    async fn get_article(&self, id: ArticleId) -> Result<Option<Article>> {
        self.fetch_article(id).await
    }

    async fn get_article_by_url(&self, url: &str) -> Result<Option<Article>> {
        let row = sqlx::query("SELECT * FROM articles WHERE url = ? ORDER BY id LIMIT 1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("Failed to load article"))?;
        row.as_ref().map(article_from_row).transpose()
    }

    async fn create_article(&self, article: NewArticle) -> Result<Article> {
        let article = article.normalized();
        let result = sqlx::query(
            r#"
            INSERT INTO articles
            (title, description, content, summary, url, url_to_image, published_at, source, source_id, category, language)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.title)
        .bind(article.description.as_deref())
        .bind(article.content.as_deref())
        .bind(article.summary.as_deref())
        .bind(&article.url)
        .bind(article.url_to_image.as_deref())
        .bind(article.published_at.map(|t| t.to_rfc3339()))
        .bind(article.source.as_deref())
        .bind(article.source_id.as_deref())
        .bind(article.category.as_deref())
        .bind(&article.language)
        .execute(&self.pool)
        .await
        .map_err(storage_error("Failed to store article"))?;

        Ok(Article::from_new(result.last_insert_rowid(), article))
    }

    async fn update_article(&self, id: ArticleId, patch: ArticlePatch) -> Result<Option<Article>> {
        let Some(mut article) = self.fetch_article(id).await? else {
            return Ok(None);
        };
        patch.apply(&mut article);

        sqlx::query(
            r#"
            UPDATE articles
            SET summary = ?, description = ?, content = ?, category = ?, url_to_image = ?
            WHERE id = ?
            "#,
        )
        .bind(article.summary.as_deref())
        .bind(article.description.as_deref())
        .bind(article.content.as_deref())
        .bind(article.category.as_deref())
        .bind(article.url_to_image.as_deref())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(storage_error("Failed to update article"))?;

        Ok(Some(article))
    }

    async fn search_articles(&self, query: &str, limit: usize, offset: usize) -> Result<Vec<Article>> {
        // SQLite's lower() only folds ASCII, so matching happens on decoded rows.
        let rows = sqlx::query("SELECT * FROM articles ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error("Failed to search articles"))?;

        let mut found = Vec::new();
        for row in &rows {
            let article = article_from_row(row)?;
            if article.matches(query) {
                found.push(article);
            }
        }
        Ok(found.into_iter().skip(offset).take(limit).collect())
    }

    async fn get_translation(&self, article_id: ArticleId, language: &str) -> Result<Option<Translation>> {
        let row = sqlx::query("SELECT * FROM translations WHERE article_id = ? AND language = ?")
            .bind(article_id)
            .bind(language)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("Failed to load translation"))?;
        row.as_ref().map(translation_from_row).transpose()
    }

    async fn create_translation(&self, translation: NewTranslation) -> Result<Translation> {
        let translation = Translation::from_new(0, translation);
        let result = sqlx::query(
            r#"
            INSERT OR REPLACE INTO translations (article_id, language, title, summary, content)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(translation.article_id)
        .bind(&translation.language)
        .bind(translation.title.as_deref())
        .bind(translation.summary.as_deref())
        .bind(translation.content.as_deref())
        .execute(&self.pool)
        .await
        .map_err(storage_error("Failed to store translation"))?;

        Ok(Translation {
            id: result.last_insert_rowid(),
            ..translation
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    async fn storage(dir: &tempfile::TempDir) -> SqliteStorage {
        let url = format!("sqlite:{}", dir.path().join("articles.db").display());
        SqliteStorage::connect(&url).await.unwrap()
    }

    #[tokio::test]
    async fn test_sqlite_storage() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let article = storage
            .create_article(NewArticle {
                title: "Budget session opens".to_string(),
                url: "http://test.com".to_string(),
                content: Some("Parliament met today.".to_string()),
                summary: Some(String::new()),
                category: Some("business".to_string()),
                published_at: Some(Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(article.summary, None);

        let loaded = storage.get_article(article.id).await.unwrap().unwrap();
        assert_eq!(loaded, article);
        assert_eq!(storage.get_article_by_url("http://test.com").await.unwrap(), Some(article.clone()));

        let updated = storage
            .update_article(article.id, ArticlePatch::summary("Parliament met."))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.summary.as_deref(), Some("Parliament met."));
        assert!(storage.update_article(999, ArticlePatch::default()).await.unwrap().is_none());

        let listed = storage
            .list_articles(&ArticleQuery {
                category: Some("business".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(listed, vec![updated]);
        assert_eq!(storage.search_articles("PARLIAMENT", 20, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_translations_survive_reconnect() {
        let dir = tempdir().unwrap();
        {
            let storage = storage(&dir).await;
            let first = NewTranslation {
                article_id: 3,
                language: "ta".to_string(),
                title: Some("first".to_string()),
                summary: Some("s".to_string()),
                content: None,
            };
            storage.create_translation(first.clone()).await.unwrap();
            storage
                .create_translation(NewTranslation {
                    title: Some("second".to_string()),
                    ..first
                })
                .await
                .unwrap();
        }

        let storage = storage(&dir).await;
        let stored = storage.get_translation(3, "ta").await.unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("second"));
        assert_eq!(stored.content, None);
        assert!(storage.get_translation(3, "hi").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii_case() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;
        storage
            .create_article(NewArticle {
                title: "Élection présidentielle".to_string(),
                url: "http://fr".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        storage
            .create_article(NewArticle {
                title: "Budget session".to_string(),
                url: "http://en".to_string(),
                content: Some("ÉLECTION year spending".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let hits = storage.search_articles("ÉLECTION", 20, 0).await.unwrap();
        let urls: Vec<&str> = hits.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["http://fr", "http://en"]);
        assert_eq!(storage.search_articles("élection", 1, 1).await.unwrap()[0].url, "http://en");
    }
}
