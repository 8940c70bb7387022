use anyhow::Context;
use clap::Parser;
use nd_core::{Article, ArticleStore, InferenceModel, Language, NewArticle, Result, TranslatedContent};
use nd_inference::{SummaryEnricher, TranslationCache};
use nd_storage::{ingest_articles, MemoryConfig};
use nd_web::handlers::IngestBody;
use nd_web::AppState;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// A duration written like `30s`, `2m`, `1h15m` or `500ms`. A bare number is seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total = Duration::ZERO;
        let mut number = String::new();
        let mut chars = s.trim().chars().peekable();
        let mut seen_number = false;

        while let Some(c) = chars.next() {
            if c.is_ascii_digit() {
                number.push(c);
                seen_number = true;
                continue;
            }
            let value: u64 = number
                .parse()
                .map_err(|_| format!("Expected a number before '{}' in duration", c))?;
            number.clear();
            let part = match c {
                'm' if chars.peek() == Some(&'s') => {
                    chars.next();
                    Some(Duration::from_millis(value))
                }
                's' => Some(Duration::from_secs(value)),
                'm' => value.checked_mul(60).map(Duration::from_secs),
                'h' => value.checked_mul(3600).map(Duration::from_secs),
                _ => return Err(format!("Invalid duration unit: {}", c)),
            };
            total = part
                .and_then(|part| total.checked_add(part))
                .ok_or_else(|| format!("Duration is too large: {}", s))?;
        }

        if !number.is_empty() {
            let value: u64 = number.parse().map_err(|_| format!("Duration is too large: {}", s))?;
            total = total
                .checked_add(Duration::from_secs(value))
                .ok_or_else(|| format!("Duration is too large: {}", s))?;
        }
        if !seen_number {
            return Err("Duration must include a number".to_string());
        }

        Ok(HumanDuration(total))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "News digest: article summaries and translations", long_about = None)]
pub struct Cli {
    /// Article store backend: memory or sqlite
    #[arg(long, env = "ND_STORAGE", default_value = "memory", global = true)]
    storage: String,
    /// Database URL or path for durable storage backends
    #[arg(long, env = "ND_BACKEND_URL", global = true)]
    backend_url: Option<String>,
    /// API key for the completion service; without it the offline fallbacks are used
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,
    /// Completion model name, or "fallback" for the offline model
    #[arg(long, env = "ND_MODEL", default_value = nd_inference::models::groq::DEFAULT_MODEL, global = true)]
    model: String,
    /// Base URL of the OpenAI-compatible completion API
    #[arg(long, env = "ND_BASE_URL", global = true)]
    base_url: Option<String>,
    #[arg(long, env = "ND_REQUESTS_PER_MINUTE", default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..), global = true)]
    requests_per_minute: u32,
    /// Upper bound on a single completion call (e.g. 30s, 1m); 0 disables it
    #[arg(long, env = "ND_REQUEST_TIMEOUT", default_value = "30s", global = true)]
    request_timeout: HumanDuration,
    /// Maximum number of translations kept by the in-memory store
    #[arg(long, env = "ND_TRANSLATION_CAPACITY", global = true)]
    translation_capacity: Option<usize>,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the news API over HTTP
    Serve {
        #[arg(long, default_value = "0.0.0.0:5000")]
        addr: SocketAddr,
        /// JSON file with articles to load before serving
        #[arg(long)]
        seed: Option<PathBuf>,
    },
    /// Ingest articles from a JSON file and print them with summaries
    Summarize {
        #[arg(long)]
        input: PathBuf,
    },
    /// Ingest articles from a JSON file and print their translations
    Translate {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        language: Language,
    },
}

impl Cli {
    fn inference_config(&self) -> nd_inference::Config {
        let defaults = nd_inference::Config::default();
        nd_inference::Config {
            api_key: self.api_key.clone(),
            model_name: Some(self.model.clone()),
            base_url: self.base_url.clone().unwrap_or(defaults.base_url),
            requests_per_minute: self.requests_per_minute,
            request_timeout: Some(self.request_timeout.0).filter(|timeout| !timeout.is_zero()),
            ..defaults
        }
    }

    fn memory_config(&self) -> MemoryConfig {
        match self.translation_capacity {
            Some(capacity) => MemoryConfig::new().with_translation_capacity(capacity),
            None => MemoryConfig::new(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslatedArticle {
    id: i64,
    language: Language,
    #[serde(flatten)]
    content: TranslatedContent,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn read_articles(path: &Path) -> Result<Vec<NewArticle>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read articles from {}", path.display()))?;
    let body: IngestBody = serde_json::from_str(&raw)?;
    Ok(body.into_articles())
}

async fn load_summarized(
    store: &Arc<dyn ArticleStore>,
    model: &Arc<dyn InferenceModel>,
    input: &Path,
) -> Result<Vec<Article>> {
    let articles = ingest_articles(store.as_ref(), read_articles(input).await?).await?;
    SummaryEnricher::new(store.clone(), model.clone())
        .ensure_summaries(articles)
        .await
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store = nd_storage::create_storage(&cli.storage, cli.backend_url.as_deref(), cli.memory_config()).await?;
    info!("💾 Storage initialized (using {})", cli.storage);

    let model = nd_inference::create_model(Some(cli.inference_config())).await?;

    match cli.command {
        Commands::Serve { addr, seed } => {
            if let Some(seed) = seed {
                let articles = ingest_articles(store.as_ref(), read_articles(&seed).await?).await?;
                info!("🌱 Seeded {} articles from {}", articles.len(), seed.display());
            }
            nd_web::serve(addr, AppState::new(store, model)).await?;
        }
        Commands::Summarize { input } => {
            let articles = load_summarized(&store, &model, &input).await?;
            print_json(&articles)?;
        }
        Commands::Translate { input, language } => {
            let articles = load_summarized(&store, &model, &input).await?;
            let translations = TranslationCache::new(store.clone(), model.clone());
            let mut translated = Vec::with_capacity(articles.len());
            for article in &articles {
                translated.push(TranslatedArticle {
                    id: article.id,
                    language,
                    content: translations.get_translation(article.id, language).await?,
                });
            }
            info!("🌍 Translated {} articles to {}", translated.len(), language.name());
            print_json(&translated)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_duration() {
        let parse = |s: &str| s.parse::<HumanDuration>().map(|d| d.0);
        assert_eq!(parse("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse("1h15m30s"), Ok(Duration::from_secs(4530)));
        assert_eq!(parse("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse("45"), Ok(Duration::from_secs(45)));
        assert_eq!(parse("0"), Ok(Duration::ZERO));
        assert!(parse("").is_err());
        assert!(parse("s").is_err());
        assert!(parse("10x").is_err());
        assert!(parse("18446744073709551615h").is_err());
        assert!(parse("18446744073709551615s1s").is_err());
        assert!(parse("99999999999999999999").is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["nd", "summarize", "--input", "articles.json"]).unwrap();
        assert_eq!(cli.storage, "memory");
        assert_eq!(cli.requests_per_minute, 30);

        let config = cli.inference_config();
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.model_name.as_deref(), Some("llama3-70b-8192"));
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "nd",
            "translate",
            "--input",
            "articles.json",
            "--language",
            "ta",
            "--model",
            "fallback",
            "--request-timeout",
            "0",
            "--translation-capacity",
            "64",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Translate { language: Language::Ta, .. }));
        assert_eq!(cli.inference_config().request_timeout, None);
        assert_eq!(cli.memory_config().translation_capacity.map(|c| c.get()), Some(64));
    }

    #[test]
    fn test_cli_rejects_bad_values() {
        assert!(Cli::try_parse_from(["nd", "translate", "--input", "a.json", "--language", "fr"]).is_err());
        assert!(Cli::try_parse_from(["nd", "--requests-per-minute", "0", "summarize", "--input", "a.json"]).is_err());
    }

    #[tokio::test]
    async fn test_read_articles_accepts_object_or_array() {
        let dir = tempfile::tempdir().unwrap();

        let single = dir.path().join("single.json");
        tokio::fs::write(&single, r#"{"title":"Cup final","url":"https://news.example/cup"}"#)
            .await
            .unwrap();
        assert_eq!(read_articles(&single).await.unwrap().len(), 1);

        let batch = dir.path().join("batch.json");
        tokio::fs::write(
            &batch,
            r#"[{"title":"a","url":"https://news.example/a"},{"title":"b","url":"https://news.example/b"}]"#,
        )
        .await
        .unwrap();
        assert_eq!(read_articles(&batch).await.unwrap().len(), 2);

        assert!(read_articles(&dir.path().join("missing.json")).await.is_err());
    }
}
