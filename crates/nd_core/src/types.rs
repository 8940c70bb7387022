use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

pub type ArticleId = i64;

pub const DEFAULT_LANGUAGE: &str = "en";

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

/// Collapses empty strings to `None` so stored optional text is either absent or non-empty.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub url: String,
    pub url_to_image: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub source_id: Option<String>,
    pub category: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Article {
    pub fn from_new(id: ArticleId, new: NewArticle) -> Self {
        let new = new.normalized();
        Self {
            id,
            title: new.title,
            description: new.description,
            content: new.content,
            summary: new.summary,
            url: new.url,
            url_to_image: new.url_to_image,
            published_at: new.published_at,
            source: new.source,
            source_id: new.source_id,
            category: new.category,
            language: new.language,
        }
    }

    pub fn has_summary(&self) -> bool {
        self.summary.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Body text worth summarizing, if any.
    pub fn summarizable_content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }

    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.description.as_deref().is_some_and(|d| d.to_lowercase().contains(&needle))
            || self.content.as_deref().is_some_and(|c| c.to_lowercase().contains(&needle))
    }
}

/// An article as handed over by ingest, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    pub url: String,
    #[serde(default)]
    pub url_to_image: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for NewArticle {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: None,
            content: None,
            summary: None,
            url: String::new(),
            url_to_image: None,
            published_at: None,
            source: None,
            source_id: None,
            category: None,
            language: default_language(),
        }
    }
}

impl NewArticle {
    pub fn normalized(mut self) -> Self {
        self.description = non_empty(self.description);
        self.content = non_empty(self.content);
        self.summary = non_empty(self.summary);
        self.url_to_image = non_empty(self.url_to_image);
        self.source = non_empty(self.source);
        self.source_id = non_empty(self.source_id);
        self.category = non_empty(self.category);
        if self.language.is_empty() {
            self.language = default_language();
        }
        self
    }
}

/// Partial article update. `None` leaves a field alone; an empty string clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePatch {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub url_to_image: Option<String>,
}

impl ArticlePatch {
    pub fn summary(summary: impl Into<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            ..Default::default()
        }
    }

    pub fn apply(self, article: &mut Article) {
        fn set(field: &mut Option<String>, value: Option<String>) {
            if let Some(value) = value {
                *field = non_empty(Some(value));
            }
        }
        set(&mut article.summary, self.summary);
        set(&mut article.description, self.description);
        set(&mut article.content, self.content);
        set(&mut article.category, self.category);
        set(&mut article.url_to_image, self.url_to_image);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub id: i64,
    pub article_id: ArticleId,
    pub language: String,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
}

impl Translation {
    pub fn from_new(id: i64, new: NewTranslation) -> Self {
        Self {
            id,
            article_id: new.article_id,
            language: new.language,
            title: non_empty(new.title),
            summary: non_empty(new.summary),
            content: non_empty(new.content),
        }
    }

    /// A stored translation only counts as a cache hit when title and summary are both present.
    pub fn is_complete(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.is_empty())
            && self.summary.as_deref().is_some_and(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTranslation {
    pub article_id: ArticleId,
    pub language: String,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
}

/// The translated text triple handed to callers; absent fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedContent {
    pub title: String,
    pub summary: String,
    pub content: String,
}

impl From<Translation> for TranslatedContent {
    fn from(translation: Translation) -> Self {
        Self {
            title: translation.title.unwrap_or_default(),
            summary: translation.summary.unwrap_or_default(),
            content: translation.content.unwrap_or_default(),
        }
    }
}

impl From<&Article> for TranslatedContent {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            summary: article.summary.clone().unwrap_or_default(),
            content: article.content.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleQuery {
    pub limit: usize,
    pub offset: usize,
    pub category: Option<String>,
    pub language: String,
}

impl Default for ArticleQuery {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
            category: None,
            language: default_language(),
        }
    }
}

impl ArticleQuery {
    /// `general` (or no category at all) means every category.
    pub fn category_filter(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.is_empty() && *c != Category::General.id())
    }

    pub fn accepts(&self, article: &Article) -> bool {
        if article.language != self.language {
            return false;
        }
        match self.category_filter() {
            Some(category) => article.category.as_deref() == Some(category),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Hi,
    Ta,
    Te,
    Bn,
    Kn,
    Ml,
}

impl Language {
    pub const ALL: [Language; 7] = [
        Language::En,
        Language::Hi,
        Language::Ta,
        Language::Te,
        Language::Bn,
        Language::Kn,
        Language::Ml,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Ta => "ta",
            Language::Te => "te",
            Language::Bn => "bn",
            Language::Kn => "kn",
            Language::Ml => "ml",
        }
    }

    /// English name, as used in translation prompts.
    pub fn name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Hi => "Hindi",
            Language::Ta => "Tamil",
            Language::Te => "Telugu",
            Language::Bn => "Bengali",
            Language::Kn => "Kannada",
            Language::Ml => "Malayalam",
        }
    }

    /// Label shown in the language picker.
    pub fn label(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Hi => "हिंदी (Hindi)",
            Language::Ta => "தமிழ் (Tamil)",
            Language::Te => "తెలుగు (Telugu)",
            Language::Bn => "বাংলা (Bengali)",
            Language::Kn => "ಕನ್ನಡ (Kannada)",
            Language::Ml => "മലയാളം (Malayalam)",
        }
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|language| language.code() == s)
            .ok_or_else(|| Error::UnsupportedLanguage(s.to_string()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Maps a language code to its English name; unknown codes come back unchanged.
pub fn language_name(code: &str) -> &str {
    match code.parse::<Language>() {
        Ok(language) => language.name(),
        Err(_) => code,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    General,
    Business,
    Technology,
    Health,
    Sports,
    Entertainment,
    Science,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::General,
        Category::Business,
        Category::Technology,
        Category::Health,
        Category::Sports,
        Category::Entertainment,
        Category::Science,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Business => "business",
            Category::Technology => "technology",
            Category::Health => "health",
            Category::Sports => "sports",
            Category::Entertainment => "entertainment",
            Category::Science => "science",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Category::General => "Top Headlines",
            Category::Business => "Business",
            Category::Technology => "Technology",
            Category::Health => "Health",
            Category::Sports => "Sports",
            Category::Entertainment => "Entertainment",
            Category::Science => "Science",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Category::General => "globe",
            Category::Business => "briefcase",
            Category::Technology => "microchip",
            Category::Health => "heartbeat",
            Category::Sports => "running",
            Category::Entertainment => "film",
            Category::Science => "flask",
        }
    }
}
