pub mod error;
pub mod models;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::InferenceModel;
pub use storage::ArticleStore;
pub use types::{
    language_name, Article, ArticleId, ArticlePatch, ArticleQuery, Category, Language, NewArticle,
    NewTranslation, TranslatedContent, Translation,
};
