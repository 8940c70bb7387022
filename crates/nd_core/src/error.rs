use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::types::ArticleId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Article not found: {0}")]
    ArticleNotFound(ArticleId),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An error observed by a caller that joined someone else's in-flight computation.
    #[error(transparent)]
    Shared(Arc<Error>),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::ArticleNotFound(_) => true,
            Error::Shared(inner) => inner.is_not_found(),
            _ => false,
        }
    }

    pub fn is_unsupported_language(&self) -> bool {
        match self {
            Error::UnsupportedLanguage(_) => true,
            Error::Shared(inner) => inner.is_unsupported_language(),
            _ => false,
        }
    }

    /// Recovers the owned error when this caller was the last one holding it.
    pub fn from_shared(error: Arc<Error>) -> Self {
        Arc::try_unwrap(error).unwrap_or_else(Error::Shared)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_through_shared() {
        let shared = Arc::new(Error::ArticleNotFound(7));
        let keep = shared.clone();
        let error = Error::from_shared(shared);
        assert!(matches!(error, Error::Shared(_)));
        assert!(error.is_not_found());
        assert_eq!(error.to_string(), "Article not found: 7");
        drop(keep);

        let error = Error::from_shared(Arc::new(Error::Storage("disk".to_string())));
        assert!(matches!(error, Error::Storage(_)));
        assert!(!error.is_not_found());
    }
}
