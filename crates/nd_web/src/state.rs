use std::sync::Arc;

use nd_core::{ArticleStore, InferenceModel};
use nd_inference::{SummaryEnricher, TranslationCache};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ArticleStore>,
    pub summaries: SummaryEnricher,
    pub translations: TranslationCache,
}

impl AppState {
    pub fn new(store: Arc<dyn ArticleStore>, model: Arc<dyn InferenceModel>) -> Self {
        Self {
            summaries: SummaryEnricher::new(store.clone(), model.clone()),
            translations: TranslationCache::new(store.clone(), model),
            store,
        }
    }
}
