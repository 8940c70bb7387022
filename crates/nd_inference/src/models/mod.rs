use std::sync::Arc;

use nd_core::{InferenceModel, Result};

use crate::Config;

pub mod fallback;
pub mod groq;

pub use fallback::FallbackModel;
pub use groq::GroqModel;

/// Model name that selects the offline model.
pub const FALLBACK_MODEL: &str = "fallback";

/// Builds the text generation model named by the configuration.
pub async fn create_model(config: Option<Config>) -> Result<Arc<dyn InferenceModel>> {
    let config = config.unwrap_or_default();
    let model: Arc<dyn InferenceModel> = match config.model_name.as_deref() {
        Some(FALLBACK_MODEL) => Arc::new(FallbackModel::new()),
        _ => Arc::new(GroqModel::new(&config)?),
    };
    tracing::info!("🧠 Inference model initialized (using {})", model.name());
    Ok(model)
}
