use std::fmt;

use async_trait::async_trait;
use nd_core::InferenceModel;

const SUMMARY_MIN_LEN: usize = 10;
const TRUNCATED_SUMMARY_LEN: usize = 150;

/// First two sentences of `content`, split on `.`, or `None` when there are fewer than two.
fn first_two_sentences(content: &str) -> Option<String> {
    let mut sentences = content.split('.');
    let first = sentences.next().filter(|s| !s.trim().is_empty())?;
    let second = sentences.next().filter(|s| !s.trim().is_empty())?;
    Some(format!("{}.{}.", first, second))
}

/// Local summary used when the remote model is unavailable. Deterministic and pure.
pub fn fallback_summary(content: &str) -> String {
    match first_two_sentences(content) {
        Some(summary) if summary.chars().count() > SUMMARY_MIN_LEN => summary,
        _ => {
            let head: String = content.chars().take(TRUNCATED_SUMMARY_LEN).collect();
            format!("{}...", head)
        }
    }
}

/// Stand-in text shown instead of a translation when no API key is configured.
pub fn placeholder_translation(language: &str) -> String {
    format!("[Translation to {} would appear here]", language)
}

/// Offline model: only the local heuristics, never a network call.
#[derive(Default)]
pub struct FallbackModel;

impl fmt::Debug for FallbackModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackModel").finish()
    }
}

impl FallbackModel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InferenceModel for FallbackModel {
    fn name(&self) -> &str {
        "Fallback"
    }

    async fn summarize(&self, content: &str, _title: &str) -> String {
        fallback_summary(content)
    }

    async fn translate(&self, _text: &str, language: &str) -> String {
        placeholder_translation(language)
    }
}
