use parking_lot::RwLock;
use tracing::{info, warn};

use crate::llm::{generate_suggestions, TextModel};

const MAX_SUGGESTIONS: usize = 20;

/// Served whenever the model cannot come up with topics.
pub const FALLBACK_SUGGESTIONS: [&str; 20] = [
    "movie stars",
    "rock bands",
    "car brands",
    "world leaders",
    "tech billionaires",
    "80s pop stars",
    "ancient philosophers",
    "Renaissance painters",
    "Nobel Prize winners",
    "Olympic athletes",
    "British monarchs",
    "90s sitcoms",
    "video game franchises",
    "fashion designers",
    "classical composers",
    "TikTok stars 2020",
    "Marvel superheroes",
    "world cuisines",
    "space missions",
    "dog breeds",
];

/// Topic suggestions, generated once per process and shared by all users.
#[derive(Default)]
pub struct SuggestionsCache {
    cached: RwLock<Option<Vec<String>>>,
}

impl SuggestionsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Vec<String>> {
        self.cached.read().clone()
    }

    /// Returns the cached list, asking the model on first use. A failed or
    /// empty generation yields the fallback list, which is not cached.
    pub async fn get_or_generate(&self, model: &dyn TextModel) -> Vec<String> {
        if let Some(cached) = self.get() {
            return cached;
        }
        match generate_suggestions(model).await {
            Ok(mut suggestions) if !suggestions.is_empty() => {
                suggestions.truncate(MAX_SUGGESTIONS);
                info!(count = suggestions.len(), "Generated topic suggestions");
                // a concurrent first request may have filled the cache already
                self.cached.write().get_or_insert(suggestions).clone()
            }
            Ok(_) => {
                warn!("Model returned no suggestions, using fallback list");
                fallback()
            }
            Err(err) => {
                warn!(error = %err, "Error generating suggestions, using fallback list");
                fallback()
            }
        }
    }
}

fn fallback() -> Vec<String> {
    FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
}
