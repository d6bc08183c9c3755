pub mod api;
pub mod config;
pub mod content;
pub mod error;
pub mod llm;
pub mod rate_limit;
pub mod session;
pub mod suggestions;
pub mod wikipedia;

use std::sync::Arc;

use config::Config;
use error::Result;
use llm::{GeminiClient, TextModel};
use rate_limit::RateLimiter;
use session::{SessionLimits, SessionStore};
use suggestions::SuggestionsCache;
use wikipedia::{ImageScoring, WikiApi, WikipediaClient};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn TextModel>,
    pub wiki: Arc<dyn WikiApi>,
    pub sessions: Arc<SessionStore>,
    pub suggestions: Arc<SuggestionsCache>,
    pub limiter: Arc<RateLimiter>,
    pub max_images: usize,
    pub image_scoring: Arc<ImageScoring>,
}

impl AppState {
    pub fn new(
        model: Arc<dyn TextModel>,
        wiki: Arc<dyn WikiApi>,
        session_limits: SessionLimits,
        max_images: usize,
        image_scoring: ImageScoring,
    ) -> Self {
        Self {
            model,
            wiki,
            sessions: Arc::new(SessionStore::new(session_limits)),
            suggestions: Arc::new(SuggestionsCache::new()),
            limiter: Arc::new(RateLimiter::new()),
            max_images,
            image_scoring: Arc::new(image_scoring),
        }
    }

    /// Wires the Gemini and Wikipedia clients described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let model = GeminiClient::new(config.google_api_key.clone(), config.gemini_model.clone())?;
        let wiki = WikipediaClient::new(config.wikipedia_api_url.clone())?;
        Ok(Self::new(
            Arc::new(model),
            Arc::new(wiki),
            config.sessions.clone(),
            config.max_images,
            config.image_scoring.clone(),
        ))
    }
}
