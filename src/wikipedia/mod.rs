//! Illustrative images for an item, taken from its best-matching Wikipedia page.

mod images;
mod search;

pub use images::{is_candidate_title, ImageScoring, GENERIC_PATTERNS, SKIP_PATTERNS};
pub use search::{category_hints, search_wikipedia_page, MatchStrategy, PageMatch};

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};

pub const DEFAULT_API_URL: &str = "https://en.wikipedia.org/w/api.php";
pub const USER_AGENT: &str =
    "PopQuiz/1.0 (https://github.com/bavobbr/top-of-the-pops-agent; bavo.bruylandt@gmail.com)";

#[derive(Debug, Clone, thiserror::Error)]
pub enum WikiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected Wikipedia response: {0}")]
    Decode(String),
}

/// The MediaWiki `action=query` endpoint.
#[async_trait]
pub trait WikiApi: Send + Sync {
    async fn query(&self, params: &[(&str, String)]) -> std::result::Result<Value, WikiError>;
}

pub(crate) async fn query_as<T: DeserializeOwned>(
    api: &dyn WikiApi,
    params: &[(&str, String)],
) -> std::result::Result<T, WikiError> {
    let value = api.query(params).await?;
    serde_json::from_value(value).map_err(|e| WikiError::Decode(e.to_string()))
}

pub struct WikipediaClient {
    http: Client,
    api_url: String,
}

impl WikipediaClient {
    pub fn new(api_url: impl Into<String>) -> Result<Self> {
        let http = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_url: api_url.into(),
        })
    }
}

#[async_trait]
impl WikiApi for WikipediaClient {
    async fn query(&self, params: &[(&str, String)]) -> std::result::Result<Value, WikiError> {
        let response = self
            .http
            .get(&self.api_url)
            .query(params)
            .query(&[("format", "json")])
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|e| WikiError::Network(e.to_string()))?;
        response
            .json::<Value>()
            .await
            .map_err(|e| WikiError::Decode(e.to_string()))
    }
}

/// Outcome of an image lookup. Every lookup ends in exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Success,
    NoPageFound,
    NoImages,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageResult {
    pub images: Vec<String>,
    pub source_page: Option<String>,
    pub search_query: Option<String>,
    pub status: ImageStatus,
    pub error: Option<String>,
}

impl Default for ImageResult {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            source_page: None,
            search_query: None,
            status: ImageStatus::NoPageFound,
            error: None,
        }
    }
}

#[derive(Deserialize)]
struct PagesEnvelope<P> {
    query: Option<PagesQuery<P>>,
}

#[derive(Deserialize)]
struct PagesQuery<P> {
    pages: Option<BTreeMap<String, P>>,
}

impl<P> PagesEnvelope<P> {
    fn into_pages(self) -> impl Iterator<Item = P> {
        self.query
            .and_then(|q| q.pages)
            .unwrap_or_default()
            .into_values()
    }
}

#[derive(Deserialize)]
struct PageImagePage {
    original: Option<OriginalImage>,
}

#[derive(Deserialize)]
struct OriginalImage {
    source: Option<String>,
}

#[derive(Deserialize)]
struct MediaPage {
    images: Option<Vec<MediaFile>>,
}

#[derive(Deserialize)]
struct MediaFile {
    title: String,
}

#[derive(Deserialize)]
struct ImageInfoPage {
    imageinfo: Option<Vec<ImageInfo>>,
}

#[derive(Deserialize)]
struct ImageInfo {
    url: Option<String>,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

/// Collects up to `max_images` image URLs for `item`.
///
/// The page's own lead image comes first; the remaining slots are filled from
/// the files embedded in the page, best-scoring first. Never fails: network
/// and decoding problems are reported through [`ImageStatus::Error`].
pub async fn fetch_wikipedia_images(
    api: &dyn WikiApi,
    item: &str,
    category: Option<&str>,
    max_images: usize,
    scoring: &ImageScoring,
) -> ImageResult {
    let mut result = ImageResult::default();
    if let Err(err) = collect_images(api, item, category, max_images.max(1), scoring, &mut result).await {
        warn!(%item, error = %err, "Error fetching Wikipedia images");
        result.status = ImageStatus::Error;
        result.error = Some(err.to_string());
    }
    info!(
        %item,
        status = ?result.status,
        images = result.images.len(),
        page = result.source_page.as_deref().unwrap_or("-"),
        "Wikipedia image lookup finished"
    );
    result
}

async fn collect_images(
    api: &dyn WikiApi,
    item: &str,
    category: Option<&str>,
    max_images: usize,
    scoring: &ImageScoring,
    result: &mut ImageResult,
) -> std::result::Result<(), WikiError> {
    let Some(page) = search_wikipedia_page(api, item, category).await? else {
        result.status = ImageStatus::NoPageFound;
        return Ok(());
    };
    result.source_page = Some(page.title.clone());
    result.search_query = Some(page.search_query.clone());

    let lead: PagesEnvelope<PageImagePage> = query_as(
        api,
        &[
            ("action", "query".to_string()),
            ("titles", page.title.clone()),
            ("prop", "pageimages".to_string()),
            ("piprop", "original".to_string()),
        ],
    )
    .await?;
    result.images.extend(
        lead.into_pages()
            .filter_map(|p| p.original.and_then(|original| original.source)),
    );

    if result.images.len() >= max_images {
        result.images.truncate(max_images);
        result.status = ImageStatus::Success;
        return Ok(());
    }

    let media: PagesEnvelope<MediaPage> = query_as(
        api,
        &[
            ("action", "query".to_string()),
            ("titles", page.title.clone()),
            ("prop", "images".to_string()),
            ("imlimit", scoring.media_limit.to_string()),
        ],
    )
    .await?;
    let titles: Vec<String> = media
        .into_pages()
        .flat_map(|p| p.images.unwrap_or_default())
        .map(|file| file.title)
        .collect();
    let ranked = scoring.rank(item, titles.iter().map(String::as_str));
    debug!(%item, files = titles.len(), candidates = ranked.len(), "Ranked page media");

    for (score, title) in ranked {
        if result.images.len() >= max_images {
            break;
        }
        let info: PagesEnvelope<ImageInfoPage> = query_as(
            api,
            &[
                ("action", "query".to_string()),
                ("titles", title.to_string()),
                ("prop", "imageinfo".to_string()),
                ("iiprop", "url|size".to_string()),
            ],
        )
        .await?;

        for info_page in info.into_pages() {
            let Some(info) = info_page.imageinfo.and_then(|infos| infos.into_iter().next()) else {
                continue;
            };
            if !scoring.accepts_size(info.width, info.height) {
                debug!(%title, width = info.width, height = info.height, "Image size out of bounds");
                continue;
            }
            if let Some(url) = info.url {
                if !result.images.contains(&url) {
                    debug!(%title, score, "Image accepted");
                    result.images.push(url);
                    break;
                }
            }
        }
    }

    result.status = if result.images.is_empty() {
        ImageStatus::NoImages
    } else {
        ImageStatus::Success
    };
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};

    /// Replays canned API responses in order; the last one repeats.
    pub struct ScriptedWiki {
        responses: Mutex<VecDeque<std::result::Result<Value, WikiError>>>,
        calls: Mutex<Vec<HashMap<String, String>>>,
    }

    impl ScriptedWiki {
        pub fn new(responses: Vec<Value>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().map(Ok).collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                responses: Mutex::new(VecDeque::from([Err(WikiError::Network(message.to_string()))])),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<HashMap<String, String>> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl WikiApi for ScriptedWiki {
        async fn query(&self, params: &[(&str, String)]) -> std::result::Result<Value, WikiError> {
            self.calls.lock().push(
                params
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.clone()))
                    .collect(),
            );
            let mut responses = self.responses.lock();
            if responses.len() > 1 {
                responses.pop_front().unwrap_or_else(|| Ok(Value::Null))
            } else {
                responses.front().cloned().unwrap_or_else(|| Ok(Value::Null))
            }
        }
    }
}
