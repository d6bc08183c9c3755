use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::{AppError, Result};
use crate::session::SessionLimits;
use crate::wikipedia::{ImageScoring, DEFAULT_API_URL};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub google_api_key: String,
    pub gemini_model: String,
    pub wikipedia_api_url: String,
    pub max_images: usize,
    pub image_scoring: ImageScoring,
    pub sessions: SessionLimits,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let google_api_key = env::var("GOOGLE_AI_STUDIO_KEY")?;
        let gemini_model = env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let wikipedia_api_url =
            env::var("WIKIPEDIA_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = parse_var("PORT", 5000)?;
        let ip = IpAddr::from_str(&host)
            .map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;
        let server_addr = SocketAddr::new(ip, port);

        let defaults = ImageScoring::default();
        let image_scoring = ImageScoring {
            min_dimension: parse_var("IMAGE_MIN_DIMENSION", defaults.min_dimension)?,
            max_dimension: parse_var("IMAGE_MAX_DIMENSION", defaults.max_dimension)?,
            ..defaults
        };
        if image_scoring.min_dimension > image_scoring.max_dimension {
            return Err(AppError::ConfigError(
                "IMAGE_MIN_DIMENSION must not exceed IMAGE_MAX_DIMENSION".to_string(),
            ));
        }

        let session_defaults = SessionLimits::default();
        let sessions = SessionLimits {
            ttl: Duration::from_secs(parse_var(
                "SESSION_TTL_SECS",
                session_defaults.ttl.as_secs(),
            )?),
            max_per_ip: parse_var("MAX_SESSIONS_PER_IP", session_defaults.max_per_ip)?,
            max_total: parse_var("MAX_TOTAL_SESSIONS", session_defaults.max_total)?,
            ..session_defaults
        };

        let config = Config {
            server_addr,
            google_api_key,
            gemini_model,
            wikipedia_api_url,
            max_images: parse_var("MAX_IMAGES", 3)?,
            image_scoring,
            sessions,
        };
        info!(
            addr = %config.server_addr,
            model = %config.gemini_model,
            max_images = config.max_images,
            "Configuration loaded"
        );
        Ok(config)
    }
}

/// Reads `key` from the environment, falling back to `default` when unset.
fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_var_falls_back_to_default_when_unset() {
        let value: u16 = parse_var("TOP_POPS_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
