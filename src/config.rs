use std::env;

use serde::Serialize;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Message(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub cache: CacheConfig,
    pub directory: DirectoryConfig,
    pub geocode: GeocodeConfig,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheConfig {
    pub db_path: String,
    pub expiry_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryConfig {
    pub base_url: String,
    pub countries_path: String,
    pub search_path: String,
    pub user_agent: String,
    pub limit: i64,
    pub search_timeout_ms: u64,
    pub countries_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeocodeConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaybackConfig {
    pub network_caching_ms: u32,
    pub default_volume: u8,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let cache = CacheConfig::from_env()?;
        let directory = DirectoryConfig::from_env()?;
        let geocode = GeocodeConfig::from_env(&directory)?;
        let playback = PlaybackConfig::from_env()?;

        Ok(Self {
            cache,
            directory,
            geocode,
            playback,
        })
    }
}

impl CacheConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let db_path =
            env::var("RADIO_ATLAS_CACHE_PATH").unwrap_or_else(|_| "radio_cache.db".into());
        if db_path.trim().is_empty() {
            return Err(ConfigError::Message(
                "RADIO_ATLAS_CACHE_PATH cannot be empty".into(),
            ));
        }
        let expiry_seconds = env_u64("RADIO_ATLAS_CACHE_EXPIRY_SECONDS", 6 * 60 * 60)?;
        if expiry_seconds == 0 {
            return Err(ConfigError::Message(
                "RADIO_ATLAS_CACHE_EXPIRY_SECONDS must be greater than zero".into(),
            ));
        }

        Ok(Self {
            db_path,
            expiry_seconds,
        })
    }
}

impl DirectoryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        const DEFAULT_BASE_URL: &str = "https://de1.api.radio-browser.info";
        const DEFAULT_COUNTRIES_PATH: &str = "/json/countries";
        const DEFAULT_SEARCH_PATH: &str = "/json/stations/search";

        let config = Self {
            base_url: env::var("RADIO_ATLAS_DIRECTORY_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            countries_path: env::var("RADIO_ATLAS_DIRECTORY_COUNTRIES_PATH")
                .unwrap_or_else(|_| DEFAULT_COUNTRIES_PATH.to_string()),
            search_path: env::var("RADIO_ATLAS_DIRECTORY_SEARCH_PATH")
                .unwrap_or_else(|_| DEFAULT_SEARCH_PATH.to_string()),
            user_agent: env::var("RADIO_ATLAS_USER_AGENT")
                .unwrap_or_else(|_| "radio-atlas/1.0".to_string()),
            limit: env_i64("RADIO_ATLAS_DIRECTORY_LIMIT", 500)?,
            search_timeout_ms: env_u64("RADIO_ATLAS_DIRECTORY_SEARCH_TIMEOUT_MS", 10_000)?,
            countries_timeout_ms: env_u64("RADIO_ATLAS_DIRECTORY_COUNTRIES_TIMEOUT_MS", 5_000)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Message(
                "A directory user agent must be provided".into(),
            ));
        }
        if self.limit <= 0 {
            return Err(ConfigError::Message(
                "RADIO_ATLAS_DIRECTORY_LIMIT must be greater than zero".into(),
            ));
        }
        if self.search_timeout_ms == 0 || self.countries_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Directory timeouts must be greater than zero".into(),
            ));
        }

        let base_url = Url::parse(&self.base_url)
            .map_err(|err| ConfigError::Message(format!("Invalid directory base URL: {err}")))?;
        if base_url.scheme() != "https" && base_url.scheme() != "http" {
            return Err(ConfigError::Message(
                "Directory base URL must be HTTP(S)".into(),
            ));
        }

        Ok(())
    }
}

impl GeocodeConfig {
    fn from_env(directory: &DirectoryConfig) -> Result<Self, ConfigError> {
        const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

        let base_url = env::var("RADIO_ATLAS_GEOCODE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Url::parse(&base_url)
            .map_err(|err| ConfigError::Message(format!("Invalid geocode base URL: {err}")))?;

        Ok(Self {
            base_url,
            user_agent: directory.user_agent.clone(),
            timeout_ms: env_u64("RADIO_ATLAS_GEOCODE_TIMEOUT_MS", 5_000)?,
        })
    }
}

impl PlaybackConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let network_caching_ms = env_u32("RADIO_ATLAS_NETWORK_CACHING_MS", 3_000)?;
        let default_volume = env_u32("RADIO_ATLAS_DEFAULT_VOLUME", 70)?;
        if default_volume > 100 {
            return Err(ConfigError::Message(
                "RADIO_ATLAS_DEFAULT_VOLUME must be in 0..=100".into(),
            ));
        }

        Ok(Self {
            network_caching_ms,
            default_volume: default_volume as u8,
        })
    }
}

fn env_u32(key: &str, default: u32) -> Result<u32, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Message(format!("{key} must be a valid u32"))),
        Err(_) => Ok(default),
    }
}

fn env_u64(key: &str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Message(format!("{key} must be a valid u64"))),
        Err(_) => Ok(default),
    }
}

fn env_i64(key: &str, default: i64) -> Result<i64, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Message(format!("{key} must be a valid integer"))),
        Err(_) => Ok(default),
    }
}
