use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;

use crate::{config::GeocodeConfig, stations::StationCoordinates};

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("geocoder returned {0}")]
    Status(StatusCode),
    #[error("invalid geocoder URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Stateless address-to-coordinates pass-through. No caching, no retries;
/// a miss is `None`, not an error.
#[derive(Clone)]
pub struct GeocodeClient {
    config: GeocodeConfig,
    client: Client,
}

impl GeocodeClient {
    pub fn new(config: GeocodeConfig) -> Result<Self, GeocodeError> {
        let client = Client::builder().user_agent(config.user_agent.clone()).build()?;
        Ok(Self { config, client })
    }

    pub async fn resolve(
        &self,
        address: &str,
    ) -> Result<Option<StationCoordinates>, GeocodeError> {
        let mut url = Url::parse(&self.config.base_url)?;
        url.set_path("search");
        url.query_pairs_mut()
            .append_pair("q", address)
            .append_pair("format", "json")
            .append_pair("limit", "1");

        let response = self
            .client
            .get(url)
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status()));
        }

        let results: Vec<GeocodeRecord> = response.json().await?;
        Ok(results.into_iter().next().and_then(record_to_coordinates))
    }
}

// Nominatim reports coordinates as decimal strings.
#[derive(Debug, Deserialize)]
struct GeocodeRecord {
    lat: String,
    lon: String,
}

fn record_to_coordinates(record: GeocodeRecord) -> Option<StationCoordinates> {
    let lat = record.lat.trim().parse::<f64>().ok()?;
    let lon = record.lon.trim().parse::<f64>().ok()?;
    Some(StationCoordinates { lat, lon })
}
