use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    config::DirectoryConfig,
    stations::{split_tags, Country, Station, StationCoordinates},
};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("directory returned {0}")]
    Status(StatusCode),
    #[error("invalid directory URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Parameters of one station search. Ordering is fixed to votes descending
/// and broken stations are filtered upstream; only the country varies per
/// query.
#[derive(Debug, Clone)]
pub struct DirectoryQuery {
    pub country: String,
    pub hide_broken: bool,
    pub limit: i64,
}

impl DirectoryQuery {
    pub fn for_country(country: &str, limit: i64) -> Self {
        Self {
            country: country.to_string(),
            hide_broken: true,
            limit,
        }
    }
}

#[derive(Clone)]
pub struct RadioBrowserClient {
    config: DirectoryConfig,
    client: Client,
}

impl RadioBrowserClient {
    pub fn new(config: DirectoryConfig) -> Result<Self, DirectoryError> {
        let client = Client::builder().user_agent(config.user_agent.clone()).build()?;
        Ok(Self { config, client })
    }

    /// Lists the directory's country taxonomy, sorted by name ascending.
    pub async fn list_countries(&self) -> Result<Vec<Country>, DirectoryError> {
        let mut url = Url::parse(&self.config.base_url)?;
        url.set_path(self.config.countries_path.trim_start_matches('/'));

        let response = self
            .client
            .get(url)
            .timeout(Duration::from_millis(self.config.countries_timeout_ms))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(DirectoryError::Status(response.status()));
        }

        let raw: Vec<CountryRecord> = response.json().await?;
        let mut countries: Vec<Country> = raw
            .into_iter()
            .map(|record| Country {
                name: record.name,
                station_count: record.stationcount,
            })
            .collect();
        countries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(countries)
    }

    /// Runs one ranked station search against the directory. Records are
    /// normalized into `Station`s but not validated; id-less records pass
    /// through for the store boundary to reject.
    pub async fn search_stations(
        &self,
        query: &DirectoryQuery,
    ) -> Result<Vec<Station>, DirectoryError> {
        let mut url = Url::parse(&self.config.base_url)?;
        url.set_path(self.config.search_path.trim_start_matches('/'));
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("country", &query.country);
            pairs.append_pair("hidebroken", if query.hide_broken { "true" } else { "false" });
            pairs.append_pair("order", "votes");
            pairs.append_pair("reverse", "true");
            pairs.append_pair("limit", &query.limit.to_string());
        }

        let response = self
            .client
            .get(url)
            .timeout(Duration::from_millis(self.config.search_timeout_ms))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(DirectoryError::Status(response.status()));
        }

        let raw: Vec<StationRecord> = response.json().await?;
        Ok(raw.into_iter().map(normalize_station).collect())
    }
}

#[derive(Debug, Deserialize)]
struct CountryRecord {
    name: String,
    #[serde(default)]
    stationcount: i64,
}

#[derive(Debug, Deserialize)]
struct StationRecord {
    stationuuid: Option<String>,
    name: Option<String>,
    url: Option<String>,
    country: Option<String>,
    countrycode: Option<String>,
    tags: Option<String>,
    homepage: Option<String>,
    geo_lat: Option<f64>,
    geo_long: Option<f64>,
    bitrate: Option<i32>,
    votes: Option<i32>,
}

fn normalize_station(raw: StationRecord) -> Station {
    let coordinates = match (raw.geo_lat, raw.geo_long) {
        (Some(lat), Some(lon)) => Some(StationCoordinates { lat, lon }),
        _ => None,
    };
    let homepage = raw
        .homepage
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    Station {
        id: raw.stationuuid.unwrap_or_default(),
        name: raw.name.unwrap_or_default(),
        url: raw.url.unwrap_or_default(),
        country: raw.country.unwrap_or_default(),
        country_code: raw
            .countrycode
            .map(|code| code.to_ascii_uppercase())
            .unwrap_or_default(),
        tags: split_tags(raw.tags.as_deref().unwrap_or_default()),
        homepage,
        coordinates,
        bitrate: raw.bitrate,
        votes: raw.votes.unwrap_or_default(),
    }
}
