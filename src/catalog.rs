use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use crate::{
    logging::logger,
    radio_browser::{DirectoryError, DirectoryQuery, RadioBrowserClient},
    stations::{Station, StationStore},
};

/// The one capability the catalog needs from the directory side. Kept as a
/// seam so the refresh path can be driven without a live service.
#[allow(async_fn_in_trait)]
pub trait StationSource {
    async fn search_stations(&self, query: &DirectoryQuery)
        -> Result<Vec<Station>, DirectoryError>;
}

impl StationSource for RadioBrowserClient {
    async fn search_stations(
        &self,
        query: &DirectoryQuery,
    ) -> Result<Vec<Station>, DirectoryError> {
        RadioBrowserClient::search_stations(self, query).await
    }
}

/// Outcome of one country query. Distinguishes "served from cache" from
/// "freshly fetched" from "the directory was unreachable" — callers that
/// only want the stations can ignore the tag, but an empty `Refreshed` is a
/// legitimately empty country while `Failed` is a degraded answer.
#[derive(Debug)]
pub enum StationsOutcome {
    Hit(Vec<Station>),
    Refreshed(Vec<Station>),
    Failed { reason: String },
}

impl StationsOutcome {
    pub fn stations(&self) -> &[Station] {
        match self {
            StationsOutcome::Hit(stations) | StationsOutcome::Refreshed(stations) => stations,
            StationsOutcome::Failed { .. } => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.stations().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations().is_empty()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StationsOutcome::Failed { .. })
    }

    pub fn source(&self) -> &'static str {
        match self {
            StationsOutcome::Hit(_) => "cache",
            StationsOutcome::Refreshed(_) => "directory",
            StationsOutcome::Failed { .. } => "failed",
        }
    }
}

/// Decides, per country query, whether to serve from the store or refresh
/// from the directory, writing refreshed results back through the store.
pub struct StationCatalog<S: StationSource> {
    store: StationStore,
    source: S,
    expiry: Duration,
    limit: i64,
}

impl<S: StationSource> StationCatalog<S> {
    pub fn new(store: StationStore, source: S, expiry: Duration, limit: i64) -> Self {
        Self {
            store,
            source,
            expiry,
            limit,
        }
    }

    /// Never fails: every error path degrades into `Failed` with the reason
    /// logged. A store lookup error is treated as a cache miss and forces a
    /// refresh; a store write error does not discard the fetched result.
    pub async fn get_stations(&self, country: &str, now: DateTime<Utc>) -> StationsOutcome {
        match self.store.lookup_fresh(country, now, self.expiry).await {
            Ok(cached) if !cached.is_empty() => {
                logger().info(
                    "catalog.cache_hit",
                    json!({ "country": country, "count": cached.len() }),
                );
                return StationsOutcome::Hit(cached);
            }
            Ok(_) => {}
            Err(error) => {
                logger().error(
                    "catalog.lookup_failed",
                    json!({ "country": country, "error": error.to_string() }),
                );
            }
        }

        let query = DirectoryQuery::for_country(country, self.limit);
        let stations = match self.source.search_stations(&query).await {
            Ok(stations) => stations,
            Err(error) => {
                logger().error(
                    "catalog.search_failed",
                    json!({ "country": country, "error": error.to_string() }),
                );
                return StationsOutcome::Failed {
                    reason: error.to_string(),
                };
            }
        };

        // Write-through before returning, even for an empty result; an
        // upsert of zero rows is a no-op, so an empty country stays
        // uncached and is re-fetched within the expiry window.
        match self.store.upsert_all(&stations, now).await {
            Ok(applied) => {
                logger().info(
                    "catalog.refreshed",
                    json!({ "country": country, "fetched": stations.len(), "cached": applied }),
                );
            }
            Err(error) => {
                logger().error(
                    "catalog.write_failed",
                    json!({ "country": country, "error": error.to_string() }),
                );
            }
        }

        StationsOutcome::Refreshed(stations)
    }
}
