use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sqlx::{
    sqlite::{Sqlite, SqliteConnectOptions, SqliteConnection, SqliteRow},
    ConnectOptions, Connection, QueryBuilder, Row,
};
use thiserror::Error;

use crate::logging::logger;

use super::{join_tags, split_tags, Station, StationCoordinates};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

const UPSERT_BATCH_SIZE: usize = 50;

/// File-backed station cache. Every operation opens its own connection and
/// releases it before returning; the store holds no live handle between calls.
#[derive(Clone)]
pub struct StationStore {
    options: SqliteConnectOptions,
}

impl StationStore {
    pub fn new(db_path: &str) -> Self {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        Self { options }
    }

    async fn connect(&self) -> Result<SqliteConnection, StoreError> {
        Ok(self.options.connect().await?)
    }

    /// Ensures the schema exists. Safe to call repeatedly; a failure here
    /// means the cache file itself is unusable and must propagate.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        let mut conn = self.connect().await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stations (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                url TEXT NOT NULL,
                country TEXT NOT NULL,
                code TEXT NOT NULL,
                tags TEXT NOT NULL,
                homepage TEXT,
                lat REAL,
                lon REAL,
                bitrate INTEGER,
                votes INTEGER NOT NULL DEFAULT 0,
                last_updated TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(&mut conn)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_country ON stations(country)")
            .execute(&mut conn)
            .await?;
        conn.close().await.ok();
        Ok(())
    }

    /// Returns every cached station for `country` whose `last_updated` falls
    /// within the expiry window. An empty result is the normal cache-miss
    /// signal, not a fault.
    pub async fn lookup_fresh(
        &self,
        country: &str,
        now: DateTime<Utc>,
        expiry: Duration,
    ) -> Result<Vec<Station>, StoreError> {
        let threshold = now - expiry;
        let mut conn = self.connect().await?;
        let rows = sqlx::query(
            r#"
            SELECT id, name, url, country, code, tags, homepage, lat, lon, bitrate, votes
            FROM stations
            WHERE country = ? AND last_updated >= ?
            ORDER BY votes DESC
            "#,
        )
        .bind(country)
        .bind(threshold)
        .fetch_all(&mut conn)
        .await?;
        conn.close().await.ok();

        let mut stations = Vec::with_capacity(rows.len());
        for row in rows {
            stations.push(row_to_station(row)?);
        }
        Ok(stations)
    }

    /// Inserts or replaces each station keyed by id, stamping `last_updated`
    /// with `now`. Records without a directory-provided id are rejected here,
    /// logged, and skipped without aborting the batch. Returns the number of
    /// rows applied.
    pub async fn upsert_all(
        &self,
        stations: &[Station],
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut accepted: Vec<&Station> = Vec::with_capacity(stations.len());
        for station in stations {
            if station.id.trim().is_empty() {
                logger().warn(
                    "store.station_rejected",
                    json!({
                        "reason": "missing id",
                        "name": station.name,
                        "country": station.country,
                    }),
                );
                continue;
            }
            accepted.push(station);
        }
        if accepted.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connect().await?;
        for chunk in accepted.chunks(UPSERT_BATCH_SIZE) {
            let mut builder = QueryBuilder::<Sqlite>::new(
                "INSERT INTO stations (id, name, url, country, code, tags, homepage, lat, lon, bitrate, votes, last_updated) ",
            );
            builder.push_values(chunk, |mut b, station| {
                b.push_bind(&station.id);
                b.push_bind(&station.name);
                b.push_bind(&station.url);
                b.push_bind(&station.country);
                b.push_bind(&station.country_code);
                b.push_bind(join_tags(&station.tags));
                b.push_bind(&station.homepage);
                b.push_bind(station.coordinates.map(|c| c.lat));
                b.push_bind(station.coordinates.map(|c| c.lon));
                b.push_bind(station.bitrate);
                b.push_bind(station.votes);
                b.push_bind(now);
            });
            builder.push(
                " ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                url = excluded.url,
                country = excluded.country,
                code = excluded.code,
                tags = excluded.tags,
                homepage = excluded.homepage,
                lat = excluded.lat,
                lon = excluded.lon,
                bitrate = excluded.bitrate,
                votes = excluded.votes,
                last_updated = MAX(stations.last_updated, excluded.last_updated)",
            );
            builder.build().execute(&mut conn).await?;
        }
        conn.close().await.ok();

        Ok(accepted.len())
    }
}

fn row_to_station(row: SqliteRow) -> Result<Station, StoreError> {
    let tags: String = row.try_get("tags")?;
    let lat: Option<f64> = row.try_get("lat")?;
    let lon: Option<f64> = row.try_get("lon")?;
    let coordinates = match (lat, lon) {
        (Some(lat), Some(lon)) => Some(StationCoordinates { lat, lon }),
        _ => None,
    };

    Ok(Station {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        url: row.try_get("url")?,
        country: row.try_get("country")?,
        country_code: row.try_get("code")?,
        tags: split_tags(&tags),
        homepage: row.try_get("homepage")?,
        coordinates,
        bitrate: row.try_get("bitrate")?,
        votes: row.try_get("votes")?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    use crate::logging::init_logger;
    use crate::stations::{Station, StationCoordinates};

    use super::StationStore;

    fn test_store(dir: &TempDir) -> StationStore {
        init_logger("radio-atlas-test");
        let path = dir.path().join("cache.db");
        StationStore::new(path.to_str().unwrap())
    }

    fn station(id: &str, name: &str, country: &str) -> Station {
        Station {
            id: id.into(),
            name: name.into(),
            url: format!("https://streams.example/{id}"),
            country: country.into(),
            country_code: "WL".into(),
            tags: vec!["pop".into(), "rock".into()],
            homepage: Some("https://example.com".into()),
            coordinates: Some(StationCoordinates { lat: 1.5, lon: 2.5 }),
            bitrate: Some(128),
            votes: 10,
        }
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        store.initialize().await.unwrap();
        store.initialize().await.unwrap();

        let now = Utc::now();
        store
            .upsert_all(&[station("a", "A", "Wonderland")], now)
            .await
            .unwrap();
        let found = store
            .lookup_fresh("Wonderland", now, Duration::hours(6))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn round_trip_preserves_station_fields() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        store.initialize().await.unwrap();

        let original = station("a", "Alpha FM", "Wonderland");
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        store.upsert_all(&[original.clone()], now).await.unwrap();

        let found = store
            .lookup_fresh("Wonderland", now, Duration::hours(6))
            .await
            .unwrap();
        assert_eq!(found, vec![original]);
    }

    #[tokio::test]
    async fn freshness_is_a_pure_function_of_age_and_expiry() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        store.initialize().await.unwrap();

        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        store
            .upsert_all(&[station("a", "A", "Wonderland")], t0)
            .await
            .unwrap();

        let expiry = Duration::hours(6);
        let just_inside = t0 + Duration::hours(5) + Duration::minutes(59);
        let just_outside = t0 + Duration::hours(6) + Duration::minutes(1);

        let fresh = store
            .lookup_fresh("Wonderland", just_inside, expiry)
            .await
            .unwrap();
        assert_eq!(fresh.len(), 1);

        let stale = store
            .lookup_fresh("Wonderland", just_outside, expiry)
            .await
            .unwrap();
        assert!(stale.is_empty());
    }

    #[tokio::test]
    async fn upsert_is_idempotent_by_id() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        store.initialize().await.unwrap();

        let batch = vec![station("a", "A", "Wonderland"), station("b", "B", "Wonderland")];
        let now = Utc::now();
        store.upsert_all(&batch, now).await.unwrap();
        store.upsert_all(&batch, now).await.unwrap();

        let found = store
            .lookup_fresh("Wonderland", now, Duration::hours(6))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn stations_without_id_are_rejected_not_fatal() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        store.initialize().await.unwrap();

        let now = Utc::now();
        let applied = store
            .upsert_all(
                &[station("", "Nameless", "Wonderland"), station("b", "B", "Wonderland")],
                now,
            )
            .await
            .unwrap();
        assert_eq!(applied, 1);

        let found = store
            .lookup_fresh("Wonderland", now, Duration::hours(6))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "b");
    }

    #[tokio::test]
    async fn last_updated_never_moves_backwards() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        store.initialize().await.unwrap();

        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let t1 = t0 + Duration::hours(3);
        store
            .upsert_all(&[station("a", "A", "Wonderland")], t1)
            .await
            .unwrap();
        // Re-write with an earlier clock; the row must keep the later stamp.
        store
            .upsert_all(&[station("a", "A", "Wonderland")], t0)
            .await
            .unwrap();

        let found = store
            .lookup_fresh("Wonderland", t1 + Duration::hours(5), Duration::hours(6))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn lookup_for_unknown_country_is_empty_not_an_error() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        store.initialize().await.unwrap();

        let found = store
            .lookup_fresh("Atlantis", Utc::now(), Duration::hours(6))
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
