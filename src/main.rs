use anyhow::Context;
use chrono::{Duration, Utc};
use serde_json::json;
use std::env;

use radio_atlas::catalog::StationCatalog;
use radio_atlas::config::Config;
use radio_atlas::geocode::GeocodeClient;
use radio_atlas::logging::init_logger;
use radio_atlas::radio_browser::RadioBrowserClient;
use radio_atlas::stations::StationStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = init_logger("radio-atlas");

    let config = Config::load().context("failed to load configuration")?;

    match env::args().nth(1).as_deref() {
        Some("check-config") => {
            logger.info(
                "config.check_passed",
                serde_json::to_value(&config).unwrap_or_else(|_| json!({ "status": "ok" })),
            );
            Ok(())
        }
        Some("countries") => {
            let client = RadioBrowserClient::new(config.directory.clone())
                .context("failed to build directory client")?;
            // Directory trouble degrades to an empty listing, never a crash.
            let countries = match client.list_countries().await {
                Ok(countries) => countries,
                Err(error) => {
                    logger.error(
                        "directory.countries_failed",
                        json!({ "error": error.to_string() }),
                    );
                    vec![]
                }
            };
            println!("{}", serde_json::to_string_pretty(&countries)?);
            Ok(())
        }
        Some("stations") => {
            let country = env::args()
                .nth(2)
                .context("usage: radio-atlas stations <country>")?;
            let store = StationStore::new(&config.cache.db_path);
            store
                .initialize()
                .await
                .context("failed to initialize station cache")?;
            let client = RadioBrowserClient::new(config.directory.clone())
                .context("failed to build directory client")?;
            let catalog = StationCatalog::new(
                store,
                client,
                Duration::seconds(config.cache.expiry_seconds as i64),
                config.directory.limit,
            );

            let outcome = catalog.get_stations(&country, Utc::now()).await;
            logger.info(
                "stations.listed",
                json!({
                    "country": country,
                    "source": outcome.source(),
                    "count": outcome.len(),
                }),
            );
            println!("{}", serde_json::to_string_pretty(outcome.stations())?);
            Ok(())
        }
        Some("locate") => {
            let address: Vec<String> = env::args().skip(2).collect();
            if address.is_empty() {
                anyhow::bail!("usage: radio-atlas locate <address>");
            }
            let client = GeocodeClient::new(config.geocode.clone())
                .context("failed to build geocode client")?;
            let coordinates = match client.resolve(&address.join(" ")).await {
                Ok(coordinates) => coordinates,
                Err(error) => {
                    logger.error("geocode.failed", json!({ "error": error.to_string() }));
                    None
                }
            };
            println!("{}", serde_json::to_string_pretty(&coordinates)?);
            Ok(())
        }
        _ => {
            eprintln!("usage: radio-atlas <check-config|countries|stations <country>|locate <address>>");
            Ok(())
        }
    }
}
