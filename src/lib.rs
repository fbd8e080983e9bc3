pub mod catalog;
pub mod config;
pub mod geocode;
pub mod logging;
pub mod playback;
pub mod radio_browser;
pub mod stations;

pub use catalog::{StationCatalog, StationSource, StationsOutcome};
pub use config::Config;
pub use geocode::GeocodeClient;
pub use playback::{MediaEngine, MediaOptions, PlaybackError, PlaybackSession, SessionState};
pub use radio_browser::{DirectoryError, DirectoryQuery, RadioBrowserClient};
pub use stations::{Country, Station, StationCoordinates, StationStore};
