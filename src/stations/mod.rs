mod models;
mod store;

pub use models::{join_tags, split_tags, Country, Station, StationCoordinates};
pub use store::{StationStore, StoreError};
