use serde::{Deserialize, Serialize};

/// One radio stream as reported by the directory service at fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub url: String,
    pub country: String,
    #[serde(rename = "countryCode")]
    pub country_code: String,
    pub tags: Vec<String>,
    pub homepage: Option<String>,
    pub coordinates: Option<StationCoordinates>,
    pub bitrate: Option<i32>,
    pub votes: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationCoordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    #[serde(rename = "stationCount")]
    pub station_count: i64,
}

/// Storage form of the tag set: one comma-delimited string.
pub fn join_tags(tags: &[String]) -> String {
    tags.join(",")
}

/// Parses the delimited storage/wire form back into the tag set:
/// trimmed, empties dropped, duplicates dropped.
pub fn split_tags(value: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for item in value.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        if tags.iter().any(|existing| existing == item) {
            continue;
        }
        tags.push(item.to_string());
    }
    tags
}
