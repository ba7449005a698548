//! Runtime configuration, read from the environment (and `.env`, loaded by
//! the binary before this runs).

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_FEED_BASE_URL: &str = "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds";

#[derive(Debug, Clone)]
pub struct Config {
    /// Sent as `x-api-key`; requests go out unauthenticated without it.
    pub api_key: Option<String>,
    pub feed_base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            feed_base_url: DEFAULT_FEED_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            data_dir: PathBuf::from("mta-data"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let secs = |key: &str, default: Duration| -> Result<Duration> {
            match get(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{key} must be a whole number of seconds, got {raw:?}")),
                None => Ok(default),
            }
        };

        Ok(Self {
            api_key: get("MTA_API_KEY"),
            feed_base_url: get("MTA_FEED_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.feed_base_url),
            connect_timeout: secs("CONNECT_TIMEOUT_SECS", defaults.connect_timeout)?,
            request_timeout: secs("REQUEST_TIMEOUT_SECS", defaults.request_timeout)?,
            data_dir: get("GTFS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        })
    }

    pub fn stops_path(&self) -> PathBuf {
        self.data_dir.join("stops.txt")
    }

    pub fn transfers_path(&self) -> PathBuf {
        self.data_dir.join("transfers.txt")
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join("stations.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.api_key, None);
        assert_eq!(config.feed_base_url, DEFAULT_FEED_BASE_URL);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.catalog_path(), PathBuf::from("mta-data/stations.json"));
    }

    #[test]
    fn test_overrides_from_environment() {
        let config = Config::from_lookup(lookup(&[
            ("MTA_API_KEY", "abc"),
            ("MTA_FEED_BASE_URL", "http://localhost:8080/feeds/"),
            ("CONNECT_TIMEOUT_SECS", "3"),
            ("GTFS_DATA_DIR", "/srv/gtfs"),
        ]))
        .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert_eq!(config.feed_base_url, "http://localhost:8080/feeds");
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.stops_path(), PathBuf::from("/srv/gtfs/stops.txt"));
    }

    #[test]
    fn test_empty_api_key_is_unset() {
        let config = Config::from_lookup(lookup(&[("MTA_API_KEY", "  ")])).unwrap();
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn test_bad_timeout_is_an_error() {
        assert!(Config::from_lookup(lookup(&[("CONNECT_TIMEOUT_SECS", "soon")])).is_err());
    }
}
