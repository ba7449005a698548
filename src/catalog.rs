//! Static tables loaded once at startup and shared read-only.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::arrivals::{ArrivalBoard, StationQuery, StopSet, correlate_arrivals, resolve_station_stop_ids};
use crate::gtfs::{Stop, load_stops};
use crate::gtfs_rt::FeedMessage;
use crate::output::load_catalog;
use crate::stations::Station;

#[derive(Debug, Default)]
pub struct StaticData {
    pub stops: Vec<Stop>,
    pub stations: Vec<Station>,
}

impl StaticData {
    /// Reads the stops table and the persisted station catalog. Failing to
    /// read either is fatal to the caller.
    pub fn load(stops_path: impl AsRef<Path>, catalog_path: impl AsRef<Path>) -> Result<Arc<Self>> {
        let stops = load_stops(stops_path)?;
        let stations = load_catalog(catalog_path).context("station catalog unavailable")?;
        info!(stops = stops.len(), stations = stations.len(), "Static data loaded");
        Ok(Arc::new(Self { stops, stations }))
    }

    pub fn resolve(&self, query: &StationQuery) -> StopSet {
        resolve_station_stop_ids(&self.stations, &self.stops, query)
    }

    /// Resolves `query` and correlates it against `feeds`, merged in order.
    pub fn arrivals<'a, I>(&self, query: &StationQuery, feeds: I) -> ArrivalBoard
    where
        I: IntoIterator<Item = &'a FeedMessage>,
    {
        correlate_arrivals(feeds, &self.resolve(query))
    }
}
