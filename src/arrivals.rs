//! Correlates real-time trip updates with vehicle positions and buckets the
//! resulting arrivals by direction and route.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::error::ArrivalError;
use crate::gtfs::{Stop, StopId};
use crate::gtfs_rt::trip_update::StopTimeUpdate;
use crate::gtfs_rt::{FeedMessage, TripUpdate, VehiclePosition};
use crate::stations::Station;

/// What the caller asked arrivals for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationQuery {
    /// Matched against [`Station::name`]; the first match wins.
    StationName(String),
    /// Matched against every stop's `stop_name`.
    StopName(String),
}

/// The set of real-time stop ids an arrival must touch to be reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopSet(HashSet<String>);

impl StopSet {
    pub fn contains(&self, stop_id: &str) -> bool {
        self.0.contains(stop_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> FromIterator<&'a StopId> for StopSet {
    fn from_iter<I: IntoIterator<Item = &'a StopId>>(iter: I) -> Self {
        StopSet(iter.into_iter().map(StopId::to_string).collect())
    }
}

impl<'a> FromIterator<&'a str> for StopSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        StopSet(iter.into_iter().map(str::to_string).collect())
    }
}

/// Resolves a station or stop name to the stop ids whose arrivals should be
/// reported. An unknown name resolves to an empty set.
pub fn resolve_station_stop_ids(
    stations: &[Station],
    stops: &[Stop],
    query: &StationQuery,
) -> StopSet {
    let stop_ids: StopSet = match query {
        StationQuery::StationName(name) => stations
            .iter()
            .find(|station| station.name.as_deref() == Some(name.as_str()))
            .map(|station| station.stop_ids.iter().collect::<StopSet>())
            .unwrap_or_default(),
        StationQuery::StopName(name) => stops
            .iter()
            .filter(|stop| stop.stop_name.as_deref() == Some(name.as_str()))
            .map(|stop| &stop.stop_id)
            .collect(),
    };

    if stop_ids.is_empty() {
        info!(?query, "Query matched no stops");
    } else {
        debug!(?query, stop_ids = stop_ids.len(), "Query resolved");
    }

    stop_ids
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    South,
}

/// Reads the travel direction encoded in an NYCT trip id such as
/// `"A20..N03R"`: the first character after `".."`.
///
/// `Ok(None)` means the trip runs in neither direction and is not reported.
pub fn direction_of(trip_id: &str) -> Result<Option<Direction>, ArrivalError> {
    let marker = trip_id
        .split("..")
        .nth(1)
        .and_then(|rest| rest.chars().next())
        .ok_or_else(|| ArrivalError::MalformedTripId {
            trip_id: trip_id.to_string(),
        })?;

    Ok(match marker {
        'N' => Some(Direction::North),
        'S' => Some(Direction::South),
        _ => None,
    })
}

/// A trip update paired with its vehicle and the stop update for the
/// queried station.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Arrival {
    pub id: String,
    pub trip_update: TripUpdate,
    pub vehicle: Option<VehiclePosition>,
    pub stop_update: StopTimeUpdate,
}

impl Arrival {
    pub fn trip_id(&self) -> &str {
        self.trip_update.trip.trip_id.as_deref().unwrap_or_default()
    }

    pub fn route_id(&self) -> &str {
        self.trip_update.trip.route_id.as_deref().unwrap_or_default()
    }

    /// Predicted arrival at the station, falling back to the departure time.
    pub fn predicted_time(&self) -> Option<DateTime<Utc>> {
        let update = &self.stop_update;
        let seconds = update
            .arrival
            .as_ref()
            .and_then(|e| e.time)
            .or_else(|| update.departure.as_ref().and_then(|e| e.time))?;
        DateTime::from_timestamp(seconds, 0)
    }

    /// Whole minutes until [`Arrival::predicted_time`], negative once passed.
    pub fn minutes_away(&self, now: DateTime<Utc>) -> Option<i64> {
        self.predicted_time().map(|t| (t - now).num_minutes())
    }
}

/// Arrivals grouped by direction, then by route id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArrivalBoard {
    pub north: BTreeMap<String, Vec<Arrival>>,
    pub south: BTreeMap<String, Vec<Arrival>>,
}

impl ArrivalBoard {
    pub fn is_empty(&self) -> bool {
        self.north.is_empty() && self.south.is_empty()
    }

    pub fn len(&self) -> usize {
        self.north.values().chain(self.south.values()).map(Vec::len).sum()
    }

    fn push(&mut self, direction: Direction, arrival: Arrival) {
        let bucket = match direction {
            Direction::North => &mut self.north,
            Direction::South => &mut self.south,
        };
        bucket
            .entry(arrival.route_id().to_string())
            .or_default()
            .push(arrival);
    }

    /// Folds another board into this one. A route present in both keeps
    /// only `other`'s list.
    pub fn merge(&mut self, other: ArrivalBoard) {
        self.north.extend(other.north);
        self.south.extend(other.south);
    }
}

fn first_matching_stop<'a>(update: &'a TripUpdate, stop_ids: &StopSet) -> Option<&'a StopTimeUpdate> {
    update
        .stop_time_update
        .iter()
        .find(|stu| stu.stop_id.as_deref().is_some_and(|id| stop_ids.contains(id)))
}

/// Builds the arrival board for one decoded feed.
pub fn correlate(feed: &FeedMessage, stop_ids: &StopSet) -> ArrivalBoard {
    let mut vehicles: HashMap<&str, &VehiclePosition> = HashMap::new();
    for entity in &feed.entity {
        let Some(vehicle) = &entity.vehicle else {
            continue;
        };
        if let Some(trip_id) = vehicle.trip.as_ref().and_then(|t| t.trip_id.as_deref()) {
            vehicles.entry(trip_id).or_insert(vehicle);
        }
    }

    let mut board = ArrivalBoard::default();

    for entity in &feed.entity {
        let Some(update) = &entity.trip_update else {
            continue;
        };
        let Some(trip_id) = update.trip.trip_id.as_deref() else {
            continue;
        };
        let Some(stop_update) = first_matching_stop(update, stop_ids) else {
            continue;
        };

        let direction = match direction_of(trip_id) {
            Ok(Some(direction)) => direction,
            Ok(None) => continue,
            Err(e) => {
                warn!(entity = %entity.id, error = %e, "Dropping arrival");
                continue;
            }
        };

        let arrival = Arrival {
            id: entity.id.clone(),
            trip_update: update.clone(),
            vehicle: vehicles.get(trip_id).map(|v| (*v).clone()),
            stop_update: stop_update.clone(),
        };

        board.push(direction, arrival);
    }

    debug!(
        entities = feed.entity.len(),
        vehicles = vehicles.len(),
        arrivals = board.len(),
        "Feed correlated"
    );

    board
}

/// Builds one board from several feeds, merged in the order given.
pub fn correlate_arrivals<'a, I>(feeds: I, stop_ids: &StopSet) -> ArrivalBoard
where
    I: IntoIterator<Item = &'a FeedMessage>,
{
    feeds
        .into_iter()
        .fold(ArrivalBoard::default(), |mut board, feed| {
            board.merge(correlate(feed, stop_ids));
            board
        })
}
