use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::arrivals::{Direction, direction_of};
use crate::gtfs_rt::FeedMessage;

/// Structural summary of one decoded feed.
#[derive(Debug, Default, Serialize)]
pub struct FeedStats {
    pub timestamp: DateTime<Utc>,
    pub feed_name: Option<String>,
    pub feed_timestamp: Option<DateTime<Utc>>,
    pub total_entities: usize,

    // entity types
    pub trip_updates: usize,
    pub vehicles: usize,
    pub alerts: usize,

    // trip update fields
    pub stop_time_updates: usize,
    pub without_trip_id: usize,
    pub without_route_id: usize,
    pub without_stop_time_updates: usize,
    pub northbound: usize,
    pub southbound: usize,
    pub malformed_trip_ids: usize,
    pub trip_updates_with_vehicle: usize,

    // vehicle fields
    pub vehicles_with_trip: usize,
    pub vehicles_with_position: usize,
    pub vehicles_with_stop_id: usize,

    // error tracking
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

impl FeedStats {
    pub fn from_feed(feed: &FeedMessage) -> Self {
        let mut s = FeedStats {
            timestamp: Utc::now(),
            feed_timestamp: feed
                .header
                .timestamp
                .and_then(|t| i64::try_from(t).ok())
                .and_then(|t| DateTime::from_timestamp(t, 0)),
            total_entities: feed.entity.len(),
            ..Default::default()
        };

        let vehicle_trip_ids: HashSet<&str> = feed
            .entity
            .iter()
            .filter_map(|e| e.vehicle.as_ref()?.trip.as_ref()?.trip_id.as_deref())
            .collect();

        for e in &feed.entity {
            if let Some(update) = &e.trip_update {
                s.trip_updates += 1;
                s.stop_time_updates += update.stop_time_update.len();

                if update.trip.route_id.is_none() {
                    s.without_route_id += 1;
                }

                if update.stop_time_update.is_empty() {
                    s.without_stop_time_updates += 1;
                }

                if update
                    .trip
                    .trip_id
                    .as_deref()
                    .is_some_and(|id| vehicle_trip_ids.contains(id))
                {
                    s.trip_updates_with_vehicle += 1;
                }

                match update.trip.trip_id.as_deref().map(direction_of) {
                    None => s.without_trip_id += 1,
                    Some(Ok(Some(Direction::North))) => s.northbound += 1,
                    Some(Ok(Some(Direction::South))) => s.southbound += 1,
                    Some(Ok(None)) => {}
                    Some(Err(_)) => s.malformed_trip_ids += 1,
                }
            }

            if let Some(v) = &e.vehicle {
                s.vehicles += 1;

                if v.trip.is_some() {
                    s.vehicles_with_trip += 1;
                }

                if v.position.is_some() {
                    s.vehicles_with_position += 1;
                }

                if v.stop_id.is_some() {
                    s.vehicles_with_stop_id += 1;
                }
            }

            if e.alert.is_some() {
                s.alerts += 1;
            }
        }

        s
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Share of trip updates whose trip id also appears on a vehicle entity.
    pub fn vehicle_coverage_pct(&self) -> f64 {
        Self::pct(self.trip_updates_with_vehicle, self.trip_updates)
    }

    /// Create an error record with timestamp and error information
    pub fn from_error(error_type: &str, error_message: &str) -> Self {
        FeedStats {
            timestamp: Utc::now(),
            error_type: Some(error_type.to_string()),
            error_message: Some(error_message.to_string()),
            ..Default::default()
        }
    }

    pub fn with_feed_name(mut self, feed_name: &str) -> Self {
        self.feed_name = Some(feed_name.to_string());
        self
    }
}
