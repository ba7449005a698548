//! Static GTFS reference tables: `stops.txt` and `transfers.txt`.
//!
//! Identifiers that parse as unsigned integers are coerced to
//! [`StopId::Numeric`]; empty fields decode as `None`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// A GTFS stop identifier.
///
/// Always serialized as a string, whatever the internal representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StopId {
    Numeric(u64),
    Code(String),
}

impl From<String> for StopId {
    fn from(raw: String) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<u64>() {
            Ok(n) => StopId::Numeric(n),
            Err(_) => StopId::Code(trimmed.to_string()),
        }
    }
}

impl From<&str> for StopId {
    fn from(raw: &str) -> Self {
        StopId::from(raw.to_string())
    }
}

impl From<StopId> for String {
    fn from(id: StopId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopId::Numeric(n) => write!(f, "{n}"),
            StopId::Code(code) => f.write_str(code),
        }
    }
}

/// A row of `stops.txt`: a platform, a parent station or an entrance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub stop_id: StopId,
    pub stop_name: Option<String>,
    pub stop_lat: Option<f64>,
    pub stop_lon: Option<f64>,
    #[serde(default)]
    pub parent_station: Option<StopId>,
}

/// A row of `transfers.txt`. Treated as an undirected edge.
///
/// Only the endpoints are decoded. `transfer_type`, `min_transfer_time` and
/// any other columns are skipped, so odd values there never reject the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub from_stop_id: StopId,
    pub to_stop_id: StopId,
}

/// Reads every row of a GTFS CSV table, ignoring columns the record type
/// does not name.
pub fn read_table<T, R>(reader: R) -> Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
    R: Read,
{
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        rows.push(result?);
    }

    Ok(rows)
}

pub fn load_stops(path: impl AsRef<Path>) -> Result<Vec<Stop>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open stops table {}", path.display()))?;
    let stops: Vec<Stop> = read_table(file)
        .with_context(|| format!("failed to decode stops table {}", path.display()))?;
    debug!(path = %path.display(), rows = stops.len(), "Loaded stops");
    Ok(stops)
}

pub fn load_transfers(path: impl AsRef<Path>) -> Result<Vec<Transfer>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open transfers table {}", path.display()))?;
    let transfers: Vec<Transfer> = read_table(file)
        .with_context(|| format!("failed to decode transfers table {}", path.display()))?;
    debug!(path = %path.display(), rows = transfers.len(), "Loaded transfers");
    Ok(transfers)
}
