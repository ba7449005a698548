//! Persistence of the station catalog and JSON output of query results.

use anyhow::Result;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::error::CatalogError;
use crate::stations::Station;

/// Serializes `value` as tab-indented JSON.
pub fn write_json<W: Write, T: Serialize + ?Sized>(writer: W, value: &T) -> Result<()> {
    let mut serializer =
        serde_json::Serializer::with_formatter(writer, PrettyFormatter::with_indent(b"\t"));
    value.serialize(&mut serializer)?;
    let mut writer = serializer.into_inner();
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Prints `value` as JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    write_json(std::io::stdout().lock(), value)
}

/// Writes the station catalog to `path`, replacing any previous catalog.
pub fn write_catalog(path: impl AsRef<Path>, stations: &[Station]) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let file = File::create(path)?;
    write_json(BufWriter::new(file), stations)?;

    info!(path = %path.display(), stations = stations.len(), "Station catalog written");
    Ok(())
}

pub fn load_catalog(path: impl AsRef<Path>) -> Result<Vec<Station>, CatalogError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let stations: Vec<Station> =
        serde_json::from_str(&content).map_err(|source| CatalogError::Decode {
            path: path.display().to_string(),
            source,
        })?;

    debug!(path = %path.display(), stations = stations.len(), "Station catalog loaded");
    Ok(stations)
}
