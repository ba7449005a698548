//! Protobuf decoding of GTFS Realtime feeds.

use anyhow::{Context, Result};
use prost::Message;

use crate::gtfs_rt::FeedMessage;

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// NYCT extension fields are not part of the compiled schema and are skipped.
///
/// # Errors
///
/// Returns an error if the bytes are not valid protobuf for a `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage> {
    FeedMessage::decode(bytes).with_context(|| format!("invalid FeedMessage ({} bytes)", bytes.len()))
}
