//! The upstream MTA subway feeds and concurrent retrieval of all of them.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::{Instrument, debug, error, info, warn};

use crate::fetch::{HttpClient, fetch_bytes};
use crate::gtfs_rt::FeedMessage;
use crate::parser::parse_feed;

/// Feed paths under the MTA base URL, in merge order.
pub const SUBWAY_FEEDS: &[(&str, &str)] = &[
    ("ace", "nyct%2Fgtfs-ace"),
    ("bdfm", "nyct%2Fgtfs-bdfm"),
    ("nqrw", "nyct%2Fgtfs-nqrw"),
    ("numbered", "nyct%2Fgtfs"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// The subway feeds rooted at `base_url`, in the fixed merge order.
pub fn subway_sources(base_url: &str) -> Vec<FeedSource> {
    SUBWAY_FEEDS
        .iter()
        .map(|(name, path)| FeedSource::new(name, &format!("{base_url}/{path}")))
        .collect()
}

/// Outcome of fetching and decoding one source.
#[derive(Debug)]
pub struct FeedFetch {
    pub source: FeedSource,
    pub result: Result<FeedMessage>,
}

impl FeedFetch {
    pub fn feed(&self) -> Option<&FeedMessage> {
        self.result.as_ref().ok()
    }
}

/// Loads feed bytes from a local file path or fetches them over HTTP.
pub async fn load_feed<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<FeedMessage> {
    let bytes = if url.starts_with("http") {
        fetch_bytes(client, url).await?
    } else {
        tokio::fs::read(url).await?.into()
    };
    debug!(bytes = bytes.len(), "Feed bytes received, parsing");
    parse_feed(&bytes)
}

/// Fetches every source concurrently. The returned vector follows the order
/// of `sources`, whatever order the fetches complete in; a failed source is
/// logged and reported in its slot without affecting the others.
#[tracing::instrument(skip_all, fields(sources = sources.len()))]
pub async fn fetch_all(client: Arc<dyn HttpClient>, sources: &[FeedSource]) -> Vec<FeedFetch> {
    let mut tasks = Vec::with_capacity(sources.len());

    for source in sources {
        let client = client.clone();
        let url = source.url.clone();
        let feed_span = tracing::info_span!("fetch_feed", feed = %source.name);

        let task = tokio::spawn(
            async move {
                let start = Instant::now();
                let result = load_feed(client.as_ref(), &url).await;
                let elapsed = start.elapsed();
                if elapsed.as_secs() > 15 {
                    warn!(elapsed_secs = elapsed.as_secs(), "Feed fetch was slow");
                }
                match &result {
                    Ok(feed) => debug!(entity_count = feed.entity.len(), "Feed parsed successfully"),
                    Err(e) => error!(error = %e, "Feed fetch failed"),
                }
                result
            }
            .instrument(feed_span),
        );

        tasks.push((source.clone(), task));
    }

    let mut fetches = Vec::with_capacity(tasks.len());
    for (source, task) in tasks {
        let result = match task.await {
            Ok(result) => result,
            Err(e) => Err(anyhow::anyhow!("feed task for {} panicked: {e}", source.name)),
        };
        fetches.push(FeedFetch { source, result });
    }

    let failed = fetches.iter().filter(|f| f.result.is_err()).count();
    info!(fetched = fetches.len() - failed, failed, "Feeds fetched");

    fetches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs_rt::{FeedEntity, FeedHeader};
    use prost::Message;
    use std::io::Write;

    #[test]
    fn test_subway_sources_keep_merge_order() {
        let sources = subway_sources("https://example.test/feeds");

        let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["ace", "bdfm", "nqrw", "numbered"]);
        assert_eq!(sources[3].url, "https://example.test/feeds/nyct%2Fgtfs");
    }

    #[tokio::test]
    async fn test_fetch_all_isolates_failures_and_keeps_order() {
        let feed = FeedMessage {
            header: FeedHeader {
                gtfs_realtime_version: "1.0".to_string(),
                ..Default::default()
            },
            entity: vec![FeedEntity {
                id: "e1".to_string(),
                ..Default::default()
            }],
        };
        let mut good = tempfile::NamedTempFile::new().unwrap();
        good.write_all(&feed.encode_to_vec()).unwrap();
        let mut corrupt = tempfile::NamedTempFile::new().unwrap();
        corrupt.write_all(&[0xFF, 0xFE, 0x00, 0x01]).unwrap();

        let sources = vec![
            FeedSource::new("missing", "/nonexistent/feed.pb"),
            FeedSource::new("good", good.path().to_str().unwrap()),
            FeedSource::new("corrupt", corrupt.path().to_str().unwrap()),
        ];
        let client: Arc<dyn HttpClient> = Arc::new(
            crate::fetch::BasicClient::new(
                std::time::Duration::from_secs(1),
                std::time::Duration::from_secs(1),
            )
            .unwrap(),
        );

        let fetches = fetch_all(client, &sources).await;

        assert_eq!(fetches.len(), 3);
        assert!(fetches[0].feed().is_none());
        assert_eq!(fetches[1].source.name, "good");
        assert_eq!(fetches[1].feed().unwrap().entity.len(), 1);
        assert!(fetches[2].feed().is_none());
    }
}
