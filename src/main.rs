//! CLI entry point for the subway arrivals tool.
//!
//! Builds the station catalog from static GTFS data and reports real-time
//! arrivals for a station, grouped by direction and route.

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use subway_arrivals::arrivals::{ArrivalBoard, StationQuery};
use subway_arrivals::catalog::StaticData;
use subway_arrivals::config::Config;
use subway_arrivals::feeds::{fetch_all, load_feed, subway_sources};
use subway_arrivals::fetch::{BasicClient, HttpClient, auth::ApiKey};
use subway_arrivals::gtfs::{load_stops, load_transfers};
use subway_arrivals::output::{load_catalog, print_json, write_catalog};
use subway_arrivals::stations::build_stations;
use subway_arrivals::stats::FeedStats;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "subway_arrivals")]
#[command(about = "Real-time NYC subway arrivals by station", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the station catalog from stops.txt and transfers.txt
    BuildStations {
        /// Path to stops.txt [default: $GTFS_DATA_DIR/stops.txt]
        #[arg(long)]
        stops: Option<PathBuf>,

        /// Path to transfers.txt [default: $GTFS_DATA_DIR/transfers.txt]
        #[arg(long)]
        transfers: Option<PathBuf>,

        /// Where to write the catalog [default: $GTFS_DATA_DIR/stations.json]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print upcoming trains at a station, grouped by direction and route
    Trains {
        #[command(flatten)]
        query: QueryArgs,

        /// Path to stops.txt [default: $GTFS_DATA_DIR/stops.txt]
        #[arg(long)]
        stops: Option<PathBuf>,

        /// Path to the station catalog [default: $GTFS_DATA_DIR/stations.json]
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Sample rate: query the feeds every X seconds
        #[arg(short = 'r', long, default_value_t = 30)]
        sample_rate: u64,

        /// Number of samples to collect (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 1)]
        num_samples: usize,
    },
    /// Print the station catalog
    Stations {
        /// Path to the station catalog [default: $GTFS_DATA_DIR/stations.json]
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Print the stops table
    Stops {
        /// Path to stops.txt [default: $GTFS_DATA_DIR/stops.txt]
        #[arg(long)]
        stops: Option<PathBuf>,
    },
    /// Summarize a GTFS-RT feed from a file or URL
    Inspect {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct QueryArgs {
    /// Station name as it appears in the catalog
    #[arg(long)]
    station: Option<String>,

    /// Stop name as it appears in stops.txt
    #[arg(long)]
    stop: Option<String>,
}

impl QueryArgs {
    fn into_query(self) -> Option<StationQuery> {
        match (self.station, self.stop) {
            (Some(name), _) => Some(StationQuery::StationName(name)),
            (None, Some(name)) => Some(StationQuery::StopName(name)),
            (None, None) => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/subway_arrivals.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("subway_arrivals.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::BuildStations {
            stops,
            transfers,
            output,
        } => {
            let stops = load_stops(stops.unwrap_or_else(|| config.stops_path()))?;
            let transfers = load_transfers(transfers.unwrap_or_else(|| config.transfers_path()))?;
            let stations = build_stations(&stops, &transfers);
            write_catalog(output.unwrap_or_else(|| config.catalog_path()), &stations)?;
        }
        Commands::Trains {
            query,
            stops,
            catalog,
            sample_rate,
            num_samples,
        } => {
            let Some(query) = query.into_query() else {
                anyhow::bail!("either --station or --stop is required");
            };
            let data = StaticData::load(
                stops.unwrap_or_else(|| config.stops_path()),
                catalog.unwrap_or_else(|| config.catalog_path()),
            )?;
            sample_trains(&config, data, &query, sample_rate, num_samples).await?;
        }
        Commands::Stations { catalog } => {
            let stations = load_catalog(catalog.unwrap_or_else(|| config.catalog_path()))?;
            print_json(&stations)?;
        }
        Commands::Stops { stops } => {
            let stops = load_stops(stops.unwrap_or_else(|| config.stops_path()))?;
            print_json(&stops)?;
        }
        Commands::Inspect { source } => {
            let client = feed_client(&config)?;
            let stats = match load_feed(client.as_ref(), &source).await {
                Ok(feed) => FeedStats::from_feed(&feed),
                Err(e) => {
                    warn!(error = %e, "Feed could not be loaded");
                    FeedStats::from_error("fetch_error", &e.to_string())
                }
            }
            .with_feed_name(&source);
            print_json(&stats)?;
        }
    }

    Ok(())
}

/// Builds the HTTP client for the MTA endpoints, adding the API key header
/// when one is configured.
fn feed_client(config: &Config) -> Result<Arc<dyn HttpClient>> {
    let basic = BasicClient::new(config.connect_timeout, config.request_timeout)?;
    let client: Arc<dyn HttpClient> = match &config.api_key {
        Some(key) => Arc::new(ApiKey::x_api_key(basic, key)?),
        None => {
            warn!("MTA_API_KEY is not set, feeds may reject requests");
            Arc::new(basic)
        }
    };
    Ok(client)
}

/// Fetches all subway feeds, correlates them against `query` and prints the
/// merged board, repeating every `sample_rate` seconds.
#[tracing::instrument(skip(config, data))]
async fn sample_trains(
    config: &Config,
    data: Arc<StaticData>,
    query: &StationQuery,
    sample_rate: u64,
    num_samples: usize,
) -> Result<()> {
    let client = feed_client(config)?;
    let sources = subway_sources(&config.feed_base_url);

    let mut sample_count = 0;

    loop {
        // Check if we've reached the sample limit (0 = infinite)
        if num_samples > 0 && sample_count >= num_samples {
            break;
        }

        sample_count += 1;

        let fetches = fetch_all(client.clone(), &sources).await;
        let board = data.arrivals(query, fetches.iter().filter_map(|f| f.feed()));
        log_board(&board);
        print_json(&board)?;

        // If not the last sample, wait before next iteration
        if num_samples == 0 || sample_count < num_samples {
            info!(sample_rate, "Waiting before next sample");
            tokio::time::sleep(tokio::time::Duration::from_secs(sample_rate)).await;
        }
    }

    Ok(())
}

fn log_board(board: &ArrivalBoard) {
    let now = Utc::now();
    for (direction, routes) in [("north", &board.north), ("south", &board.south)] {
        for (route_id, arrivals) in routes {
            let next_minutes = arrivals.iter().filter_map(|a| a.minutes_away(now)).min();
            info!(
                direction,
                route = %route_id,
                trains = arrivals.len(),
                next_minutes,
                "Upcoming trains"
            );
        }
    }
    if board.is_empty() {
        info!("No upcoming trains");
    }
}
