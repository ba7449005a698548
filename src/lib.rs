pub mod arrivals;
pub mod catalog;
pub mod config;
pub mod error;
pub mod feeds;
pub mod fetch;
pub mod gtfs;
pub mod output;
pub mod parser;
pub mod stations;
pub mod stats;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
