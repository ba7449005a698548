use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArrivalError {
    #[error("Trip id {trip_id:?} has no direction after the \"..\" delimiter")]
    MalformedTripId { trip_id: String },
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read station catalog {path:?}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Station catalog {path:?} is not valid JSON")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
