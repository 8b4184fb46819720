use polars::error::PolarsError;
use std::io::Error as IoError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Play data is missing required column '{0}'")]
    MissingColumn(String),

    #[error("No seasons requested")]
    NoSeasons,

    #[error("Cannot grade an empty series")]
    EmptySeries,

    #[error("Download of {url} failed with status {status}")]
    Download { url: String, status: u16 },

    #[error("Upsert of '{id}' failed with status {status}: {body}")]
    Store {
        id: String,
        status: u16,
        body: String,
    },
}
