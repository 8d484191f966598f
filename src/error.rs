use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot access history store {path}: {source}")]
    HistoryIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("history store is not valid JSON: {0}")]
    HistoryFormat(#[from] serde_json::Error),

    #[error("cannot write {path}: {source}")]
    ExportIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Calculate {0} first")]
    NothingToExport(&'static str),

    #[error("Search for comparables first")]
    NoSearchResults,

    #[error("Please enter a property address")]
    MissingAddress,

    #[error("Comparable search failed: {0}")]
    Search(String),
}

pub type Result<T> = std::result::Result<T, Error>;
