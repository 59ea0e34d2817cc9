// src/error.rs
// =============================================================================
// Fatal faults of one archive invocation.
//
// Only faults that stop the whole archive live here. A resource that cannot
// be fetched is NOT an error at this level: it is recorded in the report and
// the page keeps pointing at the remote URL (see archive::FetchError).
// =============================================================================

use std::path::PathBuf;

use thiserror::Error;

use crate::archive::FetchError;
use crate::markup::ParseError;

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The page URL is not an absolute http(s) URL.
    #[error("invalid page URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The destination root does not exist or is not a directory.
    #[error("destination directory {path} does not exist")]
    DestinationMissing { path: PathBuf },

    /// Creating or writing part of the archive failed.
    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The page itself could not be fetched, so there is nothing to archive.
    #[error("could not fetch page {url}: {source}")]
    PageFetch {
        url: String,
        #[source]
        source: FetchError,
    },

    /// The page markup is malformed.
    #[error("could not parse page: {0}")]
    Parse(#[from] ParseError),
}

impl ArchiveError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Filesystem {
            path: path.into(),
            source,
        }
    }
}
