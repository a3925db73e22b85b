//! Errors that abort a decode call.
//!
//! Classified per-field failures are not errors at this level: they are data,
//! carried by [`Tracked`](crate::Tracked) values. What remains here is input
//! that could not be read or parsed, and raw decoder errors that escaped the
//! decision table (untracked fields, unclassified `custom` errors).

use thiserror::Error;

use crate::path::{location, Path};

#[derive(Debug, Error)]
pub enum Error {
    /// The input is not well-formed JSON.
    #[error("malformed JSON: {0}")]
    Syntax(#[source] serde_json::Error),

    /// The input could not be read.
    #[error("failed to read JSON input: {0}")]
    Io(#[source] serde_json::Error),

    /// A raw decoder error nothing absorbed.
    #[error("at JSON path {} → {source}", location(.path))]
    Decode {
        /// Innermost path the error surfaced at.
        path: Path,
        source: serde_json::Error,
    },
}

impl Error {
    /// Sort a `serde_json` parse error into syntax vs. I/O.
    pub(crate) fn parse(err: serde_json::Error) -> Self {
        if err.is_io() { Self::Io(err) } else { Self::Syntax(err) }
    }

    /// Path of an escaped decode error.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Decode { path, .. } => Some(path),
            Self::Syntax(_) | Self::Io(_) => None,
        }
    }
}

/// Result alias for decode entry points.
pub type Result<T> = std::result::Result<T, Error>;
