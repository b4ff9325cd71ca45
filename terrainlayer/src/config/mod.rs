//! Configuration file support.
//!
//! Providers and the CLI are configured from an INI file:
//!
//! ```ini
//! [terrain]
//! id = world
//! tile_cell_num = 33
//! decode_concurrency = 10
//! max_concurrent_requests = 6
//! request_timeout_secs = 30
//!
//! [logging]
//! level = info
//! file = /var/log/terrainlayer.log
//!
//! [source:srtm]
//! url = https://tiles.example.com/dem/{TileMatrix}/{TileRow}/{TileCol}
//! west = -180
//! south = -90
//! east = 180
//! north = 90
//! min_level = 1
//! max_level = 12
//! priority = 1
//! tile_matrix_labels = 1,2,3
//! ```
//!
//! Source rectangles are written in degrees. Source sections are kept in file
//! order, which decides ties between equal priorities.

mod file;

pub use file::{ConfigFile, LoggingSettings, TerrainSettings, SOURCE_SECTION_PREFIX};

use std::path::PathBuf;

use thiserror::Error;

use crate::source::SourceError;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid INI.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// A required key is absent.
    #[error("Missing key '{key}' in section [{section}]")]
    MissingKey { section: String, key: String },

    /// A key has a value of the wrong type.
    #[error("Invalid value '{value}' for '{key}' in section [{section}]")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    /// A source section describes an invalid source.
    #[error("Invalid source in section [{section}]: {source}")]
    Source {
        section: String,
        #[source]
        source: SourceError,
    },
}
