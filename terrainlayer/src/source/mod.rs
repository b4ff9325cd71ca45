//! Terrain source registration and selection.
//!
//! A terrain provider draws elevation data from several independently hosted
//! services. Each one covers a rectangle of the globe over a range of levels.
//! This module validates the service descriptors, shifts their levels into
//! the internal tile numbering, orders them by priority and computes the
//! combined coverage.
//!
//! ```
//! use terrainlayer::coord::Rectangle;
//! use terrainlayer::source::{SourceSet, TerrainSource, UrlTemplate};
//!
//! let world = TerrainSource::new(
//!     "world",
//!     Rectangle::MAX_VALUE,
//!     10,
//!     UrlTemplate::parse("https://dem.example.com/{TileMatrix}/{TileRow}/{TileCol}").unwrap(),
//! )
//! .with_min_level(1);
//!
//! let set = SourceSet::compose(vec![world]).unwrap();
//! assert_eq!(set.min_level(), 0);
//! assert_eq!(set.max_level(), 9);
//! ```

mod composer;
mod types;

pub use composer::{shift_service_level, SourceSet};
pub use types::{
    ComposedSource, TerrainSource, UrlTemplate, TILE_COL_KEY, TILE_MATRIX_KEY, TILE_ROW_KEY,
};

use thiserror::Error;

/// Errors in terrain source configuration.
///
/// All of these are raised while building a provider, never per request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    /// No sources were registered.
    #[error("At least one terrain source is required")]
    NoSources,

    /// Minimum level above maximum level after shifting.
    #[error("Source '{source_name}' has min level {min_level} above max level {max_level}")]
    InvalidLevelRange {
        source_name: String,
        min_level: u32,
        max_level: u32,
    },

    /// Rectangle bounds are not finite or are inverted.
    #[error("Source '{source_name}' has an invalid rectangle")]
    InvalidRectangle { source_name: String },

    /// URL template is empty.
    #[error("URL template is empty")]
    EmptyUrlTemplate,

    /// URL template has an unterminated placeholder.
    #[error("Malformed URL template: {0}")]
    MalformedUrlTemplate(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SourceError::InvalidLevelRange {
            source_name: "srtm".to_string(),
            min_level: 5,
            max_level: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("srtm"));
        assert!(msg.contains('5'));
        assert!(msg.contains('2'));
    }
}
