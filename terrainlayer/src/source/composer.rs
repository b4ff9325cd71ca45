//! Composition of several terrain sources into one coverage.

use crate::coord::Rectangle;

use super::types::{ComposedSource, TerrainSource};
use super::SourceError;

/// Convert a service level to an internal zero-based tile level.
///
/// Terrain services number their levels from 1 while the tiling scheme
/// starts at 0. Service level 0 saturates at internal level 0.
#[inline]
pub fn shift_service_level(service_level: u32) -> u32 {
    service_level.saturating_sub(1)
}

/// Terrain sources in selection order with their composite coverage.
///
/// Sources are ordered by descending priority; sources with equal priority
/// keep their registration order. The composite rectangle and level range are
/// computed once, seeded from the highest-priority source and only ever
/// widened by the others.
#[derive(Debug, Clone)]
pub struct SourceSet {
    sources: Vec<ComposedSource>,
    rectangle: Rectangle,
    min_level: u32,
    max_level: u32,
}

impl SourceSet {
    /// Validate, shift and order the given sources.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NoSources`] for an empty list, and a
    /// per-source error for inverted level ranges or invalid rectangles.
    pub fn compose(descriptors: Vec<TerrainSource>) -> Result<Self, SourceError> {
        if descriptors.is_empty() {
            return Err(SourceError::NoSources);
        }

        let mut sources = descriptors
            .into_iter()
            .map(register)
            .collect::<Result<Vec<_>, _>>()?;

        // Vec::sort_by is stable, so equal priorities keep registration order.
        sources.sort_by(|a, b| b.priority().cmp(&a.priority()));

        let seed = &sources[0];
        let (rectangle, min_level, max_level) = sources.iter().skip(1).fold(
            (seed.rectangle(), seed.min_level(), seed.max_level()),
            |(rectangle, min_level, max_level), source| {
                (
                    rectangle.union(&source.rectangle()),
                    min_level.min(source.min_level()),
                    max_level.max(source.max_level()),
                )
            },
        );

        tracing::info!(
            sources = sources.len(),
            min_level,
            max_level,
            rectangle = %rectangle,
            "Composed terrain sources"
        );

        Ok(Self {
            sources,
            rectangle,
            min_level,
            max_level,
        })
    }

    /// Sources in selection order.
    pub fn sources(&self) -> &[ComposedSource] {
        &self.sources
    }

    /// Union of all source rectangles.
    pub fn rectangle(&self) -> Rectangle {
        self.rectangle
    }

    /// Lowest internal level any source serves.
    pub fn min_level(&self) -> u32 {
        self.min_level
    }

    /// Highest internal level any source serves.
    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// First source, in priority order, whose rectangle overlaps `tile`.
    pub fn select(&self, tile: &Rectangle) -> Option<&ComposedSource> {
        self.sources
            .iter()
            .find(|source| tile.intersection(&source.rectangle()).is_some())
    }
}

fn register(descriptor: TerrainSource) -> Result<ComposedSource, SourceError> {
    if !descriptor.rectangle.is_valid() {
        return Err(SourceError::InvalidRectangle {
            source_name: descriptor.name,
        });
    }

    let min_level = descriptor.min_level.map(shift_service_level).unwrap_or(0);
    let max_level = shift_service_level(descriptor.max_level);
    if min_level > max_level {
        return Err(SourceError::InvalidLevelRange {
            source_name: descriptor.name,
            min_level,
            max_level,
        });
    }

    Ok(ComposedSource::new(descriptor, min_level, max_level))
}
