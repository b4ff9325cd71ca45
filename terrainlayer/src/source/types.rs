//! Terrain source descriptors and URL templates.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coord::{Rectangle, TileCoord};

use super::SourceError;

/// Placeholder replaced by the tile-matrix label (or decimal level).
pub const TILE_MATRIX_KEY: &str = "TileMatrix";

/// Placeholder replaced by the tile row (`y`).
pub const TILE_ROW_KEY: &str = "TileRow";

/// Placeholder replaced by the tile column (`x`).
pub const TILE_COL_KEY: &str = "TileCol";

/// A URL with `{Key}` placeholders.
///
/// Only `{TileMatrix}`, `{TileRow}` and `{TileCol}` are substituted; any other
/// placeholder is left in place so service-specific parameters survive.
///
/// # Example
///
/// ```
/// use terrainlayer::source::UrlTemplate;
///
/// let template = UrlTemplate::parse("https://dem.example.com/{TileMatrix}/{TileRow}/{TileCol}.bin").unwrap();
/// assert_eq!(
///     template.resolve("7", 12, 40),
///     "https://dem.example.com/7/12/40.bin"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UrlTemplate(String);

impl UrlTemplate {
    /// Validate and wrap a template string.
    ///
    /// Rejects empty templates and templates with an unterminated `{`.
    pub fn parse(template: impl Into<String>) -> Result<Self, SourceError> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(SourceError::EmptyUrlTemplate);
        }

        let mut open = false;
        for c in template.chars() {
            match c {
                '{' if open => return Err(SourceError::MalformedUrlTemplate(template)),
                '{' => open = true,
                '}' => open = false,
                _ => {}
            }
        }
        if open {
            return Err(SourceError::MalformedUrlTemplate(template));
        }

        Ok(Self(template))
    }

    /// Substitute the tile placeholders.
    pub fn resolve(&self, tile_matrix: &str, row: u32, col: u32) -> String {
        self.0
            .replace(&format!("{{{}}}", TILE_MATRIX_KEY), tile_matrix)
            .replace(&format!("{{{}}}", TILE_ROW_KEY), &row.to_string())
            .replace(&format!("{{{}}}", TILE_COL_KEY), &col.to_string())
    }

    /// The raw template string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UrlTemplate {
    type Error = SourceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<UrlTemplate> for String {
    fn from(template: UrlTemplate) -> Self {
        template.0
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One terrain service covering part of the globe.
///
/// Levels are given in the service's own numbering, which starts one above
/// the internal zero-based tile levels. [`SourceSet`](super::SourceSet)
/// shifts them when the source is registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainSource {
    /// Display name used in logs.
    pub name: String,

    /// Area covered by the service, in radians.
    pub rectangle: Rectangle,

    /// Lowest level served. `None` means the service starts at the root.
    #[serde(default)]
    pub min_level: Option<u32>,

    /// Highest level served.
    pub max_level: u32,

    /// Selection priority; higher wins.
    #[serde(default)]
    pub priority: i32,

    /// Tile URL template.
    pub url: UrlTemplate,

    /// Per-level tile-matrix labels, indexed by internal level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_matrix_labels: Option<Vec<String>>,
}

impl TerrainSource {
    /// Create a source with no minimum level, priority 0 and no label table.
    pub fn new(name: impl Into<String>, rectangle: Rectangle, max_level: u32, url: UrlTemplate) -> Self {
        Self {
            name: name.into(),
            rectangle,
            min_level: None,
            max_level,
            priority: 0,
            url,
            tile_matrix_labels: None,
        }
    }

    /// Set the minimum service level.
    pub fn with_min_level(mut self, min_level: u32) -> Self {
        self.min_level = Some(min_level);
        self
    }

    /// Set the selection priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the per-level tile-matrix labels.
    pub fn with_tile_matrix_labels(mut self, labels: Vec<String>) -> Self {
        self.tile_matrix_labels = Some(labels);
        self
    }
}

/// A registered source with levels shifted to internal numbering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposedSource {
    descriptor: TerrainSource,
    min_level: u32,
    max_level: u32,
}

impl ComposedSource {
    pub(super) fn new(descriptor: TerrainSource, min_level: u32, max_level: u32) -> Self {
        Self {
            descriptor,
            min_level,
            max_level,
        }
    }

    /// Source name.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Covered rectangle in radians.
    pub fn rectangle(&self) -> Rectangle {
        self.descriptor.rectangle
    }

    /// Lowest internal level served.
    pub fn min_level(&self) -> u32 {
        self.min_level
    }

    /// Highest internal level served.
    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// Selection priority.
    pub fn priority(&self) -> i32 {
        self.descriptor.priority
    }

    /// Descriptor as registered, before the level shift.
    pub fn descriptor(&self) -> &TerrainSource {
        &self.descriptor
    }

    /// Tile-matrix label for an internal level.
    ///
    /// Falls back to the decimal level when the source has no label table or
    /// the table does not reach this level.
    pub fn tile_matrix_label(&self, level: u32) -> String {
        self.descriptor
            .tile_matrix_labels
            .as_ref()
            .and_then(|labels| labels.get(level as usize))
            .cloned()
            .unwrap_or_else(|| level.to_string())
    }

    /// Concrete URL for a tile.
    pub fn tile_url(&self, coord: TileCoord) -> String {
        let tile_matrix = self.tile_matrix_label(coord.level);
        self.descriptor.url.resolve(&tile_matrix, coord.y, coord.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> UrlTemplate {
        UrlTemplate::parse("http://dem/{TileMatrix}/{TileRow}/{TileCol}").unwrap()
    }

    #[test]
    fn test_template_resolve() {
        assert_eq!(template().resolve("L05", 3, 9), "http://dem/L05/3/9");
    }

    #[test]
    fn test_template_keeps_unknown_placeholders() {
        let t = UrlTemplate::parse("http://dem/{TileMatrix}?key={ApiKey}").unwrap();
        assert_eq!(t.resolve("4", 0, 0), "http://dem/4?key={ApiKey}");
    }

    #[test]
    fn test_template_rejects_empty() {
        assert!(matches!(
            UrlTemplate::parse("   "),
            Err(SourceError::EmptyUrlTemplate)
        ));
    }

    #[test]
    fn test_template_rejects_unterminated_placeholder() {
        assert!(matches!(
            UrlTemplate::parse("http://dem/{TileMatrix/{TileRow}"),
            Err(SourceError::MalformedUrlTemplate(_))
        ));
        assert!(matches!(
            UrlTemplate::parse("http://dem/{TileRow"),
            Err(SourceError::MalformedUrlTemplate(_))
        ));
    }

    #[test]
    fn test_label_lookup_and_fallback() {
        let source = TerrainSource::new("a", Rectangle::MAX_VALUE, 3, template())
            .with_tile_matrix_labels(vec!["EPSG:4326:0".into(), "EPSG:4326:1".into()]);
        let composed = ComposedSource::new(source, 0, 2);

        assert_eq!(composed.tile_matrix_label(1), "EPSG:4326:1");
        assert_eq!(composed.tile_matrix_label(2), "2");
    }

    #[test]
    fn test_tile_url_uses_row_for_y_and_col_for_x() {
        let source = TerrainSource::new("a", Rectangle::MAX_VALUE, 10, template());
        let composed = ComposedSource::new(source, 0, 9);
        assert_eq!(composed.tile_url(TileCoord::new(5, 2, 4)), "http://dem/4/2/5");
    }

    #[test]
    fn test_descriptor_deserializes_with_defaults() {
        let json = r#"{
            "name": "srtm",
            "rectangle": {"west": -1.0, "south": -0.5, "east": 1.0, "north": 0.5},
            "max_level": 12,
            "url": "http://dem/{TileMatrix}/{TileRow}/{TileCol}"
        }"#;
        let source: TerrainSource = serde_json::from_str(json).unwrap();
        assert_eq!(source.min_level, None);
        assert_eq!(source.priority, 0);
        assert!(source.tile_matrix_labels.is_none());
    }

    #[test]
    fn test_descriptor_rejects_bad_template() {
        let json = r#"{
            "name": "bad",
            "rectangle": {"west": -1.0, "south": -0.5, "east": 1.0, "north": 0.5},
            "max_level": 12,
            "url": ""
        }"#;
        assert!(serde_json::from_str::<TerrainSource>(json).is_err());
    }
}
