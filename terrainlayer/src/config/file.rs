use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::{Ini, ParseOption, Properties};

use crate::coord::Rectangle;
use crate::decode::DEFAULT_DECODE_CONCURRENCY;
use crate::fetch::{DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::logging::{LogConfig, DEFAULT_LOG_LEVEL};
use crate::provider::{ProviderConfig, DEFAULT_PROVIDER_ID, DEFAULT_TILE_CELL_NUM};
use crate::source::{TerrainSource, UrlTemplate};

use super::ConfigError;

/// Prefix of section names that declare a terrain source.
pub const SOURCE_SECTION_PREFIX: &str = "source:";

const TERRAIN_SECTION: &str = "terrain";
const LOGGING_SECTION: &str = "logging";

/// The `[terrain]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainSettings {
    pub id: String,
    pub tile_cell_num: usize,
    pub decode_concurrency: usize,
    pub max_concurrent_requests: usize,
    pub request_timeout_secs: u64,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            id: DEFAULT_PROVIDER_ID.to_string(),
            tile_cell_num: DEFAULT_TILE_CELL_NUM,
            decode_concurrency: DEFAULT_DECODE_CONCURRENCY,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// The `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

/// A parsed configuration file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub terrain: TerrainSettings,
    pub logging: LoggingSettings,
    /// Sources in file order.
    pub sources: Vec<TerrainSource>,
}

impl ConfigFile {
    /// Load and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let ini = Ini::load_from_file_opt(path, parse_options()).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::Io {
                path: path.to_path_buf(),
                source,
            },
            ini::Error::Parse(e) => ConfigError::Parse(e.to_string()),
        })?;
        Self::from_ini(&ini)
    }

    /// Parse configuration text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str_opt(text, parse_options())
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_ini(&ini)
    }

    /// Provider configuration built from this file.
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::new(self.sources.clone())
            .with_id(self.terrain.id.clone())
            .with_tile_cell_num(self.terrain.tile_cell_num)
    }

    /// Logging configuration built from this file.
    pub fn log_config(&self) -> LogConfig {
        let config = LogConfig::new(self.logging.level.clone());
        match &self.logging.file {
            Some(file) => config.with_file(file.clone()),
            None => config,
        }
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = ConfigFile::default();

        for (name, props) in ini.iter() {
            match name {
                Some(TERRAIN_SECTION) => config.terrain = parse_terrain(props)?,
                Some(LOGGING_SECTION) => config.logging = parse_logging(props),
                Some(section) => {
                    if let Some(source_name) = section.strip_prefix(SOURCE_SECTION_PREFIX) {
                        config.sources.push(parse_source(section, source_name.trim(), props)?);
                    }
                }
                None => {}
            }
        }

        Ok(config)
    }
}

// Backslashes in Windows paths must survive.
fn parse_options() -> ParseOption {
    ParseOption {
        enabled_escape: false,
        ..Default::default()
    }
}

fn parse_terrain(props: &Properties) -> Result<TerrainSettings, ConfigError> {
    let defaults = TerrainSettings::default();
    Ok(TerrainSettings {
        id: props
            .get("id")
            .map(str::to_string)
            .unwrap_or(defaults.id),
        tile_cell_num: optional(TERRAIN_SECTION, props, "tile_cell_num")?
            .unwrap_or(defaults.tile_cell_num),
        decode_concurrency: optional(TERRAIN_SECTION, props, "decode_concurrency")?
            .unwrap_or(defaults.decode_concurrency),
        max_concurrent_requests: optional(TERRAIN_SECTION, props, "max_concurrent_requests")?
            .unwrap_or(defaults.max_concurrent_requests),
        request_timeout_secs: optional(TERRAIN_SECTION, props, "request_timeout_secs")?
            .unwrap_or(defaults.request_timeout_secs),
    })
}

fn parse_logging(props: &Properties) -> LoggingSettings {
    LoggingSettings {
        level: props
            .get("level")
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        file: props
            .get("file")
            .filter(|file| !file.trim().is_empty())
            .map(PathBuf::from),
    }
}

fn parse_source(section: &str, name: &str, props: &Properties) -> Result<TerrainSource, ConfigError> {
    let url = required(section, props, "url")?;
    let url = UrlTemplate::parse(url).map_err(|source| ConfigError::Source {
        section: section.to_string(),
        source,
    })?;

    let rectangle = Rectangle::from_degrees(
        optional(section, props, "west")?.unwrap_or(-180.0),
        optional(section, props, "south")?.unwrap_or(-90.0),
        optional(section, props, "east")?.unwrap_or(180.0),
        optional(section, props, "north")?.unwrap_or(90.0),
    );

    let max_level: u32 = parse_value(section, "max_level", required(section, props, "max_level")?)?;
    let mut source = TerrainSource::new(name, rectangle, max_level, url);

    if let Some(min_level) = optional(section, props, "min_level")? {
        source = source.with_min_level(min_level);
    }
    if let Some(priority) = optional(section, props, "priority")? {
        source = source.with_priority(priority);
    }
    if let Some(labels) = props.get("tile_matrix_labels") {
        let labels: Vec<String> = labels
            .split(',')
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .collect();
        if !labels.is_empty() {
            source = source.with_tile_matrix_labels(labels);
        }
    }

    Ok(source)
}

fn required<'a>(section: &str, props: &'a Properties, key: &str) -> Result<&'a str, ConfigError> {
    props.get(key).ok_or_else(|| ConfigError::MissingKey {
        section: section.to_string(),
        key: key.to_string(),
    })
}

fn optional<T: FromStr>(section: &str, props: &Properties, key: &str) -> Result<Option<T>, ConfigError> {
    props
        .get(key)
        .map(|value| parse_value(section, key, value))
        .transpose()
}

fn parse_value<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    })
}
