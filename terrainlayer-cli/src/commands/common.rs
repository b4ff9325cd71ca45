//! Common utilities shared across CLI commands.

use std::path::{Path, PathBuf};

use terrainlayer::config::ConfigFile;
use terrainlayer::provider::HeightGrid;

use crate::error::CliError;

/// Config file name inside the platform config directory.
const CONFIG_FILE_NAME: &str = "config.ini";

/// Default config location, e.g. `~/.config/terrainlayer/config.ini`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("terrainlayer").join(CONFIG_FILE_NAME))
}

/// Load configuration.
///
/// An explicit path must exist. Without one, the default location is used if
/// present and built-in defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) => Ok(ConfigFile::load(path)?),
        None => match default_config_path() {
            Some(path) if path.exists() => Ok(ConfigFile::load(&path)?),
            _ => Ok(ConfigFile::default()),
        },
    }
}

/// Print statistics and the first row of a grid.
pub fn print_grid(grid: &HeightGrid) {
    println!("Grid:     {} x {}", grid.width(), grid.height());
    println!("Heights:  {}", grid.summary());

    let first_row: Vec<String> = grid.heights()[..grid.width()]
        .iter()
        .map(|h| format!("{:.1}", h))
        .collect();
    println!("Row 0:    {}", first_row.join(" "));
}

/// Format a radian value as degrees for display.
pub fn degrees(radians: f64) -> String {
    format!("{:.4}°", radians.to_degrees())
}
