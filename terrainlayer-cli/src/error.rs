//! CLI error types.

use std::fmt;
use std::path::PathBuf;

use terrainlayer::codec::CodecError;
use terrainlayer::config::ConfigError;
use terrainlayer::fetch::FetchError;
use terrainlayer::logging::LoggingError;
use terrainlayer::provider::ProviderError;
use terrainlayer::source::SourceError;

/// Errors surfaced by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Failed to load the configuration file.
    Config(ConfigError),

    /// Configuration loaded but unusable for the command.
    InvalidConfig(String),

    /// Failed to set up logging.
    Logging(LoggingError),

    /// Failed to read an input file.
    Read { path: PathBuf, source: std::io::Error },

    /// Failed to decode a packet.
    Decode(CodecError),

    /// Invalid terrain sources.
    Source(SourceError),

    /// Failed to create the HTTP client.
    Http(FetchError),

    /// Provider construction or tile request failed.
    Provider(ProviderError),

    /// The tile was still deferred after every attempt.
    Deferred { attempts: u32 },

    /// Failed to create the Tokio runtime.
    Runtime(String),

    /// Failed to serialize output.
    Output(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidConfig(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Read { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            CliError::Decode(e) => write!(f, "Failed to decode packet: {}", e),
            CliError::Source(e) => write!(f, "Invalid terrain sources: {}", e),
            CliError::Http(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::Provider(e) => write!(f, "{}", e),
            CliError::Deferred { attempts } => write!(
                f,
                "Tile still deferred after {} attempts (network or decode pool busy)",
                attempts
            ),
            CliError::Runtime(msg) => write!(f, "Failed to create Tokio runtime: {}", msg),
            CliError::Output(msg) => write!(f, "Failed to write output: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Logging(e) => Some(e),
            CliError::Read { source, .. } => Some(source),
            CliError::Decode(e) => Some(e),
            CliError::Source(e) => Some(e),
            CliError::Http(e) => Some(e),
            CliError::Provider(e) => Some(e),
            CliError::InvalidConfig(_)
            | CliError::Deferred { .. }
            | CliError::Runtime(_)
            | CliError::Output(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::Provider(e)
    }
}

impl From<SourceError> for CliError {
    fn from(e: SourceError) -> Self {
        CliError::Source(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deferred_message() {
        let err = CliError::Deferred { attempts: 3 };
        assert_eq!(
            err.to_string(),
            "Tile still deferred after 3 attempts (network or decode pool busy)"
        );
    }

    #[test]
    fn test_source_is_chained() {
        use std::error::Error;
        let err = CliError::from(SourceError::NoSources);
        assert!(err.source().is_some());
        assert_eq!(
            err.to_string(),
            "Invalid terrain sources: At least one terrain source is required"
        );
    }
}
