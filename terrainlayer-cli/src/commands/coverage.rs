//! Show composed source coverage.

use clap::Args;
use terrainlayer::config::ConfigFile;
use terrainlayer::source::SourceSet;

use super::common::degrees;
use crate::error::CliError;

/// Arguments for the coverage command.
#[derive(Debug, Args)]
pub struct CoverageArgs {
    /// Print the composed sources as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the coverage command.
pub fn run(args: CoverageArgs, config: &ConfigFile) -> Result<(), CliError> {
    if config.sources.is_empty() {
        return Err(CliError::InvalidConfig(
            "No [source:<name>] sections configured".to_string(),
        ));
    }

    let set = SourceSet::compose(config.sources.clone())?;

    if args.json {
        let json = serde_json::to_string_pretty(set.sources())
            .map_err(|e| CliError::Output(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    println!("Sources (priority order):");
    for (index, source) in set.sources().iter().enumerate() {
        let rect = source.rectangle();
        println!(
            "  {}. {} (priority {}, levels {}-{})",
            index + 1,
            source.name(),
            source.priority(),
            source.min_level(),
            source.max_level()
        );
        println!(
            "     W {}  S {}  E {}  N {}",
            degrees(rect.west),
            degrees(rect.south),
            degrees(rect.east),
            degrees(rect.north)
        );
        println!("     {}", source.descriptor().url);
    }

    let rect = set.rectangle();
    println!();
    println!("Composite coverage:");
    println!(
        "  W {}  S {}  E {}  N {}",
        degrees(rect.west),
        degrees(rect.south),
        degrees(rect.east),
        degrees(rect.north)
    );
    println!("  Levels {}-{}", set.min_level(), set.max_level());

    Ok(())
}
