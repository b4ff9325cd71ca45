//! Decode a terrain packet file.

use std::path::PathBuf;

use clap::Args;
use terrainlayer::codec::{decode_packet, CodecError, PacketHeader};
use terrainlayer::provider::{HeightGrid, DEFAULT_TILE_CELL_NUM};

use super::common::print_grid;
use crate::error::CliError;

/// Arguments for the decode command.
#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Packet file to decode
    pub file: PathBuf,

    /// Samples along one tile edge
    #[arg(long, default_value_t = DEFAULT_TILE_CELL_NUM)]
    pub width: usize,

    /// Tile level, used in diagnostics
    #[arg(long, requires_all = ["x", "y"])]
    pub level: Option<u32>,

    /// Tile column, used in diagnostics
    #[arg(long)]
    pub x: Option<u32>,

    /// Tile row, used in diagnostics
    #[arg(long)]
    pub y: Option<u32>,
}

/// Run the decode command.
pub fn run(args: DecodeArgs) -> Result<(), CliError> {
    let grid = decode_file(&args)?;
    print_grid(&grid);
    Ok(())
}

fn decode_file(args: &DecodeArgs) -> Result<HeightGrid, CliError> {
    let buffer = std::fs::read(&args.file).map_err(|source| CliError::Read {
        path: args.file.clone(),
        source,
    })?;

    let (header, _) = PacketHeader::parse(&buffer).map_err(CliError::Decode)?;
    println!("Packet:   {} ({} bytes)", args.file.display(), buffer.len());
    println!(
        "Header:   min_value {}, scale_operand {}",
        header.min_value, header.scale_operand
    );

    let heights = decode_packet(&buffer, args.width).map_err(CliError::Decode)?;
    if heights.first().map_or(true, |h| h.is_nan()) {
        match (args.level, args.x, args.y) {
            (Some(level), Some(x), Some(y)) => {
                tracing::error!(level, x, y, "Corrupt terrain tile");
            }
            _ => tracing::error!(file = %args.file.display(), "Corrupt terrain tile"),
        }
        return Ok(HeightGrid::zeroed(args.width));
    }

    let actual = heights.len();
    HeightGrid::new(heights, args.width).ok_or(CliError::Decode(CodecError::SampleCount {
        expected: args.width * args.width,
        actual,
    }))
}
