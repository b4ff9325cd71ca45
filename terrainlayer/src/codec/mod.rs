//! Terrain packet codec.
//!
//! Turns a compressed, quantized terrain payload into a floating point height
//! grid. Decoding is pure and CPU-bound; the [`decode`](crate::decode) module
//! runs it on a bounded worker pool.
//!
//! ```
//! use terrainlayer::codec::{decode_packet, encode_packet};
//!
//! let heights = vec![250.0f32; 9];
//! let packet = encode_packet(&heights, 3, 0.0, 0.5).unwrap();
//! assert_eq!(decode_packet(&packet, 3).unwrap(), heights);
//! ```

mod grid;
mod packet;

pub use grid::{dequantize, flip_rows, quantize, serialized_to_grid_index};
pub use packet::{decode_packet, encode_packet, PacketHeader, HEADER_LEN, PACKET_MAGIC};

use thiserror::Error;

/// Errors decoding or encoding a terrain packet.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Buffer too short for the header.
    #[error("Packet truncated: {len} bytes (need at least {required})")]
    Truncated { len: usize, required: usize },

    /// The zlib stream could not be inflated.
    #[error("Failed to decompress packet: {0}")]
    Decompress(String),

    /// The zlib stream could not be written.
    #[error("Failed to compress packet: {0}")]
    Compress(String),

    /// Wrong number of samples for the grid width.
    #[error("Expected {expected} samples, got {actual}")]
    SampleCount { expected: usize, actual: usize },

    /// Grid width of zero, or too large for the sample count to fit.
    #[error("Grid width must be at least 1 and its square must fit in memory")]
    InvalidWidth,
}
