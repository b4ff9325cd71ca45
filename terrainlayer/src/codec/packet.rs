//! Terrain packet layout, decoding and encoding.
//!
//! # Layout
//!
//! ```text
//! offset  size  field
//! 0       4     reserved (magic, ignored)
//! 4       4     min_value      f32 little-endian
//! 8       8     scale_operand  f64 little-endian
//! 16      ..    zlib stream of width*width u16 little-endian samples
//! ```

use std::io::{Read, Write};

use bytes::Buf;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::grid::{dequantize, flip_rows, quantize, serialized_to_grid_index};
use super::CodecError;

/// Size of the fixed packet header in bytes.
pub const HEADER_LEN: usize = 16;

/// Bytes written into the reserved header field by [`encode_packet`].
pub const PACKET_MAGIC: [u8; 4] = *b"TLHM";

/// Fixed header at the start of every terrain packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacketHeader {
    /// Height of quantized sample 0.
    pub min_value: f32,
    /// Height step per quantization unit.
    pub scale_operand: f64,
}

impl PacketHeader {
    /// Parse the header, returning it along with the compressed payload.
    pub fn parse(buffer: &[u8]) -> Result<(Self, &[u8]), CodecError> {
        if buffer.len() < HEADER_LEN {
            return Err(CodecError::Truncated {
                len: buffer.len(),
                required: HEADER_LEN,
            });
        }

        let mut cursor = buffer;
        cursor.advance(PACKET_MAGIC.len());
        let min_value = cursor.get_f32_le();
        let scale_operand = cursor.get_f64_le();

        Ok((
            Self {
                min_value,
                scale_operand,
            },
            cursor,
        ))
    }
}

/// Number of samples in a `width × width` grid, rejecting zero and overflow.
fn grid_samples(width: usize) -> Result<usize, CodecError> {
    width
        .checked_mul(width)
        .filter(|count| *count > 0 && count.checked_mul(2).is_some())
        .ok_or(CodecError::InvalidWidth)
}

/// Decode a terrain packet into a `width × width` row-major height grid.
///
/// # Errors
///
/// Fails on a truncated header, a corrupt zlib stream, or fewer than
/// `width * width` samples. Extra trailing samples are ignored.
pub fn decode_packet(buffer: &[u8], width: usize) -> Result<Vec<f32>, CodecError> {
    let sample_count = grid_samples(width)?;
    let (header, compressed) = PacketHeader::parse(buffer)?;

    let mut raw = Vec::with_capacity(sample_count * 2);
    ZlibDecoder::new(compressed)
        .read_to_end(&mut raw)
        .map_err(|e| CodecError::Decompress(e.to_string()))?;

    if raw.len() < sample_count * 2 {
        return Err(CodecError::SampleCount {
            expected: sample_count,
            actual: raw.len() / 2,
        });
    }

    let mut grid = vec![0.0f32; sample_count];
    let mut samples = &raw[..sample_count * 2];
    for i in 0..sample_count {
        let sample = samples.get_u16_le();
        grid[serialized_to_grid_index(i, width)] =
            dequantize(sample as i32, header.min_value, header.scale_operand);
    }

    Ok(flip_rows(&grid, width))
}

/// Encode a `width × width` row-major height grid as a terrain packet.
///
/// Heights are quantized against `min_value` / `scale_operand` with rounding
/// and clamped to the `u16` range, so decoding reproduces the input to within
/// half a quantization step.
pub fn encode_packet(
    heights: &[f32],
    width: usize,
    min_value: f32,
    scale_operand: f64,
) -> Result<Vec<u8>, CodecError> {
    let sample_count = grid_samples(width)?;
    if heights.len() != sample_count {
        return Err(CodecError::SampleCount {
            expected: sample_count,
            actual: heights.len(),
        });
    }

    // Undo the orientation flip, then walk the serialization order.
    let unflipped = flip_rows(heights, width);
    let mut raw = Vec::with_capacity(heights.len() * 2);
    for i in 0..heights.len() {
        let height = unflipped[serialized_to_grid_index(i, width)];
        raw.extend_from_slice(&quantize(height, min_value, scale_operand).to_le_bytes());
    }

    let mut packet = Vec::with_capacity(HEADER_LEN + raw.len() / 2);
    packet.extend_from_slice(&PACKET_MAGIC);
    packet.extend_from_slice(&min_value.to_le_bytes());
    packet.extend_from_slice(&scale_operand.to_le_bytes());

    let mut encoder = ZlibEncoder::new(packet, Compression::default());
    encoder
        .write_all(&raw)
        .map_err(|e| CodecError::Compress(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CodecError::Compress(e.to_string()))
}
