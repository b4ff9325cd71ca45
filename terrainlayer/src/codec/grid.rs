//! Grid transforms applied while decoding a terrain packet.
//!
//! The packet stores samples in an order that differs from the row order the
//! mesh builder expects. Two separate row reversals are involved: one that
//! undoes the serialization order and one that matches the consumer's row
//! orientation. They cancel out today, but they are separate steps of the
//! wire format and are kept as separate functions.

/// Grid index for the `i`-th sample of the serialized stream.
///
/// Sample `i` belongs to serialized row `i / width`, which is stored in grid
/// row `width - 1 - i / width` at the same column. `i` must be below
/// `width * width`.
#[inline]
pub fn serialized_to_grid_index(i: usize, width: usize) -> usize {
    (width - 1 - i / width) * width + i % width
}

/// Reverse the row order of a square grid.
///
/// Row `r` of the result is row `width - 1 - r` of the input.
pub fn flip_rows(grid: &[f32], width: usize) -> Vec<f32> {
    debug_assert_eq!(grid.len(), width * width);

    let mut flipped = Vec::with_capacity(grid.len());
    for row in grid.chunks_exact(width).rev() {
        flipped.extend_from_slice(row);
    }
    flipped
}

/// Recover a height from a quantized sample.
///
/// Negative samples are missing-data sentinels and pass through unchanged.
/// The arithmetic is done in `f64` and rounded to `f32` once.
#[inline]
pub fn dequantize(sample: i32, min_value: f32, scale: f64) -> f32 {
    if sample < 0 {
        sample as f32
    } else {
        (sample as f64 * scale + min_value as f64) as f32
    }
}

/// Quantize a height for encoding, clamped to the `u16` range.
#[inline]
pub fn quantize(height: f32, min_value: f32, scale: f64) -> u16 {
    if scale == 0.0 {
        return 0;
    }
    ((height as f64 - min_value as f64) / scale)
        .round()
        .clamp(0.0, u16::MAX as f64) as u16
}
