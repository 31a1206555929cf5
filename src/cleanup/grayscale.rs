//! Grayscale conversion
//!
//! Turns a decoded BGR form into a single-channel image before it is handed
//! to text recognition.
//!
//! # Algorithm
//!
//! Each output pixel is the BT.601 luma of the input pixel:
//!
//! `Y = 0.114·B + 0.587·G + 0.299·R`
//!
//! The weights are applied in 14-bit fixed point with round-half-up, which
//! matches the integer path of the usual computer-vision libraries bit for bit.

use super::types::Result;
use crate::raster::{Raster, BGR_CHANNELS, GRAY_CHANNELS};

// ============================================================
// Constants
// ============================================================

/// Fixed-point precision of the luma weights
const LUMA_SHIFT: u32 = 14;

/// Blue weight (0.114 · 2^14)
const LUMA_WEIGHT_B: u32 = 1868;

/// Green weight (0.587 · 2^14)
const LUMA_WEIGHT_G: u32 = 9617;

/// Red weight (0.299 · 2^14)
const LUMA_WEIGHT_R: u32 = 4899;

/// Half of one output step, for rounding
const LUMA_ROUND: u32 = 1 << (LUMA_SHIFT - 1);

// ============================================================
// Conversion
// ============================================================

/// Convert a 3-channel BGR raster to a 1-channel grayscale raster.
///
/// The input is only read; a new buffer of the same width and height is
/// returned.
///
/// # Errors
///
/// [`CleanupError::InvalidInput`](super::CleanupError::InvalidInput) if the raster does not have exactly three
/// channels, is empty, or its buffer length does not match its dimensions.
pub fn clean(image: &Raster) -> Result<Raster> {
    image.ensure_shape(BGR_CHANNELS)?;

    let (width, height) = image.dimensions();
    let luma = image
        .data()
        .chunks_exact(BGR_CHANNELS as usize)
        .map(|px| bgr_to_luma(px[0], px[1], px[2]))
        .collect();

    Ok(Raster::from_raw(width, height, GRAY_CHANNELS, luma))
}

/// Luma of a single BGR pixel
#[inline]
pub fn bgr_to_luma(b: u8, g: u8, r: u8) -> u8 {
    let weighted = u32::from(b) * LUMA_WEIGHT_B
        + u32::from(g) * LUMA_WEIGHT_G
        + u32::from(r) * LUMA_WEIGHT_R
        + LUMA_ROUND;
    (weighted >> LUMA_SHIFT).min(u32::from(u8::MAX)) as u8
}

// ============================================================
// Tests
// ============================================================
