//! In-memory raster buffers
//!
//! A [`Raster`] is the decoded form of a scanned page: `height × width ×
//! channels` bytes, row-major and interleaved. Three-channel rasters are
//! stored blue, green, red, the order image decoders hand out when asked
//! for a colour image.

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

use crate::cleanup::{CleanupError, Result};

/// Channel count of a grayscale raster
pub const GRAY_CHANNELS: u8 = 1;

/// Channel count of a BGR colour raster
pub const BGR_CHANNELS: u8 = 3;

/// Channel count of a BGRA colour raster
pub const BGRA_CHANNELS: u8 = 4;

/// Decoded image buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl Raster {
    /// Wrap raw interleaved bytes.
    ///
    /// The shape is not checked here; consumers such as
    /// [`clean`](crate::cleanup::clean) validate it before reading pixels.
    pub fn from_raw(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels,
            data,
        }
    }

    /// Create a raster where every pixel has the given channel values.
    ///
    /// `pixel` holds one value per channel, so it must have between 1 and
    /// 255 entries.
    pub fn from_pixel(width: u32, height: u32, pixel: &[u8]) -> Result<Self> {
        let channels = u8::try_from(pixel.len())
            .ok()
            .filter(|&c| c > 0)
            .ok_or_else(|| {
                CleanupError::InvalidInput(format!(
                    "pixel must have 1 to {} channels, got {}",
                    u8::MAX,
                    pixel.len()
                ))
            })?;
        let data = pixel.repeat(width as usize * height as usize);
        Ok(Self::from_raw(width, height, channels, data))
    }

    /// Build a raster from one byte vector per row.
    ///
    /// Every row must hold the same number of bytes, and that number must be
    /// a non-zero multiple of `channels`.
    pub fn from_rows(rows: &[Vec<u8>], channels: u8) -> Result<Self> {
        if channels == 0 {
            return Err(CleanupError::InvalidInput(
                "channel count must be at least 1".to_string(),
            ));
        }

        let first = rows
            .first()
            .ok_or_else(|| CleanupError::InvalidInput("raster has no rows".to_string()))?;
        let row_len = first.len();
        if row_len == 0 {
            return Err(CleanupError::InvalidInput("raster rows are empty".to_string()));
        }
        if row_len % channels as usize != 0 {
            return Err(CleanupError::InvalidInput(format!(
                "row length {} is not a multiple of {} channels",
                row_len, channels
            )));
        }

        if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != row_len) {
            return Err(CleanupError::InvalidInput(format!(
                "row {} has {} bytes, expected {}",
                index,
                row.len(),
                row_len
            )));
        }

        let width = u32::try_from(row_len / channels as usize)
            .map_err(|_| CleanupError::InvalidInput("raster is too wide".to_string()))?;
        let height = u32::try_from(rows.len())
            .map_err(|_| CleanupError::InvalidInput("raster is too tall".to_string()))?;

        Ok(Self::from_raw(width, height, channels, rows.concat()))
    }

    /// Convert a decoded image to a 3-channel BGR raster.
    ///
    /// Gray images are expanded to three equal channels, alpha is dropped
    /// and 16-bit or float samples are reduced to 8 bits.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut data = rgb.into_raw();
        for pixel in data.chunks_exact_mut(BGR_CHANNELS as usize) {
            pixel.swap(0, 2);
        }
        Self::from_raw(width, height, BGR_CHANNELS, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// True when the raster holds no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Channel values of the pixel at `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let channels = self.channels as usize;
        let start = (y as usize * self.width as usize + x as usize) * channels;
        self.data.get(start..start + channels)
    }

    /// Check that the raster is non-empty, has `channels` channels and that
    /// the buffer length matches the declared shape.
    pub fn ensure_shape(&self, channels: u8) -> Result<()> {
        if self.channels != channels {
            return Err(CleanupError::InvalidInput(format!(
                "expected {} channels, got {}",
                channels, self.channels
            )));
        }
        self.ensure_layout()
    }

    fn ensure_layout(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CleanupError::InvalidInput(format!(
                "raster is empty ({}x{})",
                self.width, self.height
            )));
        }

        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(self.channels as usize))
            .ok_or_else(|| CleanupError::InvalidInput("raster size overflows".to_string()))?;

        if self.data.len() != expected {
            return Err(CleanupError::InvalidInput(format!(
                "buffer holds {} bytes, {}x{}x{} needs {}",
                self.data.len(),
                self.width,
                self.height,
                self.channels,
                expected
            )));
        }
        Ok(())
    }

    /// Convert to an `image` crate buffer for encoding.
    ///
    /// One channel becomes `ImageLuma8`, BGR becomes `ImageRgb8` and BGRA
    /// becomes `ImageRgba8`.
    pub fn to_dynamic(&self) -> Result<DynamicImage> {
        self.ensure_layout()?;

        let mismatch = || CleanupError::InvalidInput("buffer does not match dimensions".to_string());
        let (width, height) = self.dimensions();

        match self.channels {
            GRAY_CHANNELS => GrayImage::from_raw(width, height, self.data.clone())
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(mismatch),
            BGR_CHANNELS => RgbImage::from_raw(width, height, swap_red_blue(&self.data, 3))
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(mismatch),
            BGRA_CHANNELS => RgbaImage::from_raw(width, height, swap_red_blue(&self.data, 4))
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(mismatch),
            other => Err(CleanupError::InvalidInput(format!(
                "cannot convert a {}-channel raster",
                other
            ))),
        }
    }
}

fn swap_red_blue(data: &[u8], channels: usize) -> Vec<u8> {
    let mut swapped = data.to_vec();
    for pixel in swapped.chunks_exact_mut(channels) {
        pixel.swap(0, 2);
    }
    swapped
}
