//! Form pre-processing stage
//!
//! Takes the raw bytes of an uploaded form, checks its type, decodes it to
//! a BGR raster, cleans it and encodes the result back into the format it
//! arrived in.

use image::codecs::jpeg::JpegEncoder;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageError, ImageFormat, ImageReader};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::format::{FormFormat, Sniffed};
use super::types::{PreprocessError, Result};
use crate::cleanup::clean;
use crate::raster::Raster;

// ============================================================
// Constants
// ============================================================

/// Directory cleaned forms are written to unless configured otherwise
pub const DEFAULT_OUTPUT_DIR: &str = "input-cleaned";

/// JPEG quality used when re-encoding JPEG forms
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Minimum JPEG quality
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum JPEG quality
pub const MAX_JPEG_QUALITY: u8 = 100;

// ============================================================
// Types
// ============================================================

/// Options for the pre-processing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessOptions {
    /// Quality used when the form is re-encoded as JPEG
    pub jpeg_quality: u8,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl PreprocessOptions {
    /// Set JPEG quality, clamped to 1..=100
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY);
        self
    }
}

/// A cleaned, re-encoded form
#[derive(Debug, Clone)]
pub struct CleanedForm {
    /// Encoded image bytes
    pub bytes: Vec<u8>,

    /// Format of both the input and the encoded output
    pub format: FormFormat,

    pub width: u32,

    pub height: u32,
}

// ============================================================
// Preprocessor
// ============================================================

/// Decode → clean → encode for a single form
#[derive(Debug, Clone, Default)]
pub struct FormPreprocessor {
    options: PreprocessOptions,
}

impl FormPreprocessor {
    pub fn new(options: PreprocessOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PreprocessOptions {
        &self.options
    }

    /// Clean an encoded form held in memory
    pub fn process_bytes(&self, bytes: &[u8]) -> Result<CleanedForm> {
        if bytes.is_empty() {
            return Err(PreprocessError::EmptyInput);
        }

        let format = match FormFormat::sniff(bytes) {
            Sniffed::Form(format) => format,
            Sniffed::Other(mime) => return Err(PreprocessError::UnsupportedFormat(mime.to_string())),
            Sniffed::Unknown => return Err(PreprocessError::UnrecognizedFormat),
        };

        let image_format = match format.image_format() {
            Some(image_format) if !format.needs_conversion() => image_format,
            _ => return Err(PreprocessError::ConversionRequired(format.mime().to_string())),
        };

        let decoded = decode_upright(bytes, image_format)?;

        let raster = Raster::from_dynamic(&decoded);
        let gray = clean(&raster)?;
        let (width, height) = gray.dimensions();

        let bytes = self.encode(&gray, format)?;

        debug!(
            format = format.mime(),
            width,
            height,
            size = bytes.len(),
            "form cleaned"
        );

        Ok(CleanedForm {
            bytes,
            format,
            width,
            height,
        })
    }

    /// Clean the form at `input` and write the result to `output`.
    ///
    /// Parent directories of `output` are created. The file is written to a
    /// temporary name first so an interrupted run never leaves a truncated form.
    pub fn process_file(&self, input: &Path, output: &Path) -> Result<CleanedForm> {
        if !input.exists() {
            return Err(PreprocessError::FormNotFound(input.to_path_buf()));
        }

        let bytes = fs::read(input)?;
        let cleaned = self.process_bytes(&bytes)?;
        write_atomic(output, &cleaned.bytes)?;

        Ok(cleaned)
    }

    fn encode(&self, raster: &Raster, format: FormFormat) -> Result<Vec<u8>> {
        let image = raster.to_dynamic()?;
        let mut buffer = Vec::new();

        let encoded = match format {
            FormFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut buffer, self.options.jpeg_quality);
                image.write_with_encoder(encoder)
            }
            other => {
                let image_format = other
                    .image_format()
                    .ok_or_else(|| PreprocessError::ConversionRequired(other.mime().to_string()))?;
                image.write_to(&mut Cursor::new(&mut buffer), image_format)
            }
        };
        encoded.map_err(|e| PreprocessError::Encode(e.to_string()))?;

        Ok(buffer)
    }
}

/// Decode `bytes` and turn the image the way its EXIF orientation says.
///
/// The tag is lost on re-encoding, so the rotation has to be baked into the
/// pixels here.
fn decode_upright(bytes: &[u8], format: ImageFormat) -> Result<DynamicImage> {
    let decode_error = |e: ImageError| PreprocessError::Decode(e.to_string());

    let mut decoder = ImageReader::with_format(Cursor::new(bytes), format)
        .into_decoder()
        .map_err(decode_error)?;
    let orientation = decoder.orientation().map_err(decode_error)?;

    let mut image = DynamicImage::from_decoder(decoder).map_err(decode_error)?;
    if orientation != Orientation::NoTransforms {
        debug!(?orientation, "applying EXIF orientation");
        image.apply_orientation(orientation);
    }
    Ok(image)
}

/// Where the cleaned version of `file` goes.
///
/// The path of `file` relative to `input_root` is kept below `output_dir`.
/// When `file` is not below `input_root` (or is the root itself), only its
/// file name is kept.
pub fn cleaned_path(input_root: &Path, file: &Path, output_dir: &Path) -> PathBuf {
    match file.strip_prefix(input_root) {
        Ok(relative) if !relative.as_os_str().is_empty() => output_dir.join(relative),
        _ => match file.file_name() {
            Some(name) => output_dir.join(name),
            None => output_dir.join(file),
        },
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

    fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Vec::new();
        image.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    fn red_block(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 0, 0])))
    }

    #[test]
    fn test_options_default() {
        let opts = PreprocessOptions::default();
        assert_eq!(opts.jpeg_quality, DEFAULT_JPEG_QUALITY);
    }

    #[test]
    fn test_options_quality_clamped() {
        assert_eq!(PreprocessOptions::default().with_jpeg_quality(0).jpeg_quality, 1);
        assert_eq!(PreprocessOptions::default().with_jpeg_quality(150).jpeg_quality, 100);
        assert_eq!(PreprocessOptions::default().with_jpeg_quality(80).jpeg_quality, 80);
    }

    #[test]
    fn test_png_round_trip() {
        let bytes = encode(&red_block(8, 5), ImageFormat::Png);
        let cleaned = FormPreprocessor::default().process_bytes(&bytes).unwrap();

        assert_eq!(cleaned.format, FormFormat::Png);
        assert_eq!((cleaned.width, cleaned.height), (8, 5));

        let decoded = image::load_from_memory(&cleaned.bytes).unwrap();
        let gray = decoded.as_luma8().expect("output should be 8-bit grayscale");
        assert_eq!(gray.dimensions(), (8, 5));
        assert!(gray.pixels().all(|p| p.0[0] == 76));
    }

    #[test]
    fn test_bmp_and_tiff_keep_format() {
        let image = red_block(6, 6);
        for (format, expected) in [
            (ImageFormat::Bmp, FormFormat::Bmp),
            (ImageFormat::Tiff, FormFormat::Tiff),
        ] {
            let cleaned = FormPreprocessor::default()
                .process_bytes(&encode(&image, format))
                .unwrap();
            assert_eq!(cleaned.format, expected);
            assert_eq!(FormFormat::sniff(&cleaned.bytes), Sniffed::Form(expected));

            let decoded = image::load_from_memory(&cleaned.bytes).unwrap().to_luma8();
            assert_eq!(decoded.get_pixel(3, 3).0[0], 76);
        }
    }

    #[test]
    fn test_jpeg_round_trip() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([128, 128, 128])));
        let bytes = encode(&image, ImageFormat::Jpeg);
        let cleaned = FormPreprocessor::default().process_bytes(&bytes).unwrap();

        assert_eq!(cleaned.format, FormFormat::Jpeg);
        let decoded = image::load_from_memory(&cleaned.bytes).unwrap().to_luma8();
        let value = decoded.get_pixel(8, 8).0[0] as i32;
        assert!((value - 128).abs() <= 3, "got {}", value);
    }

    /// Insert an EXIF APP1 segment carrying only an Orientation tag
    fn with_exif_orientation(jpeg: &[u8], orientation: u8) -> Vec<u8> {
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"MM\x00\x2a\x00\x00\x00\x08");
        tiff.extend_from_slice(&[0x00, 0x01]);
        tiff.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
        tiff.extend_from_slice(&[0x00, orientation, 0x00, 0x00]);
        tiff.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

        let mut payload = b"Exif\x00\x00".to_vec();
        payload.extend_from_slice(&tiff);
        let len = (payload.len() + 2) as u16;

        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&[0xff, 0xe1]);
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&payload);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[test]
    fn test_exif_orientation_applied() {
        let bytes = encode(&red_block(8, 4), ImageFormat::Jpeg);
        let rotated = with_exif_orientation(&bytes, 6);

        let cleaned = FormPreprocessor::default().process_bytes(&rotated).unwrap();
        assert_eq!((cleaned.width, cleaned.height), (4, 8));

        let decoded = image::load_from_memory(&cleaned.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 8));
    }

    #[test]
    fn test_exif_upright_keeps_dimensions() {
        let bytes = with_exif_orientation(&encode(&red_block(8, 4), ImageFormat::Jpeg), 1);
        let cleaned = FormPreprocessor::default().process_bytes(&bytes).unwrap();
        assert_eq!((cleaned.width, cleaned.height), (8, 4));
    }

    #[test]
    fn test_alpha_is_dropped() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0])));
        let cleaned = FormPreprocessor::default()
            .process_bytes(&encode(&image, ImageFormat::Png))
            .unwrap();
        let decoded = image::load_from_memory(&cleaned.bytes).unwrap();
        assert!(decoded.as_luma8().is_some());
    }

    #[test]
    fn test_empty_input() {
        let result = FormPreprocessor::default().process_bytes(&[]);
        assert!(matches!(result, Err(PreprocessError::EmptyInput)));
    }

    #[test]
    fn test_pdf_requires_conversion() {
        let result = FormPreprocessor::default().process_bytes(b"%PDF-1.4\n1 0 obj\n");
        match result {
            Err(PreprocessError::ConversionRequired(mime)) => assert_eq!(mime, "application/pdf"),
            other => panic!("unexpected result: {:?}", other.map(|c| c.format)),
        }
    }

    #[test]
    fn test_gif_unsupported() {
        let result = FormPreprocessor::default().process_bytes(b"GIF89a\x01\x00\x01\x00\x00");
        assert!(matches!(result, Err(PreprocessError::UnsupportedFormat(ref m)) if m == "image/gif"));
        assert!(result.unwrap_err().is_unsupported_input());
    }

    #[test]
    fn test_garbage_unrecognized() {
        let result = FormPreprocessor::default().process_bytes(b"not an image at all");
        assert!(matches!(result, Err(PreprocessError::UnrecognizedFormat)));
    }

    #[test]
    fn test_truncated_png_fails_decode() {
        let bytes = encode(&red_block(32, 32), ImageFormat::Png);
        let truncated = &bytes[..bytes.len() / 2];
        let result = FormPreprocessor::default().process_bytes(truncated);
        assert!(matches!(result, Err(PreprocessError::Decode(_))));
        assert!(!result.unwrap_err().is_unsupported_input());
    }

    #[test]
    fn test_process_file_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("form.png");
        fs::write(&input, encode(&red_block(4, 4), ImageFormat::Png)).unwrap();

        let output = dir.path().join("out").join("nested").join("form.png");
        let cleaned = FormPreprocessor::default().process_file(&input, &output).unwrap();

        assert!(output.exists());
        assert_eq!(fs::read(&output).unwrap(), cleaned.bytes);
    }

    #[test]
    fn test_process_file_missing() {
        let result = FormPreprocessor::default()
            .process_file(Path::new("/nonexistent/form.png"), Path::new("/tmp/unused.png"));
        assert!(matches!(result, Err(PreprocessError::FormNotFound(_))));
    }

    #[test]
    fn test_cleaned_path() {
        let out = Path::new("input-cleaned");
        assert_eq!(
            cleaned_path(Path::new("forms"), Path::new("forms/2024/a.png"), out),
            PathBuf::from("input-cleaned/2024/a.png")
        );
        assert_eq!(
            cleaned_path(Path::new("forms/a.png"), Path::new("forms/a.png"), out),
            PathBuf::from("input-cleaned/a.png")
        );
        assert_eq!(
            cleaned_path(Path::new("elsewhere"), Path::new("forms/b.tif"), out),
            PathBuf::from("input-cleaned/b.tif")
        );
    }
}
