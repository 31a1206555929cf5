//! File type detection for incoming forms
//!
//! The type is taken from the file contents, not from its name or any
//! metadata attached to it, since both are unreliable for scanned uploads.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Leading bytes of every PDF document
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Form file types recognised by the pre-processing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormFormat {
    Jpeg,
    Bmp,
    Png,
    Tiff,
    /// Recognised, but has to be rasterised before it can be cleaned
    Pdf,
}

/// Outcome of [`FormFormat::sniff`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sniffed {
    /// One of the form types
    Form(FormFormat),
    /// A known file type that is not a form type, with its MIME type
    Other(&'static str),
    /// Nothing matched
    Unknown,
}

impl FormFormat {
    /// Formats that can be cleaned directly
    pub const SUPPORTED: [FormFormat; 4] = [
        FormFormat::Jpeg,
        FormFormat::Bmp,
        FormFormat::Png,
        FormFormat::Tiff,
    ];

    /// Formats accepted only after conversion to an image
    pub const SUPPORTED_AFTER_CONVERSION: [FormFormat; 1] = [FormFormat::Pdf];

    /// Detect the file type from magic bytes
    pub fn sniff(bytes: &[u8]) -> Sniffed {
        if bytes.starts_with(PDF_MAGIC) {
            return Sniffed::Form(FormFormat::Pdf);
        }

        match image::guess_format(bytes) {
            Ok(ImageFormat::Jpeg) => Sniffed::Form(FormFormat::Jpeg),
            Ok(ImageFormat::Bmp) => Sniffed::Form(FormFormat::Bmp),
            Ok(ImageFormat::Png) => Sniffed::Form(FormFormat::Png),
            Ok(ImageFormat::Tiff) => Sniffed::Form(FormFormat::Tiff),
            Ok(other) => Sniffed::Other(other.to_mime_type()),
            Err(_) => Sniffed::Unknown,
        }
    }

    /// Match a file extension (case-insensitive, without the dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "jpe" => Some(FormFormat::Jpeg),
            "bmp" => Some(FormFormat::Bmp),
            "png" => Some(FormFormat::Png),
            "tif" | "tiff" => Some(FormFormat::Tiff),
            "pdf" => Some(FormFormat::Pdf),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            FormFormat::Jpeg => "image/jpeg",
            FormFormat::Bmp => "image/bmp",
            FormFormat::Png => "image/png",
            FormFormat::Tiff => "image/tiff",
            FormFormat::Pdf => "application/pdf",
        }
    }

    /// Canonical file extension
    pub fn extension(&self) -> &'static str {
        match self {
            FormFormat::Jpeg => "jpg",
            FormFormat::Bmp => "bmp",
            FormFormat::Png => "png",
            FormFormat::Tiff => "tif",
            FormFormat::Pdf => "pdf",
        }
    }

    /// Codec used to decode and re-encode this format, if it is a raster format
    pub fn image_format(&self) -> Option<ImageFormat> {
        match self {
            FormFormat::Jpeg => Some(ImageFormat::Jpeg),
            FormFormat::Bmp => Some(ImageFormat::Bmp),
            FormFormat::Png => Some(ImageFormat::Png),
            FormFormat::Tiff => Some(ImageFormat::Tiff),
            FormFormat::Pdf => None,
        }
    }

    pub fn needs_conversion(&self) -> bool {
        Self::SUPPORTED_AFTER_CONVERSION.contains(self)
    }
}

impl fmt::Display for FormFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}
