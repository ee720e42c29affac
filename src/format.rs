//! # Format Types Module
//!
//! Tipi chiusi per i formati: niente stringhe propagate nella pipeline.
//!
//! - `EncodedFormat`: container concreto letto o scritto (PNG, JPEG, WebP)
//! - `OutputFormat`: formato richiesto dal chiamante, incluso `Original`
//! - `ColorMode`: modalità colore rilevata sulla sorgente

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Concrete container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodedFormat {
    /// Palette/truecolor lossless raster
    Png,
    /// Lossy photographic
    Jpeg,
    /// Modern codec family
    #[serde(rename = "webp")]
    WebP,
}

impl EncodedFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            EncodedFormat::Png => "image/png",
            EncodedFormat::Jpeg => "image/jpeg",
            EncodedFormat::WebP => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            EncodedFormat::Png => "png",
            EncodedFormat::Jpeg => "jpg",
            EncodedFormat::WebP => "webp",
        }
    }

    /// Format used by the `image` crate decoders
    pub(crate) fn to_image_format(self) -> image::ImageFormat {
        match self {
            EncodedFormat::Png => image::ImageFormat::Png,
            EncodedFormat::Jpeg => image::ImageFormat::Jpeg,
            EncodedFormat::WebP => image::ImageFormat::WebP,
        }
    }
}

impl fmt::Display for EncodedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EncodedFormat::Png => "PNG",
            EncodedFormat::Jpeg => "JPEG",
            EncodedFormat::WebP => "WebP",
        };
        f.write_str(name)
    }
}

/// Requested output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Keep the detected source format
    #[default]
    Original,
    /// Indexed palette raster (always re-quantized, even for PNG sources)
    PaletteRaster,
    /// Lossy photographic
    LossyPhoto,
    /// Modern codec family
    Modern,
}

impl OutputFormat {
    /// Resolve the concrete target. `Original` follows the source.
    pub fn resolve(self, source: EncodedFormat) -> EncodedFormat {
        match self {
            OutputFormat::Original => source,
            OutputFormat::PaletteRaster => EncodedFormat::Png,
            OutputFormat::LossyPhoto => EncodedFormat::Jpeg,
            OutputFormat::Modern => EncodedFormat::WebP,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Original => "original",
            OutputFormat::PaletteRaster => "png",
            OutputFormat::LossyPhoto => "jpeg",
            OutputFormat::Modern => "webp",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown format name
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown output format '{0}' (expected original, png, jpeg or webp)")]
pub struct ParseFormatError(String);

impl FromStr for OutputFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "original" => Ok(OutputFormat::Original),
            "png" | "palette" => Ok(OutputFormat::PaletteRaster),
            "jpeg" | "jpg" => Ok(OutputFormat::LossyPhoto),
            "webp" | "modern" => Ok(OutputFormat::Modern),
            other => Err(ParseFormatError(other.to_string())),
        }
    }
}

/// Color mode of the decoded source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    Indexed,
    Truecolor,
    TruecolorAlpha,
}

impl ColorMode {
    pub fn has_alpha(&self) -> bool {
        matches!(self, ColorMode::TruecolorAlpha)
    }
}
