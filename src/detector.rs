//! # Format Detection Module
//!
//! Rilevamento del formato basato esclusivamente sul contenuto (magic bytes e
//! header dei container), mai sull'estensione del file.
//!
//! ## Responsabilità:
//! - `detect()`: firma, dimensioni e modalità colore senza decodificare i pixel
//! - `decode()`: decodifica completa in memoria tramite il crate `image`
//! - Errori descrittivi per container riconosciuti ma non supportati (GIF, BMP, TIFF, AVIF)
//!
//! ## Formati accettati:
//! | Formato | Firma | Modalità colore |
//! |---------|-------|-----------------|
//! | PNG     | `89 50 4E 47 0D 0A 1A 0A` | dal colour type IHDR (+ tRNS) |
//! | JPEG    | `FF D8 FF` | sempre truecolor |
//! | WebP    | `RIFF....WEBP` | truecolor o truecolor+alpha |

use crate::error::CompressError;
use crate::format::{ColorMode, EncodedFormat};
use image::codecs::jpeg::JpegDecoder;
use image::codecs::webp::WebPDecoder;
use image::{DynamicImage, ImageDecoder};
use serde::Serialize;
use std::io::Cursor;
use tracing::debug;

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Metadata of a detected source image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceImage {
    pub format: EncodedFormat,
    pub width: u32,
    pub height: u32,
    pub color_mode: ColorMode,
    pub original_size: usize,
}

/// A fully decoded source, alive only for the duration of one request
pub struct DecodedImage {
    pub info: SourceImage,
    pub pixels: DynamicImage,
}

impl DecodedImage {
    /// True when at least one pixel is not fully opaque
    pub fn uses_transparency(&self) -> bool {
        if !self.pixels.color().has_alpha() {
            return false;
        }
        self.pixels.to_rgba8().pixels().any(|p| p.0[3] < u8::MAX)
    }
}

/// Inspect the byte signature and container header.
///
/// Pure function over bytes: the file name never takes part in detection.
pub fn detect(bytes: &[u8]) -> Result<SourceImage, CompressError> {
    let format = sniff_format(bytes)?;

    let (width, height, color_mode) = match format {
        EncodedFormat::Png => read_png_header(bytes)?,
        EncodedFormat::Jpeg => {
            let decoder = JpegDecoder::new(Cursor::new(bytes))
                .map_err(|e| CompressError::Decode(format!("invalid JPEG header: {}", e)))?;
            let (w, h) = decoder.dimensions();
            (w, h, ColorMode::Truecolor)
        }
        EncodedFormat::WebP => {
            let decoder = WebPDecoder::new(Cursor::new(bytes))
                .map_err(|e| CompressError::Decode(format!("invalid WebP header: {}", e)))?;
            let (w, h) = decoder.dimensions();
            let mode = if decoder.color_type().has_alpha() {
                ColorMode::TruecolorAlpha
            } else {
                ColorMode::Truecolor
            };
            (w, h, mode)
        }
    };

    if width == 0 || height == 0 {
        return Err(CompressError::Decode(format!(
            "invalid dimensions {}x{}",
            width, height
        )));
    }

    debug!(
        "Detected {} {}x{} ({:?}, {} bytes)",
        format,
        width,
        height,
        color_mode,
        bytes.len()
    );

    Ok(SourceImage {
        format,
        width,
        height,
        color_mode,
        original_size: bytes.len(),
    })
}

/// Detect, then fully decode the raster
pub fn decode(bytes: &[u8]) -> Result<DecodedImage, CompressError> {
    let info = detect(bytes)?;
    let pixels = image::load_from_memory_with_format(bytes, info.format.to_image_format())
        .map_err(|e| CompressError::Decode(e.to_string()))?;

    if pixels.width() != info.width || pixels.height() != info.height {
        return Err(CompressError::Decode(format!(
            "header says {}x{} but decoded {}x{}",
            info.width,
            info.height,
            pixels.width(),
            pixels.height()
        )));
    }

    Ok(DecodedImage { info, pixels })
}

/// Match the magic bytes against the accepted inputs
fn sniff_format(bytes: &[u8]) -> Result<EncodedFormat, CompressError> {
    if bytes.starts_with(PNG_SIGNATURE) {
        return Ok(EncodedFormat::Png);
    }
    if bytes.starts_with(JPEG_SIGNATURE) {
        return Ok(EncodedFormat::Jpeg);
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Ok(EncodedFormat::WebP);
    }

    // Container riconosciuti ma non accettati: messaggio esplicito
    let known = if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("GIF")
    } else if bytes.starts_with(b"BM") && bytes.len() >= 14 {
        Some("BMP")
    } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
        Some("TIFF")
    } else if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        match &bytes[8..12] {
            b"avif" | b"avis" => Some("AVIF"),
            b"heic" | b"heix" | b"mif1" | b"msf1" => Some("HEIF"),
            _ => None,
        }
    } else {
        None
    };

    match known {
        Some(name) => Err(CompressError::UnsupportedFormat(format!(
            "{} input is not supported (accepted: PNG, JPEG, WebP)",
            name
        ))),
        None => Err(CompressError::UnsupportedFormat(
            "unrecognized byte signature".to_string(),
        )),
    }
}

/// Read IHDR (always the first chunk) and scan for tRNS before IDAT
fn read_png_header(bytes: &[u8]) -> Result<(u32, u32, ColorMode), CompressError> {
    // signature(8) + length(4) + "IHDR"(4) + width(4) + height(4) + depth(1) + colour type(1)
    if bytes.len() < 26 || &bytes[12..16] != b"IHDR" {
        return Err(CompressError::Decode("truncated PNG header".to_string()));
    }

    let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
    let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    let color_type = bytes[25];

    let color_mode = match color_type {
        3 => ColorMode::Indexed,
        4 | 6 => ColorMode::TruecolorAlpha,
        0 | 2 if png_has_trns(bytes) => ColorMode::TruecolorAlpha,
        0 | 2 => ColorMode::Truecolor,
        other => {
            return Err(CompressError::Decode(format!(
                "invalid PNG colour type {}",
                other
            )))
        }
    };

    Ok((width, height, color_mode))
}

fn png_has_trns(bytes: &[u8]) -> bool {
    let mut offset = PNG_SIGNATURE.len();
    while offset + 8 <= bytes.len() {
        let length = u32::from_be_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]) as usize;
        let chunk_type = &bytes[offset + 4..offset + 8];
        match chunk_type {
            b"tRNS" => return true,
            b"IDAT" | b"IEND" => return false,
            _ => {}
        }
        // length + type + data + crc
        offset = match offset.checked_add(12 + length) {
            Some(next) => next,
            None => return false,
        };
    }
    false
}
