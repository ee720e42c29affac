//! Modern codec encoder (lossy WebP via libwebp)

use super::{EncodeOutput, FormatEncoder};
use crate::detector::DecodedImage;
use crate::error::CompressError;
use crate::format::EncodedFormat;
use tracing::debug;

pub const WEBP_QUALITY: f32 = 85.0;
/// 0 = fastest, 6 = slowest/smallest
pub const WEBP_METHOD: i32 = 6;
/// Largest width/height a WebP bitstream can carry
pub const MAX_WEBP_DIMENSION: u32 = 16383;

#[derive(Debug, Clone, Copy, Default)]
pub struct ModernEncoder;

impl FormatEncoder for ModernEncoder {
    fn format(&self) -> EncodedFormat {
        EncodedFormat::WebP
    }

    fn encode(&self, image: &DecodedImage) -> Result<EncodeOutput, CompressError> {
        let (width, height) = (image.pixels.width(), image.pixels.height());
        if width > MAX_WEBP_DIMENSION || height > MAX_WEBP_DIMENSION {
            return Err(CompressError::UnsupportedTarget(format!(
                "{}x{} exceeds the WebP limit of {} pixels per side",
                width, height, MAX_WEBP_DIMENSION
            )));
        }

        let mut config = webp::WebPConfig::new()
            .map_err(|_| CompressError::Encode("failed to create WebPConfig".to_string()))?;
        config.lossless = 0;
        config.quality = WEBP_QUALITY;
        config.method = WEBP_METHOD;
        // Single thread: output identico a ogni esecuzione
        config.thread_level = 0;

        let encoded = if image.pixels.color().has_alpha() {
            let rgba = image.pixels.to_rgba8();
            webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode_advanced(&config)
        } else {
            let rgb = image.pixels.to_rgb8();
            webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode_advanced(&config)
        };
        let memory = encoded.map_err(|e| CompressError::Encode(format!("WebP encode failed: {:?}", e)))?;

        debug!("WebP q{} m{}: {} bytes", WEBP_QUALITY, WEBP_METHOD, memory.len());

        Ok(EncodeOutput {
            bytes: memory.to_vec(),
            diagnostics: Vec::new(),
        })
    }
}
