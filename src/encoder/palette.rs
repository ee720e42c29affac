//! Palette raster encoder (indexed PNG)

use super::{post_optimize, Diagnostic, EncodeOutput, FormatEncoder};
use crate::detector::DecodedImage;
use crate::error::CompressError;
use crate::format::EncodedFormat;
use crate::post_optimizer::PostOptimizer;
use crate::quantize::{IndexedImage, QuantizerChain, PALETTE_MAX_COLORS};
use tracing::debug;

pub struct PaletteEncoder {
    quantizers: QuantizerChain,
    optimizer: Option<Box<dyn PostOptimizer>>,
}

impl PaletteEncoder {
    pub fn new(quantizers: QuantizerChain, optimizer: Option<Box<dyn PostOptimizer>>) -> Self {
        Self { quantizers, optimizer }
    }
}

impl FormatEncoder for PaletteEncoder {
    fn format(&self) -> EncodedFormat {
        EncodedFormat::Png
    }

    fn encode(&self, image: &DecodedImage) -> Result<EncodeOutput, CompressError> {
        let mut diagnostics = Vec::new();
        let rgba = image.pixels.to_rgba8();

        let outcome = self
            .quantizers
            .quantize(&rgba, PALETTE_MAX_COLORS)
            .map_err(|e| CompressError::Encode(format!("quantization failed: {}", e)))?;

        if let (Some(primary), Some(reason)) = (self.quantizers.primary_name(), outcome.fallback_reason) {
            diagnostics.push(Diagnostic::QuantizerFallback {
                primary: primary.to_string(),
                fallback: outcome.backend.to_string(),
                reason,
            });
        }

        let bytes = write_indexed_png(&outcome.image)?;
        debug!(
            "Indexed PNG: {} colors via {}, {} bytes",
            outcome.image.palette.len(),
            outcome.backend,
            bytes.len()
        );

        let bytes = post_optimize(self.optimizer.as_deref(), bytes, &mut diagnostics);
        Ok(EncodeOutput { bytes, diagnostics })
    }
}

/// Colour type 3 PNG; tRNS is written only when some entry is translucent
pub(crate) fn write_indexed_png(indexed: &IndexedImage) -> Result<Vec<u8>, CompressError> {
    let encode_err = |e: png::EncodingError| CompressError::Encode(format!("PNG write failed: {}", e));

    let palette: Vec<u8> = indexed.palette.iter().flat_map(|c| [c[0], c[1], c[2]]).collect();

    let mut output = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut output, indexed.width, indexed.height);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Best);
        encoder.set_palette(palette);

        if indexed.has_transparency() {
            let mut alphas: Vec<u8> = indexed.palette.iter().map(|c| c[3]).collect();
            // Le voci finali opache sono implicite
            while alphas.last() == Some(&u8::MAX) {
                alphas.pop();
            }
            encoder.set_trns(alphas);
        }

        let mut writer = encoder.write_header().map_err(encode_err)?;
        writer.write_image_data(&indexed.indices).map_err(encode_err)?;
        writer.finish().map_err(encode_err)?;
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{decode, detect};
    use crate::format::ColorMode;
    use crate::quantize::MedianCutQuantizer;
    use crate::test_support::{gradient_rgb, gradient_rgba, png_bytes};
    use image::DynamicImage;

    fn encoder() -> PaletteEncoder {
        PaletteEncoder::new(QuantizerChain::with_defaults(false), None)
    }

    #[test]
    fn test_output_is_indexed_png() {
        let source = decode(&png_bytes(&DynamicImage::ImageRgb8(gradient_rgb(64, 48)))).unwrap();
        let output = encoder().encode(&source).unwrap();

        let info = detect(&output.bytes).unwrap();
        assert_eq!(info.format, EncodedFormat::Png);
        assert_eq!(info.color_mode, ColorMode::Indexed);
        assert_eq!((info.width, info.height), (64, 48));
    }

    #[test]
    fn test_transparency_survives() {
        let source = decode(&png_bytes(&DynamicImage::ImageRgba8(gradient_rgba(32, 32)))).unwrap();
        let output = encoder().encode(&source).unwrap();

        let decoded = image::load_from_memory(&output.bytes).unwrap().to_rgba8();
        assert!(decoded.pixels().any(|p| p.0[3] < 128));
    }

    #[test]
    fn test_exact_palette_roundtrips() {
        let indexed = IndexedImage {
            width: 2,
            height: 1,
            palette: vec![[10, 20, 30, 0], [200, 100, 50, 255]],
            indices: vec![0, 1],
        };
        let bytes = write_indexed_png(&indexed).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0[3], 0);
        assert_eq!(decoded.get_pixel(1, 0).0, [200, 100, 50, 255]);
    }

    #[test]
    fn test_disabled_primary_records_no_fallback() {
        let source = decode(&png_bytes(&DynamicImage::ImageRgb8(gradient_rgb(8, 8)))).unwrap();
        let chain = QuantizerChain::new(None, Box::new(MedianCutQuantizer));
        let output = PaletteEncoder::new(chain, None).encode(&source).unwrap();
        assert!(output.diagnostics.is_empty());
    }
}
