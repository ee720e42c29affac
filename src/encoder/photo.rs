//! Lossy photographic encoder (JPEG via mozjpeg)
//!
//! Progressive scans, per-image Huffman tables and 4:2:0 chroma subsampling.
//! Alpha is composited onto white first.

use super::{post_optimize, Diagnostic, EncodeOutput, FormatEncoder};
use crate::detector::DecodedImage;
use crate::error::CompressError;
use crate::format::EncodedFormat;
use crate::post_optimizer::PostOptimizer;
use image::{DynamicImage, Rgb, RgbImage};
use mozjpeg::{ColorSpace, Compress, ScanMode};

/// Fixed JPEG quality (1-100)
pub const JPEG_QUALITY: u8 = 85;

pub struct PhotoEncoder {
    optimizer: Option<Box<dyn PostOptimizer>>,
}

impl PhotoEncoder {
    pub fn new(optimizer: Option<Box<dyn PostOptimizer>>) -> Self {
        Self { optimizer }
    }
}

impl FormatEncoder for PhotoEncoder {
    fn format(&self) -> EncodedFormat {
        EncodedFormat::Jpeg
    }

    fn encode(&self, image: &DecodedImage) -> Result<EncodeOutput, CompressError> {
        let mut diagnostics = Vec::new();

        let (rgb, flattened) = flatten_onto_white(&image.pixels);
        if flattened {
            diagnostics.push(Diagnostic::AlphaFlattened);
        }

        let bytes = encode_progressive(&rgb)?;

        let bytes = post_optimize(self.optimizer.as_deref(), bytes, &mut diagnostics);
        Ok(EncodeOutput { bytes, diagnostics })
    }
}

/// Progressive, Huffman-optimized JPEG at `JPEG_QUALITY` with 4:2:0 chroma
pub(crate) fn encode_progressive(rgb: &RgbImage) -> Result<Vec<u8>, CompressError> {
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);

    let mut comp = Compress::new(ColorSpace::JCS_RGB);
    comp.set_size(width, height);
    comp.set_color_space(ColorSpace::JCS_YCbCr);
    comp.set_quality(f32::from(JPEG_QUALITY));
    comp.set_chroma_sampling_pixel_sizes((2, 2), (2, 2));
    comp.set_progressive_mode();
    comp.set_optimize_coding(true);
    comp.set_optimize_scans(true);
    comp.set_scan_optimization_mode(ScanMode::AllComponentsTogether);

    let mut output = Vec::with_capacity((width * height * 3 / 10).max(4096));
    {
        let mut writer = comp
            .start_compress(&mut output)
            .map_err(|e| mozjpeg_err("start compress", e))?;
        for row in rgb.as_raw().chunks(width * 3) {
            writer
                .write_scanlines(row)
                .map_err(|e| mozjpeg_err("write scanlines", e))?;
        }
        writer.finish().map_err(|e| mozjpeg_err("finish", e))?;
    }
    Ok(output)
}

fn mozjpeg_err(stage: &str, e: impl std::fmt::Debug) -> CompressError {
    CompressError::Encode(format!("mozjpeg: failed to {}: {:?}", stage, e))
}

/// Composite onto an opaque white background.
///
/// Returns the RGB raster and whether any pixel was actually translucent.
pub(crate) fn flatten_onto_white(pixels: &DynamicImage) -> (RgbImage, bool) {
    if !pixels.color().has_alpha() {
        return (pixels.to_rgb8(), false);
    }

    let rgba = pixels.to_rgba8();
    let mut translucent = false;
    let rgb = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        if a < u8::MAX {
            translucent = true;
        }
        let blend = |c: u8| {
            let (c, a) = (u32::from(c), u32::from(a));
            ((c * a + 255 * (255 - a) + 127) / 255) as u8
        };
        Rgb([blend(r), blend(g), blend(b)])
    });
    (rgb, translucent)
}
