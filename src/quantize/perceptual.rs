//! Perceptual palette quantization backed by libimagequant.
//!
//! Compiled only with the `perceptual-quantizer` feature; without it the
//! backend reports itself unavailable and the chain falls back to median cut.

use super::{IndexedImage, QuantizeError, Quantizer};
use image::RgbaImage;

const BACKEND: &str = "imagequant";

/// libimagequant settings: no min/max quality so it compresses freely
#[derive(Debug, Clone)]
pub struct PerceptualQuantizer {
    /// 1 = slowest/best, 10 = fastest
    pub speed: i32,
    /// Floyd–Steinberg amount (0.0-1.0)
    pub dithering_level: f32,
}

impl Default for PerceptualQuantizer {
    fn default() -> Self {
        Self {
            speed: 4,
            dithering_level: 1.0,
        }
    }
}

impl Quantizer for PerceptualQuantizer {
    fn name(&self) -> &'static str {
        BACKEND
    }

    #[cfg(feature = "perceptual-quantizer")]
    fn quantize(&self, image: &RgbaImage, max_colors: u16) -> Result<IndexedImage, QuantizeError> {
        let failed = |e: imagequant::Error| QuantizeError::Failed {
            backend: BACKEND,
            message: e.to_string(),
        };

        let (width, height) = image.dimensions();
        let pixels: Vec<imagequant::RGBA> = image
            .pixels()
            .map(|p| imagequant::RGBA {
                r: p.0[0],
                g: p.0[1],
                b: p.0[2],
                a: p.0[3],
            })
            .collect();

        let mut attr = imagequant::Attributes::new();
        attr.set_max_colors(u32::from(max_colors)).map_err(failed)?;
        attr.set_speed(self.speed).map_err(failed)?;

        // 0.0 = sRGB gamma
        let mut liq_image = attr
            .new_image(pixels, width as usize, height as usize, 0.0)
            .map_err(failed)?;
        let mut result = attr.quantize(&mut liq_image).map_err(failed)?;
        result.set_dithering_level(self.dithering_level).map_err(failed)?;

        let (palette, indices) = result.remapped(&mut liq_image).map_err(failed)?;

        Ok(IndexedImage {
            width,
            height,
            palette: palette.iter().map(|c| [c.r, c.g, c.b, c.a]).collect(),
            indices,
        })
    }

    #[cfg(not(feature = "perceptual-quantizer"))]
    fn quantize(&self, _image: &RgbaImage, _max_colors: u16) -> Result<IndexedImage, QuantizeError> {
        Err(QuantizeError::Unavailable(BACKEND))
    }
}
