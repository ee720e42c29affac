//! oxipng-backed PNG optimizer

use super::{PostOptimizeError, PostOptimizer};

const BACKEND: &str = "oxipng";

#[derive(Debug, Clone)]
pub struct PngOptimizer {
    /// oxipng preset (0-6)
    pub preset: u8,
}

impl Default for PngOptimizer {
    fn default() -> Self {
        Self { preset: 2 }
    }
}

impl PostOptimizer for PngOptimizer {
    fn name(&self) -> &'static str {
        BACKEND
    }

    #[cfg(feature = "png-optimizer")]
    fn optimize(&self, bytes: &[u8]) -> Result<Vec<u8>, PostOptimizeError> {
        let mut options = oxipng::Options::from_preset(self.preset);
        // Solo chunk che non influenzano il rendering
        options.strip = oxipng::StripChunks::Safe;

        oxipng::optimize_from_memory(bytes, &options).map_err(|e| PostOptimizeError::Failed {
            backend: BACKEND,
            message: e.to_string(),
        })
    }

    #[cfg(not(feature = "png-optimizer"))]
    fn optimize(&self, _bytes: &[u8]) -> Result<Vec<u8>, PostOptimizeError> {
        Err(PostOptimizeError::Unavailable(BACKEND))
    }
}

#[cfg(all(test, feature = "png-optimizer"))]
mod tests {
    use super::*;
    use crate::post_optimizer::{apply_post_optimizer, PostOptimizeOutcome};
    use crate::test_support::{gradient_rgba, png_bytes};
    use image::DynamicImage;

    #[test]
    fn test_pixels_are_preserved() {
        let source = DynamicImage::ImageRgba8(gradient_rgba(48, 32));
        let bytes = png_bytes(&source);

        let (optimized, _) = apply_post_optimizer(&PngOptimizer::default(), bytes.clone());
        assert!(optimized.len() <= bytes.len());

        let decoded = image::load_from_memory(&optimized).unwrap();
        assert_eq!(decoded.to_rgba8(), source.to_rgba8());
    }

    #[test]
    fn test_second_pass_never_grows() {
        let bytes = png_bytes(&DynamicImage::ImageRgba8(gradient_rgba(40, 40)));
        let optimizer = PngOptimizer::default();

        let (first, _) = apply_post_optimizer(&optimizer, bytes);
        let (second, _) = apply_post_optimizer(&optimizer, first.clone());
        assert!(second.len() <= first.len());
    }

    #[test]
    fn test_garbage_fails_without_panicking() {
        let (out, outcome) = apply_post_optimizer(&PngOptimizer::default(), b"not a png".to_vec());
        assert_eq!(out, b"not a png".to_vec());
        assert!(matches!(outcome, PostOptimizeOutcome::Failed { .. }));
    }
}
