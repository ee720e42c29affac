//! # Compression Orchestrator
//!
//! Esegue una singola richiesta: rilevamento → scelta encoder → misura.
//!
//! ## Responsabilità:
//! - Decodifica e rileva il formato sorgente (`detector`)
//! - Risolve `OutputFormat::Original` nel formato della sorgente
//! - Seleziona l'encoder con un `match` esaustivo su `EncodedFormat`
//! - Calcola dimensione compressa e percentuale di riduzione
//! - Converte ogni errore in un `CompressionResult` fallito: nulla esce come `Err`
//!
//! ## Determinismo:
//! Tutti i backend girano single-thread: stessi byte + stesso formato
//! producono un output identico byte per byte.

use crate::config::Config;
use crate::detector;
use crate::encoder::{FormatEncoder, ModernEncoder, PaletteEncoder, PhotoEncoder};
use crate::error::{CompressError, ErrorKind};
use crate::format::EncodedFormat;
use crate::post_optimizer::{JpegMarkerStripper, PngOptimizer, PostOptimizer};
use crate::quantize::QuantizerChain;
use crate::result::{CompressionRequest, CompressionResult};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info, warn};

/// Stateless request processor; safe to share between threads
pub struct Compressor {
    palette: PaletteEncoder,
    photo: PhotoEncoder,
    modern: ModernEncoder,
}

impl Compressor {
    /// Build the encoder set from the configuration switches
    pub fn new(config: &Config) -> Self {
        let quantizers = QuantizerChain::with_defaults(config.perceptual_quantizer);

        let (png_optimizer, jpeg_optimizer): (Option<Box<dyn PostOptimizer>>, Option<Box<dyn PostOptimizer>>) =
            if config.post_optimize {
                (Some(Box::new(PngOptimizer::default())), Some(Box::new(JpegMarkerStripper)))
            } else {
                (None, None)
            };

        debug!(
            "Compressor ready (quantizer: {}, post-optimize: {})",
            quantizers.primary_name().unwrap_or("median-cut only"),
            config.post_optimize
        );

        Self::with_encoders(
            PaletteEncoder::new(quantizers, png_optimizer),
            PhotoEncoder::new(jpeg_optimizer),
            ModernEncoder,
        )
    }

    pub fn with_encoders(palette: PaletteEncoder, photo: PhotoEncoder, modern: ModernEncoder) -> Self {
        Self { palette, photo, modern }
    }

    fn encoder_for(&self, format: EncodedFormat) -> &dyn FormatEncoder {
        match format {
            EncodedFormat::Png => &self.palette,
            EncodedFormat::Jpeg => &self.photo,
            EncodedFormat::WebP => &self.modern,
        }
    }

    /// Compress one request. Never fails: errors and backend panics become failed results.
    pub fn compress(&self, request: &CompressionRequest) -> CompressionResult {
        let original_size = request.data.len();

        match panic::catch_unwind(AssertUnwindSafe(|| self.try_compress(request))) {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!("{}: {}", request.filename, e);
                CompressionResult::from_error(&request.filename, original_size, &e)
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!("{}: encoder panicked: {}", request.filename, reason);
                CompressionResult::failure(
                    &request.filename,
                    original_size,
                    ErrorKind::Encode,
                    format!("encoder panicked: {}", reason),
                )
            }
        }
    }

    fn try_compress(&self, request: &CompressionRequest) -> Result<CompressionResult, CompressError> {
        let image = detector::decode(&request.data)?;
        let target = request.format.resolve(image.info.format);
        debug!(
            "{}: {} {}x{} -> {}",
            request.filename, image.info.format, image.info.width, image.info.height, target
        );

        let encoder = self.encoder_for(target);
        let output = encoder.encode(&image)?;

        let result = CompressionResult::success(
            &request.filename,
            request.data.len(),
            encoder.format(),
            output.bytes,
            output.diagnostics,
        );
        info!(
            "{}: {} -> {} bytes ({:.2}%) as {}",
            request.filename, result.original_size, result.compressed_size, result.compression_ratio, target
        );
        Ok(result)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::detect;
    use crate::encoder::Diagnostic;
    use crate::format::OutputFormat;
    use crate::quantize::{IndexedImage, MedianCutQuantizer, QuantizeError, Quantizer};
    use crate::test_support::{
        gradient_rgb, gradient_rgba, jpeg_bytes, palette_png_bytes, png_bytes, webp_bytes, webp_lossy_rgba_bytes,
    };
    use image::{DynamicImage, RgbaImage};

    const ALL_FORMATS: [OutputFormat; 4] = [
        OutputFormat::Original,
        OutputFormat::PaletteRaster,
        OutputFormat::LossyPhoto,
        OutputFormat::Modern,
    ];

    /// Every source is 48x32
    fn sources() -> Vec<(&'static str, Vec<u8>)> {
        let rgb = DynamicImage::ImageRgb8(gradient_rgb(48, 32));
        let rgba = DynamicImage::ImageRgba8(gradient_rgba(48, 32));
        vec![
            ("truecolor.png", png_bytes(&rgb)),
            ("alpha.png", png_bytes(&rgba)),
            ("photo.jpg", jpeg_bytes(&gradient_rgb(48, 32))),
            ("image.webp", webp_bytes(&gradient_rgb(48, 32))),
            ("indexed.png", palette_png_bytes(48, 32)),
            ("gray.png", png_bytes(&DynamicImage::ImageLuma8(rgb.to_luma8()))),
            ("gray_alpha.png", png_bytes(&DynamicImage::ImageLumaA8(rgba.to_luma_alpha8()))),
            ("deep.png", png_bytes(&DynamicImage::ImageRgb16(rgb.to_rgb16()))),
            ("alpha.webp", webp_lossy_rgba_bytes(&gradient_rgba(48, 32))),
        ]
    }

    struct CrashingQuantizer;

    impl Quantizer for CrashingQuantizer {
        fn name(&self) -> &'static str {
            "crashing"
        }

        fn quantize(&self, _image: &RgbaImage, _max_colors: u16) -> Result<IndexedImage, QuantizeError> {
            Err(QuantizeError::Failed {
                backend: "crashing",
                message: "simulated failure".to_string(),
            })
        }
    }

    #[test]
    fn test_every_source_and_target_succeeds() {
        let compressor = Compressor::new(&Config::default());

        for (name, bytes) in sources() {
            let source_format = detect(&bytes).unwrap().format;
            for format in ALL_FORMATS {
                let request = CompressionRequest::new(name, bytes.clone(), format);
                let result = compressor.compress(&request);

                assert!(result.success, "{} -> {:?}: {:?}", name, format, result.error);
                assert_eq!(result.compressed_size, result.encoded_data.len());
                assert_eq!(result.original_size, bytes.len());

                let expected = format.resolve(source_format);
                assert_eq!(result.resolved_format, Some(expected));
                let output = detect(&result.encoded_data).unwrap();
                assert_eq!(output.format, expected);
                assert_eq!((output.width, output.height), (48, 32), "{} -> {:?}", name, format);
            }
        }
    }

    #[test]
    fn test_output_is_deterministic() {
        let compressor = Compressor::new(&Config::default());
        for (name, bytes) in sources() {
            for format in ALL_FORMATS {
                let request = CompressionRequest::new(name, bytes.clone(), format);
                let a = compressor.compress(&request);
                let b = compressor.compress(&request);
                assert_eq!(a.encoded_data, b.encoded_data, "{} -> {:?}", name, format);
            }
        }
    }

    #[test]
    fn test_quantizer_failure_falls_back() {
        let chain = QuantizerChain::new(Some(Box::new(CrashingQuantizer)), Box::new(MedianCutQuantizer));
        let compressor = Compressor::with_encoders(
            PaletteEncoder::new(chain, None),
            PhotoEncoder::new(None),
            ModernEncoder,
        );

        let bytes = png_bytes(&DynamicImage::ImageRgb8(gradient_rgb(32, 32)));
        let result = compressor.compress(&CompressionRequest::new("a.png", bytes, OutputFormat::PaletteRaster));

        assert!(result.success);
        assert!(matches!(
            &result.diagnostics[0],
            Diagnostic::QuantizerFallback { primary, fallback, .. } if primary == "crashing" && fallback == "median-cut"
        ));
    }

    struct PanickingQuantizer;

    impl Quantizer for PanickingQuantizer {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn quantize(&self, _image: &RgbaImage, _max_colors: u16) -> Result<IndexedImage, QuantizeError> {
            panic!("palette backend blew up");
        }
    }

    #[test]
    fn test_backend_panic_becomes_encode_failure() {
        let chain = QuantizerChain::new(None, Box::new(PanickingQuantizer));
        let compressor = Compressor::with_encoders(PaletteEncoder::new(chain, None), PhotoEncoder::new(None), ModernEncoder);

        let bytes = png_bytes(&DynamicImage::ImageRgb8(gradient_rgb(8, 8)));
        let result = compressor.compress(&CompressionRequest::new("boom.png", bytes.clone(), OutputFormat::PaletteRaster));
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::Encode));
        assert!(result.error.unwrap().contains("palette backend blew up"));
        assert_eq!(result.original_size, bytes.len());

        // The same compressor keeps working afterwards
        let ok = compressor.compress(&CompressionRequest::new("ok.png", bytes, OutputFormat::Modern));
        assert!(ok.success);
    }

    #[test]
    fn test_corrupt_input_is_decode_failure() {
        let compressor = Compressor::new(&Config::default());
        let mut bytes = png_bytes(&DynamicImage::ImageRgb8(gradient_rgb(32, 32)));
        bytes.truncate(60);

        let result = compressor.compress(&CompressionRequest::new("broken.png", bytes, OutputFormat::Original));
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::Decode));
        assert_eq!(result.compressed_size, 0);
        assert_eq!(result.original_size, 60);
    }

    #[test]
    fn test_unsupported_input_is_decode_failure() {
        let compressor = Compressor::new(&Config::default());
        let result = compressor.compress(&CompressionRequest::new(
            "anim.gif",
            b"GIF89a\x01\x00\x01\x00\x00\x00\x00".to_vec(),
            OutputFormat::Modern,
        ));
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::Decode));
        assert!(result.error.unwrap().contains("GIF"));
    }

    #[test]
    fn test_single_pixel_palette_image() {
        let compressor = Compressor::new(&Config::default());
        let bytes = palette_png_bytes(1, 1);
        let result = compressor.compress(&CompressionRequest::new("dot.png", bytes, OutputFormat::Original));

        assert!(result.success, "{:?}", result.error);
        let decoded = image::load_from_memory(&result.encoded_data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1, 1));
        let [r, g, b, a] = decoded.to_rgba8().get_pixel(0, 0).0;
        assert!(r >= 250 && g <= 5 && b <= 5 && a == 255);
    }

    #[test]
    fn test_ratio_matches_sizes_even_when_output_grows() {
        // Tiny inputs often grow once re-encoded; the ratio is reported unclamped
        let compressor = Compressor::new(&Config::default());
        let bytes = jpeg_bytes(&gradient_rgb(4, 4));
        let result = compressor.compress(&CompressionRequest::new("t.jpg", bytes, OutputFormat::Modern));

        assert!(result.success);
        let expected = crate::result::compression_ratio(result.original_size, result.compressed_size);
        assert_eq!(result.compression_ratio, expected);
    }

    #[test]
    fn test_post_optimize_disabled() {
        let config = Config {
            post_optimize: false,
            ..Config::default()
        };
        let compressor = Compressor::new(&config);
        let bytes = jpeg_bytes(&gradient_rgb(16, 16));
        let result = compressor.compress(&CompressionRequest::new("p.jpg", bytes, OutputFormat::LossyPhoto));
        assert!(result.success);
        assert!(result.diagnostics.is_empty());
    }
}
