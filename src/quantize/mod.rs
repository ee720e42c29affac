//! # Quantization Module
//!
//! Riduzione di un raster RGBA a una palette limitata (≤256 colori).
//!
//! ## Backend (in ordine di preferenza):
//! 1. **perceptual** (`PerceptualQuantizer`): libimagequant, pesato percettivamente,
//!    dithering Floyd–Steinberg. Dipendenza opzionale (feature `perceptual-quantizer`).
//! 2. **median-cut** (`MedianCutQuantizer`): deterministico, nessuna dipendenza
//!    opzionale, sempre disponibile.
//!
//! ## Strategia:
//! `QuantizerChain` prova il backend primario e, su qualsiasi errore o
//! indisponibilità, passa al fallback. Il fallback non è mai un errore per il
//! chiamante: viene loggato e riportato come diagnostica.

pub mod median_cut;
pub mod perceptual;

pub use median_cut::MedianCutQuantizer;
pub use perceptual::PerceptualQuantizer;

use image::RgbaImage;
use tracing::{debug, warn};

/// Palette budget used for the palette raster target
pub const PALETTE_MAX_COLORS: u16 = 256;

/// Errors raised by a single quantization backend
#[derive(thiserror::Error, Debug)]
pub enum QuantizeError {
    #[error("{0} is not available in this build")]
    Unavailable(&'static str),

    #[error("{backend} failed: {message}")]
    Failed {
        backend: &'static str,
        message: String,
    },

    #[error("invalid palette budget {0} (expected 2..=256)")]
    InvalidColorCount(u16),
}

/// Paletted raster: every index addresses an entry of `palette`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    pub width: u32,
    pub height: u32,
    /// RGBA palette entries
    pub palette: Vec<[u8; 4]>,
    /// One palette index per pixel, row-major
    pub indices: Vec<u8>,
}

impl IndexedImage {
    pub fn has_transparency(&self) -> bool {
        self.palette.iter().any(|c| c[3] < u8::MAX)
    }
}

/// A palette quantization backend.
///
/// Implementations must be stateless so one instance can be shared across
/// concurrently running requests.
pub trait Quantizer: Send + Sync {
    /// Short name used in logs and diagnostics
    fn name(&self) -> &'static str;

    fn quantize(&self, image: &RgbaImage, max_colors: u16) -> Result<IndexedImage, QuantizeError>;
}

/// Outcome of the try-primary-then-fallback policy
#[derive(Debug)]
pub struct QuantizeOutcome {
    pub image: IndexedImage,
    pub backend: &'static str,
    /// Why the primary backend was skipped, when the fallback ran
    pub fallback_reason: Option<String>,
}

/// Primary backend with a guaranteed fallback
pub struct QuantizerChain {
    primary: Option<Box<dyn Quantizer>>,
    fallback: Box<dyn Quantizer>,
}

impl QuantizerChain {
    pub fn new(primary: Option<Box<dyn Quantizer>>, fallback: Box<dyn Quantizer>) -> Self {
        Self { primary, fallback }
    }

    /// Perceptual backend first (when enabled), median cut as fallback
    pub fn with_defaults(use_perceptual: bool) -> Self {
        let primary: Option<Box<dyn Quantizer>> = if use_perceptual {
            Some(Box::new(PerceptualQuantizer::default()))
        } else {
            None
        };
        Self::new(primary, Box::new(MedianCutQuantizer))
    }

    pub fn primary_name(&self) -> Option<&'static str> {
        self.primary.as_ref().map(|q| q.name())
    }

    /// Quantize with the primary backend; on any failure use the fallback.
    ///
    /// Only a fallback failure is returned as an error.
    pub fn quantize(&self, image: &RgbaImage, max_colors: u16) -> Result<QuantizeOutcome, QuantizeError> {
        if !(2..=PALETTE_MAX_COLORS).contains(&max_colors) {
            return Err(QuantizeError::InvalidColorCount(max_colors));
        }

        let fallback_reason = match &self.primary {
            Some(primary) => match primary.quantize(image, max_colors) {
                Ok(indexed) => {
                    debug!("Quantized with {} ({} colors)", primary.name(), indexed.palette.len());
                    return Ok(QuantizeOutcome {
                        image: indexed,
                        backend: primary.name(),
                        fallback_reason: None,
                    });
                }
                Err(e) => {
                    warn!("{} quantization failed, falling back to {}: {}", primary.name(), self.fallback.name(), e);
                    e.to_string()
                }
            },
            None => {
                debug!("No primary quantizer configured, using {}", self.fallback.name());
                "primary quantizer disabled".to_string()
            }
        };

        let indexed = self.fallback.quantize(image, max_colors)?;
        Ok(QuantizeOutcome {
            image: indexed,
            backend: self.fallback.name(),
            fallback_reason: Some(fallback_reason),
        })
    }
}
