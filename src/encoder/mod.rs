//! # Encoder Module
//!
//! Un encoder per ciascun formato di output; ognuno possiede la propria
//! politica di qualità (costanti, non regolabili per richiesta).
//!
//! ## Responsabilità:
//! - `PaletteEncoder`: quantizzazione a ≤256 colori → PNG indicizzato → oxipng
//! - `PhotoEncoder`: appiattimento alpha su bianco → JPEG q85 → strip marker
//! - `ModernEncoder`: WebP lossy q85, method 6
//! - `Diagnostic`: eventi non fatali raccolti durante la codifica
//!
//! ## Strategia:
//! Gli encoder non conoscono il formato sorgente: ricevono un `DecodedImage`
//! già validato e restituiscono byte + diagnostica. La scelta dell'encoder è
//! un `match` esaustivo su `EncodedFormat` nell'orchestratore.

pub mod modern;
pub mod palette;
pub mod photo;

pub use modern::ModernEncoder;
pub use palette::PaletteEncoder;
pub use photo::PhotoEncoder;

use crate::detector::DecodedImage;
use crate::error::CompressError;
use crate::format::EncodedFormat;
use crate::post_optimizer::{apply_post_optimizer, PostOptimizeOutcome, PostOptimizer};
use serde::{Deserialize, Serialize};

/// Non-fatal pipeline event attached to a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The primary quantizer could not run; `fallback` produced the palette
    QuantizerFallback {
        primary: String,
        fallback: String,
        reason: String,
    },
    PostOptimizerApplied { optimizer: String, saved: usize },
    PostOptimizerDeclined { optimizer: String },
    PostOptimizerFailed { optimizer: String, reason: String },
    PostOptimizerUnavailable { optimizer: String },
    /// Transparent pixels were composited onto white for a format without alpha
    AlphaFlattened,
}

/// Encoded bytes plus what happened along the way
#[derive(Debug)]
pub struct EncodeOutput {
    pub bytes: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
}

/// One output format with a fixed quality policy
pub trait FormatEncoder: Send + Sync {
    fn format(&self) -> EncodedFormat;

    fn encode(&self, image: &DecodedImage) -> Result<EncodeOutput, CompressError>;
}

/// Run the optional post-optimizer and record its outcome
pub(crate) fn post_optimize(
    optimizer: Option<&dyn PostOptimizer>,
    bytes: Vec<u8>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<u8> {
    let Some(optimizer) = optimizer else {
        return bytes;
    };

    let name = optimizer.name().to_string();
    let (bytes, outcome) = apply_post_optimizer(optimizer, bytes);
    diagnostics.push(match outcome {
        PostOptimizeOutcome::Applied { saved } => Diagnostic::PostOptimizerApplied { optimizer: name, saved },
        PostOptimizeOutcome::Declined => Diagnostic::PostOptimizerDeclined { optimizer: name },
        PostOptimizeOutcome::Failed { reason } => Diagnostic::PostOptimizerFailed { optimizer: name, reason },
        PostOptimizeOutcome::Unavailable => Diagnostic::PostOptimizerUnavailable { optimizer: name },
    });
    bytes
}
