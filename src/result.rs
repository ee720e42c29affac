//! # Request / Result Module
//!
//! Strutture dati di una singola compressione.
//!
//! ## Strutture dati:
//! - `CompressionRequest`: nome file, byte sorgente, formato richiesto (monouso)
//! - `CompressionResult`: metriche, byte codificati, errore tipizzato, diagnostica
//!
//! ## Invarianti:
//! - Successo: `compression_ratio == round2(100 * (1 - compressed / original))`,
//!   negativo se l'output è più grande (mai troncato)
//! - `original_size == 0` → ratio `0.0`, mai NaN
//! - Fallimento: `compressed_size == 0`, `encoded_data` vuoto, ratio `0.0`
//!
//! ## Esempio JSON (i byte codificati non vengono serializzati):
//! ```json
//! {
//!   "filename": "logo.png",
//!   "original_size": 48213,
//!   "compressed_size": 12877,
//!   "compression_ratio": 73.29,
//!   "format": "png",
//!   "success": true,
//!   "error": null,
//!   "error_kind": null,
//!   "diagnostics": [{ "event": "post_optimizer_applied", "optimizer": "oxipng", "saved": 811 }]
//! }
//! ```

use crate::encoder::Diagnostic;
use crate::error::{CompressError, ErrorKind};
use crate::format::{EncodedFormat, OutputFormat};
use serde::Serialize;

/// One file to compress
#[derive(Debug, Clone)]
pub struct CompressionRequest {
    pub filename: String,
    pub data: Vec<u8>,
    pub format: OutputFormat,
}

impl CompressionRequest {
    pub fn new(filename: impl Into<String>, data: Vec<u8>, format: OutputFormat) -> Self {
        Self {
            filename: filename.into(),
            data,
            format,
        }
    }
}

/// Outcome of one request
#[derive(Debug, Clone, Serialize)]
pub struct CompressionResult {
    pub filename: String,
    pub original_size: usize,
    pub compressed_size: usize,
    pub compression_ratio: f64,
    /// Concrete output format; `None` when the target could not be resolved
    #[serde(rename = "format")]
    pub resolved_format: Option<EncodedFormat>,
    #[serde(skip)]
    pub encoded_data: Vec<u8>,
    pub success: bool,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompressionResult {
    pub fn success(
        filename: impl Into<String>,
        original_size: usize,
        resolved_format: EncodedFormat,
        encoded_data: Vec<u8>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let compressed_size = encoded_data.len();
        Self {
            filename: filename.into(),
            original_size,
            compressed_size,
            compression_ratio: compression_ratio(original_size, compressed_size),
            resolved_format: Some(resolved_format),
            encoded_data,
            success: true,
            error: None,
            error_kind: None,
            diagnostics,
        }
    }

    pub fn failure(
        filename: impl Into<String>,
        original_size: usize,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            original_size,
            compressed_size: 0,
            compression_ratio: 0.0,
            resolved_format: None,
            encoded_data: Vec::new(),
            success: false,
            error: Some(message.into()),
            error_kind: Some(kind),
            diagnostics: Vec::new(),
        }
    }

    pub fn from_error(filename: impl Into<String>, original_size: usize, error: &CompressError) -> Self {
        Self::failure(filename, original_size, error.kind(), error.to_string())
    }

    /// Failure that still records diagnostics gathered before the error
    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn bytes_saved(&self) -> u64 {
        if self.success {
            self.original_size.saturating_sub(self.compressed_size) as u64
        } else {
            0
        }
    }
}

/// Percentage saved, rounded to two decimals; `0.0` when `original` is zero
pub fn compression_ratio(original: usize, compressed: usize) -> f64 {
    if original == 0 {
        return 0.0;
    }
    let ratio = (1.0 - compressed as f64 / original as f64) * 100.0;
    (ratio * 100.0).round() / 100.0
}
