//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom del motore di compressione.
//!
//! ## Responsabilità:
//! - Definisce `CompressError` per categorizzare ogni fallimento di un singolo file
//! - Espone `ErrorKind`, il tag serializzabile che finisce in `CompressionResult`
//! - Integra con `thiserror` per conversioni automatiche dagli errori di `image`
//!
//! ## Categorie di errori:
//! - `Decode`: Byte corrotti, troncati o non decodificabili
//! - `UnsupportedFormat`: Firma dei byte non riconosciuta o container non supportato
//! - `UnsupportedTarget`: Il formato di destinazione non può rappresentare l'immagine
//! - `Encode`: L'encoder è fallito dopo una decodifica riuscita
//! - `DependencyUnavailable`: Backend opzionale mancante (mai fatale, solo diagnostica)
//!
//! ## Esempio:
//! ```rust
//! if width > MAX_WEBP_DIMENSION {
//!     return Err(CompressError::UnsupportedTarget(format!("{}x{} exceeds WebP limits", width, height)));
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Custom error types for a single compression request
#[derive(thiserror::Error, Debug)]
pub enum CompressError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported target format: {0}")]
    UnsupportedTarget(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Optional dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompressError {
    /// Taxonomy tag reported to callers
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompressError::Decode(_) | CompressError::UnsupportedFormat(_) => ErrorKind::Decode,
            CompressError::UnsupportedTarget(_) => ErrorKind::UnsupportedTarget,
            CompressError::Encode(_) => ErrorKind::Encode,
            CompressError::DependencyUnavailable(_) => ErrorKind::DependencyUnavailable,
            // `image` errors reach us only from the decode path; encoders map their own errors
            CompressError::Image(_) => ErrorKind::Decode,
            CompressError::Io(_) => ErrorKind::Encode,
        }
    }
}

/// Error taxonomy surfaced per item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Decode,
    UnsupportedTarget,
    Encode,
    DependencyUnavailable,
    /// The batch was stopped before this item started
    Cancelled,
    /// The boundary refused the item before it reached the engine
    Rejected,
}
