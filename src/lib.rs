//! # Space Image Compressor Library
//!
//! Motore di compressione immagini in memoria: riceve byte grezzi e un formato
//! di destinazione, restituisce byte compressi con metriche e diagnostica.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare del motore
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `detector`: Rilevamento formato dai magic bytes e decodifica
//! - `quantize`: Quantizzazione a palette (imagequant + median cut di fallback)
//! - `post_optimizer`: Ottimizzazione lossless dei byte codificati (oxipng, strip marker JPEG)
//! - `encoder`: Un encoder per formato di output (PNG a palette, JPEG, WebP)
//! - `compressor`: Orchestratore di una singola richiesta
//! - `batch`: Esecuzione di un batch con progresso e cancellazione
//! - `api`: Confine verso i client (limiti, data URI, totali)
//! - `advisor`: Suggerimento del formato di output
//! - `config`, `error`, `progress`, `json_output`, `file_manager`: infrastruttura
//!
//! ## Utilizzo:
//! ```rust
//! use space_image_compressor::{CompressionRequest, Compressor, Config, OutputFormat};
//!
//! let compressor = Compressor::new(&Config::default());
//! let result = compressor.compress(&CompressionRequest::new("photo.png", bytes, OutputFormat::Modern));
//! println!("{}: {:.2}% saved", result.filename, result.compression_ratio);
//! ```

pub mod advisor;
pub mod api;
pub mod batch;
pub mod compressor;
pub mod config;
pub mod detector;
pub mod encoder;
pub mod error;
pub mod file_manager;
pub mod format;
pub mod json_output;
pub mod post_optimizer;
pub mod progress;
pub mod quantize;
pub mod result;

#[cfg(test)]
pub(crate) mod test_support;

pub use batch::{BatchRunner, ProgressEvent};
pub use compressor::Compressor;
pub use config::Config;
pub use error::{CompressError, ErrorKind};
pub use format::{ColorMode, EncodedFormat, OutputFormat};
pub use result::{CompressionRequest, CompressionResult};
