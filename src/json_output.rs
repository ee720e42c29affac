//! # JSON Output Module
//!
//! Output strutturato JSON-lines per l'uso programmatico della CLI.
//!
//! ## Responsabilità:
//! - Emette un messaggio JSON per riga su stdout (i log vanno su stderr)
//! - Riusa `CompressionResult` e `BatchStats` come sorgente dei dati
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio batch
//! - `file_complete`: Fine elaborazione di un file (successo o errore)
//! - `progress`: Progresso corrente
//! - `complete`: Fine batch con statistiche finali
//! - `error`: Errore che interrompe il comando

use crate::config::Config;
use crate::error::ErrorKind;
use crate::format::{EncodedFormat, OutputFormat};
use crate::progress::BatchStats;
use crate::result::CompressionResult;
use serde::Serialize;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio del batch
    #[serde(rename = "start")]
    Start {
        total_files: usize,
        output_format: OutputFormat,
        config: JsonConfig,
    },

    /// Fine elaborazione di un file
    #[serde(rename = "file_complete")]
    FileComplete {
        index: usize,
        filename: String,
        original_size: usize,
        compressed_size: usize,
        compression_ratio: f64,
        format: Option<EncodedFormat>,
        success: bool,
        error: Option<String>,
        error_kind: Option<ErrorKind>,
    },

    /// Progresso corrente
    #[serde(rename = "progress")]
    Progress {
        current: usize,
        total: usize,
        percentage: f64,
        files_compressed: usize,
        errors: usize,
        bytes_saved: u64,
    },

    /// Batch completato
    #[serde(rename = "complete")]
    Complete {
        files_processed: usize,
        files_compressed: usize,
        errors: usize,
        cancelled: usize,
        total_original_size: u64,
        total_compressed_size: u64,
        total_compression_ratio: f64,
        duration_seconds: f64,
    },

    /// Errore generale
    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Configurazione riportata nel messaggio `start`
#[derive(Debug, Serialize)]
pub struct JsonConfig {
    pub workers: usize,
    pub max_files_per_batch: usize,
    pub max_file_size: usize,
    pub perceptual_quantizer: bool,
    pub post_optimize: bool,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Some(json) = self.to_line() {
            println!("{}", json);
        }
    }

    /// Riga JSON senza newline
    pub fn to_line(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    pub fn start(total_files: usize, output_format: OutputFormat, config: JsonConfig) -> Self {
        Self::Start {
            total_files,
            output_format,
            config,
        }
    }

    pub fn file_complete(index: usize, result: &CompressionResult) -> Self {
        Self::FileComplete {
            index,
            filename: result.filename.clone(),
            original_size: result.original_size,
            compressed_size: result.compressed_size,
            compression_ratio: result.compression_ratio,
            format: result.resolved_format,
            success: result.success,
            error: result.error.clone(),
            error_kind: result.error_kind,
        }
    }

    pub fn progress(current: usize, total: usize, stats: &BatchStats) -> Self {
        let percentage = if total > 0 {
            (current as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        Self::Progress {
            current,
            total,
            percentage,
            files_compressed: stats.files_compressed,
            errors: stats.files_failed,
            bytes_saved: stats.bytes_saved(),
        }
    }

    pub fn complete(stats: &BatchStats, duration_seconds: f64) -> Self {
        Self::Complete {
            files_processed: stats.files_processed,
            files_compressed: stats.files_compressed,
            errors: stats.files_failed,
            cancelled: stats.files_cancelled,
            total_original_size: stats.total_original_size,
            total_compressed_size: stats.total_compressed_size,
            total_compression_ratio: stats.overall_reduction_percent(),
            duration_seconds,
        }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            workers: config.workers,
            max_files_per_batch: config.max_files_per_batch,
            max_file_size: config.max_file_size,
            perceptual_quantizer: config.perceptual_quantizer,
            post_optimize: config.post_optimize,
        }
    }
}
