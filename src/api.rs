//! # Boundary Module
//!
//! Confine tra i client e il motore: applica i limiti, serializza i risultati
//! in data URI e calcola i totali del batch. Nessuno stato persistente.
//!
//! ## Responsabilità:
//! - `compress_batch()`: più di `max_files_per_batch` file → `BoundaryError::TooManyFiles`
//!   prima che qualsiasi file raggiunga il runner
//! - File oltre `max_file_size` → risultato fallito `Rejected`, mai decodificato
//! - `ItemResponse`: metadati + `data:<mime>;base64,...` (stringa vuota se fallito)
//! - `BatchResponse`: totali calcolati solo sui file riusciti
//!
//! Il rilevamento del formato è basato sul contenuto: l'estensione del nome
//! file non viene controllata.

use crate::batch::{BatchRunner, ProgressEvent};
use crate::compressor::Compressor;
use crate::config::{Config, DEFAULT_MAX_FILE_SIZE, MAX_FILES_PER_BATCH};
use crate::encoder::Diagnostic;
use crate::error::ErrorKind;
use crate::file_manager::FileManager;
use crate::format::OutputFormat;
use crate::result::{compression_ratio, CompressionRequest, CompressionResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_files_per_batch: usize,
    pub max_file_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_files_per_batch: MAX_FILES_PER_BATCH,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl From<&Config> for Limits {
    fn from(config: &Config) -> Self {
        Self {
            max_files_per_batch: config.max_files_per_batch,
            max_file_size: config.max_file_size,
        }
    }
}

/// A file as received from a client
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BoundaryError {
    #[error("at most {max} files per batch (got {count})")]
    TooManyFiles { count: usize, max: usize },
}

/// One result ready for transport
#[derive(Debug, Clone, Serialize)]
pub struct ItemResponse {
    pub filename: String,
    pub original_size: usize,
    pub compressed_size: usize,
    pub compression_ratio: f64,
    /// `data:<mime>;base64,...`, empty on failure
    pub data: String,
    /// Output file extension, empty on failure
    pub format: String,
    pub success: bool,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub diagnostics: Vec<Diagnostic>,
}

impl From<&CompressionResult> for ItemResponse {
    fn from(result: &CompressionResult) -> Self {
        let (data, format) = match (result.success, result.resolved_format) {
            (true, Some(format)) => (
                data_uri(format.mime_type(), &result.encoded_data),
                format.extension().to_string(),
            ),
            _ => (String::new(), String::new()),
        };

        Self {
            filename: result.filename.clone(),
            original_size: result.original_size,
            compressed_size: result.compressed_size,
            compression_ratio: result.compression_ratio,
            data,
            format,
            success: result.success,
            error: result.error.clone(),
            error_kind: result.error_kind,
            diagnostics: result.diagnostics.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub results: Vec<ItemResponse>,
    pub total_original_size: u64,
    pub total_compressed_size: u64,
    pub total_compression_ratio: f64,
}

impl BatchResponse {
    pub fn from_results(results: &[CompressionResult]) -> Self {
        let succeeded: Vec<&CompressionResult> = results.iter().filter(|r| r.success).collect();
        let total_original_size: u64 = succeeded.iter().map(|r| r.original_size as u64).sum();
        let total_compressed_size: u64 = succeeded.iter().map(|r| r.compressed_size as u64).sum();

        Self {
            total: results.len(),
            success: succeeded.len(),
            failed: results.len() - succeeded.len(),
            results: results.iter().map(ItemResponse::from).collect(),
            total_original_size,
            total_compressed_size,
            total_compression_ratio: compression_ratio(total_original_size as usize, total_compressed_size as usize),
        }
    }
}

pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Oversized files never reach the decoder
fn reject_if_oversized(upload: &UploadedFile, limits: &Limits) -> Option<CompressionResult> {
    if upload.data.len() <= limits.max_file_size {
        return None;
    }
    warn!(
        "{}: rejected, {} exceeds the {} limit",
        upload.filename,
        FileManager::format_size(upload.data.len() as u64),
        FileManager::format_size(limits.max_file_size as u64)
    );
    Some(CompressionResult::failure(
        &upload.filename,
        upload.data.len(),
        ErrorKind::Rejected,
        format!("file too large (max {} bytes)", limits.max_file_size),
    ))
}

/// Compress one uploaded file
pub fn compress_single(
    upload: UploadedFile,
    format: OutputFormat,
    compressor: &Compressor,
    limits: &Limits,
) -> ItemResponse {
    if let Some(rejected) = reject_if_oversized(&upload, limits) {
        return ItemResponse::from(&rejected);
    }
    let request = CompressionRequest::new(upload.filename, upload.data, format);
    ItemResponse::from(&compressor.compress(&request))
}

/// Compress up to `limits.max_files_per_batch` files into a transport response.
///
/// Rejected files keep their slot; `on_progress` sees every index once.
pub async fn compress_batch<F>(
    uploads: Vec<UploadedFile>,
    format: OutputFormat,
    runner: &mut BatchRunner,
    limits: &Limits,
    on_progress: F,
) -> Result<BatchResponse, BoundaryError>
where
    F: FnMut(&ProgressEvent<'_>),
{
    let results = compress_uploads(uploads, format, runner, limits, on_progress).await?;

    let response = BatchResponse::from_results(&results);
    info!(
        "Batch response: {}/{} succeeded, {:.2}% saved overall",
        response.success, response.total, response.total_compression_ratio
    );
    Ok(response)
}

/// Same limits as `compress_batch`, but keeps the raw results (encoded bytes included)
pub async fn compress_uploads<F>(
    uploads: Vec<UploadedFile>,
    format: OutputFormat,
    runner: &mut BatchRunner,
    limits: &Limits,
    mut on_progress: F,
) -> Result<Vec<CompressionResult>, BoundaryError>
where
    F: FnMut(&ProgressEvent<'_>),
{
    let max = limits.max_files_per_batch.min(MAX_FILES_PER_BATCH);
    if uploads.len() > max {
        return Err(BoundaryError::TooManyFiles {
            count: uploads.len(),
            max,
        });
    }

    let total = uploads.len();
    let mut slots: Vec<Option<CompressionResult>> = (0..total).map(|_| None).collect();
    let mut positions = Vec::with_capacity(total);
    let mut requests = Vec::with_capacity(total);
    let mut completed = 0;

    for (index, upload) in uploads.into_iter().enumerate() {
        match reject_if_oversized(&upload, limits) {
            Some(rejected) => {
                completed += 1;
                on_progress(&ProgressEvent {
                    index,
                    total,
                    completed,
                    result: &rejected,
                });
                slots[index] = Some(rejected);
            }
            None => {
                positions.push(index);
                requests.push(CompressionRequest::new(upload.filename, upload.data, format));
            }
        }
    }

    let rejected = completed;
    let results = runner
        .run(requests, |event| {
            on_progress(&ProgressEvent {
                index: positions[event.index],
                total,
                completed: rejected + event.completed,
                result: event.result,
            })
        })
        .await;

    for (position, result) in positions.iter().zip(results) {
        slots[*position] = Some(result);
    }
    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{ModernEncoder, PaletteEncoder, PhotoEncoder};
    use crate::quantize::{IndexedImage, QuantizeError, Quantizer, QuantizerChain};
    use crate::test_support::{gradient_rgb, jpeg_bytes, png_bytes};
    use image::{DynamicImage, RgbaImage};

    fn upload(name: &str) -> UploadedFile {
        UploadedFile::new(name, png_bytes(&DynamicImage::ImageRgb8(gradient_rgb(12, 12))))
    }

    fn runner() -> BatchRunner {
        BatchRunner::from_config(&Config::default())
    }

    #[tokio::test]
    async fn test_twenty_one_files_rejected() {
        let uploads: Vec<_> = (0..21).map(|i| upload(&format!("{}.png", i))).collect();
        let mut calls = 0;

        let err = compress_batch(uploads, OutputFormat::Original, &mut runner(), &Limits::default(), |_| calls += 1)
            .await
            .unwrap_err();

        assert_eq!(err, BoundaryError::TooManyFiles { count: 21, max: 20 });
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_twenty_files_accepted() {
        let uploads: Vec<_> = (0..20).map(|i| upload(&format!("{}.png", i))).collect();
        let response = compress_batch(uploads, OutputFormat::Original, &mut runner(), &Limits::default(), |_| {})
            .await
            .unwrap();

        assert_eq!(response.total, 20);
        assert_eq!(response.success, 20);
        assert_eq!(response.failed, 0);
    }

    #[tokio::test]
    async fn test_oversized_file_keeps_its_slot() {
        let limits = Limits {
            max_files_per_batch: 20,
            max_file_size: 200,
        };
        let small = UploadedFile::new("tiny.png", png_bytes(&DynamicImage::ImageRgb8(gradient_rgb(1, 1))));
        assert!(small.data.len() <= 200);
        let big = UploadedFile::new("big.jpg", vec![0xFF; 201]);

        let mut indices = Vec::new();
        let response = compress_batch(
            vec![big, small],
            OutputFormat::Original,
            &mut runner(),
            &limits,
            |event| indices.push((event.index, event.completed)),
        )
        .await
        .unwrap();

        assert_eq!(response.results[0].filename, "big.jpg");
        assert_eq!(response.results[0].error_kind, Some(ErrorKind::Rejected));
        assert_eq!(response.results[0].original_size, 201);
        assert!(response.results[0].data.is_empty());
        assert!(response.results[1].success);
        assert_eq!(indices, vec![(0, 1), (1, 2)]);
    }

    #[tokio::test]
    async fn test_totals_count_successes_only() {
        let good = UploadedFile::new("photo.jpg", jpeg_bytes(&gradient_rgb(32, 32)));
        let good_size = good.data.len() as u64;
        let bad = UploadedFile::new("bad.png", b"garbage".to_vec());

        let response = compress_batch(vec![good, bad], OutputFormat::Modern, &mut runner(), &Limits::default(), |_| {})
            .await
            .unwrap();

        assert_eq!((response.total, response.success, response.failed), (2, 1, 1));
        assert_eq!(response.total_original_size, good_size);
        assert_eq!(response.total_compressed_size, response.results[0].compressed_size as u64);
        assert_eq!(
            response.total_compression_ratio,
            compression_ratio(good_size as usize, response.total_compressed_size as usize)
        );
    }

    #[tokio::test]
    async fn test_uploads_keep_encoded_bytes() {
        let results = compress_uploads(
            vec![upload("a.png")],
            OutputFormat::PaletteRaster,
            &mut runner(),
            &Limits::default(),
            |_| {},
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 1);
        assert!(!results[0].encoded_data.is_empty());
        assert_eq!(results[0].encoded_data.len(), results[0].compressed_size);
    }

    #[test]
    fn test_single_item_data_uri() {
        let compressor = Compressor::new(&Config::default());
        let item = compress_single(upload("a.png"), OutputFormat::Modern, &compressor, &Limits::default());

        assert!(item.success);
        assert_eq!(item.format, "webp");
        assert!(item.data.starts_with("data:image/webp;base64,"));

        let encoded = item.data.trim_start_matches("data:image/webp;base64,");
        let decoded = STANDARD.decode(encoded).unwrap();
        assert_eq!(decoded.len(), item.compressed_size);
    }

    struct PanickingQuantizer;

    impl Quantizer for PanickingQuantizer {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn quantize(&self, _image: &RgbaImage, _max_colors: u16) -> Result<IndexedImage, QuantizeError> {
            panic!("quantizer exploded");
        }
    }

    #[test]
    fn test_single_item_contains_backend_panic() {
        let chain = QuantizerChain::new(None, Box::new(PanickingQuantizer));
        let compressor = Compressor::with_encoders(PaletteEncoder::new(chain, None), PhotoEncoder::new(None), ModernEncoder);

        let item = compress_single(upload("a.png"), OutputFormat::PaletteRaster, &compressor, &Limits::default());
        assert!(!item.success);
        assert_eq!(item.error_kind, Some(ErrorKind::Encode));
        assert!(item.data.is_empty());
    }

    #[test]
    fn test_failed_item_has_empty_data() {
        let compressor = Compressor::new(&Config::default());
        let item = compress_single(
            UploadedFile::new("x.png", b"nope".to_vec()),
            OutputFormat::Original,
            &compressor,
            &Limits::default(),
        );
        assert!(!item.success);
        assert!(item.data.is_empty());
        assert!(item.format.is_empty());
    }

    #[test]
    fn test_empty_batch_totals() {
        let response = BatchResponse::from_results(&[]);
        assert_eq!(response.total, 0);
        assert_eq!(response.total_compression_ratio, 0.0);
    }
}
