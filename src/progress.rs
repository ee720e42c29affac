//! # Progress Tracking and Statistics Module
//!
//! Progress bar e statistiche aggregate di un batch di compressione.
//!
//! ## Responsabilità:
//! - Progress bar visuale con `indicatif` per feedback real-time
//! - Tracking statistiche (file compressi, falliti, cancellati, byte risparmiati)
//! - Percentuale di riduzione complessiva con la stessa regola dei singoli file
//! - Report finale
//!
//! ## Componenti principali:
//! - `ProgressManager`: Gestisce la progress bar principale
//! - `BatchStats`: Statistiche cumulative del batch
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:03] [========================================] 20/20 (100%) [OK] logo.png: 71.40% saved
//! ```

use crate::error::ErrorKind;
use crate::file_manager::FileManager;
use crate::result::{compression_ratio, CompressionResult};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Manages the terminal progress bar
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress manager that draws nothing (JSON mode, tests)
    pub fn hidden(total_files: u64) -> Self {
        Self {
            bar: ProgressBar::with_draw_target(Some(total_files), ProgressDrawTarget::hidden()),
        }
    }

    /// Advance by one with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Create a spinner for indeterminate work
    pub fn spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();

        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }

        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        spinner
    }
}

/// Aggregate statistics of one batch
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchStats {
    pub files_processed: usize,
    pub files_compressed: usize,
    pub files_failed: usize,
    pub files_cancelled: usize,
    /// Successful items only
    pub total_original_size: u64,
    /// Successful items only
    pub total_compressed_size: u64,
}

impl BatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &CompressionResult) {
        self.files_processed += 1;
        if result.success {
            self.files_compressed += 1;
            self.total_original_size += result.original_size as u64;
            self.total_compressed_size += result.compressed_size as u64;
        } else if result.error_kind == Some(ErrorKind::Cancelled) {
            self.files_cancelled += 1;
        } else {
            self.files_failed += 1;
        }
    }

    /// Bytes saved over successful items; growth counts as zero
    pub fn bytes_saved(&self) -> u64 {
        self.total_original_size.saturating_sub(self.total_compressed_size)
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        compression_ratio(self.total_original_size as usize, self.total_compressed_size as usize)
    }

    pub fn format_summary(&self) -> String {
        let mut summary = format!(
            "Processed: {} files | Compressed: {} | Failed: {} | {} -> {} ({:.2}% saved)",
            self.files_processed,
            self.files_compressed,
            self.files_failed,
            FileManager::format_size(self.total_original_size),
            FileManager::format_size(self.total_compressed_size),
            self.overall_reduction_percent()
        );
        if self.files_cancelled > 0 {
            summary.push_str(&format!(" | Cancelled: {}", self.files_cancelled));
        }
        summary
    }
}
