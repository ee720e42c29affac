//! # Progress Tracking Module
//!
//! Collega i `ProgressEvent` del runner all'output della CLI: progress bar
//! tradizionale oppure eventi JSON-lines, più le statistiche del batch.

use super::ProgressEvent;
use crate::json_output::JsonMessage;
use crate::progress::{BatchStats, ProgressManager};
use std::time::Instant;

pub struct ProgressTracker {
    pub total_files: usize,
    json_output: bool,
    stats: BatchStats,
    progress_manager: ProgressManager,
    started: Instant,
}

impl ProgressTracker {
    pub fn new(total_files: usize, json_output: bool) -> Self {
        // In modalità JSON stdout deve contenere solo JSON
        let progress_manager = if json_output {
            ProgressManager::hidden(total_files as u64)
        } else {
            ProgressManager::new(total_files as u64)
        };
        Self::with_manager(total_files, json_output, progress_manager)
    }

    pub fn with_manager(total_files: usize, json_output: bool, progress_manager: ProgressManager) -> Self {
        Self {
            total_files,
            json_output,
            stats: BatchStats::new(),
            progress_manager,
            started: Instant::now(),
        }
    }

    /// Record one completed item and report it
    pub fn handle_event(&mut self, event: &ProgressEvent<'_>) {
        let result = event.result;
        self.stats.record(result);

        if self.json_output {
            JsonMessage::file_complete(event.index, result).emit();
            JsonMessage::progress(event.completed, event.total, &self.stats).emit();
        }

        let message = if result.success {
            format!("[OK] {}: {:.2}% saved", result.filename, result.compression_ratio)
        } else {
            format!(
                "[ERROR] {}: {}",
                result.filename,
                result.error.as_deref().unwrap_or("failed")
            )
        };
        self.progress_manager.update(&message);
    }

    /// Close the bar (or emit `complete`) and return the final statistics
    pub fn finish(&self) -> &BatchStats {
        let elapsed = self.started.elapsed().as_secs_f64();
        if self.json_output {
            JsonMessage::complete(&self.stats, elapsed).emit();
        }
        self.progress_manager.finish(&self.stats.format_summary());
        &self.stats
    }

    pub fn stats(&self) -> &BatchStats {
        &self.stats
    }
}
