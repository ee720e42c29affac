//! # Batch Module
//!
//! Esecuzione di un batch di richieste indipendenti.
//!
//! ## Componenti:
//! - `BatchRunner`: esegue le richieste (sequenziale o con parallelismo limitato),
//!   preserva ordine e lunghezza, isola i fallimenti, supporta la cancellazione
//! - `ProgressEvent`: evento sincrono emesso dopo ogni elemento completato
//! - `ProgressTracker`: collega gli eventi a progress bar / output JSON (CLI)

pub mod progress_tracker;
pub mod runner;

pub use progress_tracker::ProgressTracker;
pub use runner::BatchRunner;

use crate::result::CompressionResult;

/// Emitted once per item, right after it completes
#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent<'a> {
    /// Position of the item in the request list
    pub index: usize,
    pub total: usize,
    /// Items finished so far, this one included
    pub completed: usize,
    pub result: &'a CompressionResult,
}

impl ProgressEvent<'_> {
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}
