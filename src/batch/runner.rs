//! # Batch Runner
//!
//! Guida un batch di `CompressionRequest` fino al completamento.
//!
//! ## Garanzie:
//! - **Lunghezza e ordine**: un risultato per richiesta, nello stesso ordine
//! - **Isolamento**: un file fallito (anche per panic dell'encoder) non ferma gli altri
//! - **Progresso**: un `ProgressEvent` sincrono dopo ogni file completato
//!
//! ## Concorrenza:
//! - `workers == 1` (default): strettamente sequenziale
//! - `workers > 1`: al massimo `workers` file in elaborazione contemporaneamente;
//!   il completamento può avvenire fuori ordine ma i risultati vengono riordinati
//! - Il lavoro CPU-bound gira su `spawn_blocking`
//!
//! ## Cancellazione:
//! Tramite canale `broadcast`. Le codifiche già avviate terminano; i file non
//! ancora avviati vengono riportati come fallimenti `Cancelled`.

use super::ProgressEvent;
use crate::compressor::Compressor;
use crate::config::Config;
use crate::error::ErrorKind;
use crate::result::{CompressionRequest, CompressionResult};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

pub struct BatchRunner {
    compressor: Arc<Compressor>,
    /// Maximum items in flight
    workers: usize,
    /// Cancellation receiver for stopping the batch
    stop_receiver: Option<broadcast::Receiver<()>>,
    /// Latched once a stop signal has been seen
    stopped: bool,
}

impl BatchRunner {
    pub fn new(compressor: Arc<Compressor>, workers: usize) -> Self {
        Self {
            compressor,
            workers: workers.max(1),
            stop_receiver: None,
            stopped: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(Compressor::new(config)), config.workers)
    }

    /// Attach a cancellation receiver.
    ///
    /// ```rust
    /// let (stop_sender, stop_receiver) = BatchRunner::create_cancellation_channel(1);
    /// let mut runner = BatchRunner::from_config(&config).with_cancellation(stop_receiver);
    ///
    /// // Per fermare il batch:
    /// stop_sender.send(()).ok();
    /// ```
    pub fn with_cancellation(mut self, stop_receiver: broadcast::Receiver<()>) -> Self {
        self.stop_receiver = Some(stop_receiver);
        self
    }

    pub fn create_cancellation_channel(capacity: usize) -> (broadcast::Sender<()>, broadcast::Receiver<()>) {
        broadcast::channel(capacity)
    }

    pub fn compressor(&self) -> &Arc<Compressor> {
        &self.compressor
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Checks if a stop signal has been received
    fn should_stop(&mut self) -> bool {
        if self.stopped {
            return true;
        }
        if let Some(ref mut receiver) = self.stop_receiver {
            self.stopped = match receiver.try_recv() {
                Ok(_) => true,
                Err(broadcast::error::TryRecvError::Empty) => false,
                // Segnale inviato ma perso: vale come stop
                Err(broadcast::error::TryRecvError::Lagged(_)) => true,
                // Sender droppato: si continua
                Err(broadcast::error::TryRecvError::Closed) => false,
            };
        }
        self.stopped
    }

    /// Process every request; the output has one result per request, in order.
    pub async fn run<F>(&mut self, requests: Vec<CompressionRequest>, mut on_progress: F) -> Vec<CompressionResult>
    where
        F: FnMut(&ProgressEvent<'_>),
    {
        let total = requests.len();
        info!("Starting batch of {} image(s) with {} worker(s)", total, self.workers);

        let mut slots: Vec<Option<CompressionResult>> = (0..total).map(|_| None).collect();
        let compressor = Arc::clone(&self.compressor);
        let workers = self.workers;

        // La closure gira solo quando c'è un posto libero: il controllo di stop
        // avviene quindi all'avvio effettivo di ogni elemento
        let mut pending = stream::iter(requests.into_iter().enumerate())
            .map(|(index, request)| {
                let cancelled = self.should_stop();
                let compressor = Arc::clone(&compressor);
                async move {
                    if cancelled {
                        debug!("Skipping {} (batch cancelled)", request.filename);
                        let result = CompressionResult::failure(
                            request.filename,
                            request.data.len(),
                            ErrorKind::Cancelled,
                            "batch cancelled before this item started",
                        );
                        return (index, result);
                    }
                    (index, compress_isolated(compressor, request).await)
                }
            })
            .buffer_unordered(workers);

        let mut completed = 0;
        while let Some((index, result)) = pending.next().await {
            completed += 1;
            on_progress(&ProgressEvent {
                index,
                total,
                completed,
                result: &result,
            });
            slots[index] = Some(result);
        }
        drop(pending);

        let results: Vec<CompressionResult> = slots.into_iter().flatten().collect();
        let succeeded = results.iter().filter(|r| r.success).count();
        info!(
            "Batch finished: {} succeeded, {} failed",
            succeeded,
            results.len() - succeeded
        );
        results
    }
}

/// Run one request on the blocking pool; a panic becomes an `Encode` failure
async fn compress_isolated(compressor: Arc<Compressor>, request: CompressionRequest) -> CompressionResult {
    let filename = request.filename.clone();
    let original_size = request.data.len();

    match tokio::task::spawn_blocking(move || compressor.compress(&request)).await {
        Ok(result) => result,
        Err(e) => {
            error!("{}: compression task failed: {}", filename, e);
            CompressionResult::failure(
                filename,
                original_size,
                ErrorKind::Encode,
                format!("compression task failed: {}", e),
            )
        }
    }
}
