//! # Post-Optimization Module
//!
//! Ricompressione lossless dei byte già codificati: i pixel restano identici,
//! cambia solo la rappresentazione.
//!
//! ## Responsabilità:
//! - Definisce il trait `PostOptimizer` (un backend per formato)
//! - `apply_post_optimizer()` applica il contratto "mai peggio":
//!   backend assente → passthrough, errore → passthrough, output non più
//!   piccolo → si tiene l'input
//! - Distingue nel risultato un fallimento da un rifiuto (`Failed` vs `Declined`)
//!
//! ## Backend:
//! - `PngOptimizer`: oxipng (feature `png-optimizer`)
//! - `JpegMarkerStripper`: rimozione segmenti APPn/COM con `img-parts`

pub mod jpeg;
pub mod png;

pub use self::jpeg::JpegMarkerStripper;
pub use self::png::PngOptimizer;

use tracing::{debug, warn};

#[derive(thiserror::Error, Debug)]
pub enum PostOptimizeError {
    #[error("{0} is not available in this build")]
    Unavailable(&'static str),

    #[error("{backend} failed: {message}")]
    Failed {
        backend: &'static str,
        message: String,
    },
}

/// Lossless byte-level re-compression of an already encoded image.
///
/// Implementations must preserve the decoded pixels exactly and hold no
/// per-call state.
pub trait PostOptimizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn optimize(&self, bytes: &[u8]) -> Result<Vec<u8>, PostOptimizeError>;
}

/// What happened to the encoder output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOptimizeOutcome {
    /// Smaller output kept
    Applied { saved: usize },
    /// Backend ran but did not beat the input
    Declined,
    /// Backend errored; input kept
    Failed { reason: String },
    /// Backend not compiled in
    Unavailable,
}

/// Run `optimizer` on `bytes`; the returned buffer is never larger than the input.
pub fn apply_post_optimizer(optimizer: &dyn PostOptimizer, bytes: Vec<u8>) -> (Vec<u8>, PostOptimizeOutcome) {
    match optimizer.optimize(&bytes) {
        Ok(optimized) if !optimized.is_empty() && optimized.len() < bytes.len() => {
            let saved = bytes.len() - optimized.len();
            debug!("{} saved {} bytes ({} -> {})", optimizer.name(), saved, bytes.len(), optimized.len());
            (optimized, PostOptimizeOutcome::Applied { saved })
        }
        Ok(optimized) => {
            debug!(
                "{} output not smaller ({} >= {}), keeping encoder output",
                optimizer.name(),
                optimized.len(),
                bytes.len()
            );
            (bytes, PostOptimizeOutcome::Declined)
        }
        Err(PostOptimizeError::Unavailable(name)) => {
            warn!("Post-optimizer {} unavailable, keeping encoder output", name);
            (bytes, PostOptimizeOutcome::Unavailable)
        }
        Err(e) => {
            warn!("Post-optimization failed, keeping encoder output: {}", e);
            (bytes, PostOptimizeOutcome::Failed { reason: e.to_string() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Returns a canned answer regardless of input
    struct FixedOptimizer(Result<Vec<u8>, &'static str>);

    impl PostOptimizer for FixedOptimizer {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn optimize(&self, _bytes: &[u8]) -> Result<Vec<u8>, PostOptimizeError> {
            match &self.0 {
                Ok(out) => Ok(out.clone()),
                Err("unavailable") => Err(PostOptimizeError::Unavailable("fixed")),
                Err(msg) => Err(PostOptimizeError::Failed {
                    backend: "fixed",
                    message: msg.to_string(),
                }),
            }
        }
    }

    #[test]
    fn test_smaller_output_is_applied() {
        let (out, outcome) = apply_post_optimizer(&FixedOptimizer(Ok(vec![1, 2])), vec![0; 10]);
        assert_eq!(out, vec![1, 2]);
        assert_eq!(outcome, PostOptimizeOutcome::Applied { saved: 8 });
    }

    #[test]
    fn test_larger_output_is_declined() {
        let (out, outcome) = apply_post_optimizer(&FixedOptimizer(Ok(vec![9; 20])), vec![0; 10]);
        assert_eq!(out, vec![0; 10]);
        assert_eq!(outcome, PostOptimizeOutcome::Declined);
    }

    #[test]
    fn test_failure_is_distinct_from_decline() {
        let (out, outcome) = apply_post_optimizer(&FixedOptimizer(Err("boom")), vec![7; 5]);
        assert_eq!(out, vec![7; 5]);
        assert!(matches!(outcome, PostOptimizeOutcome::Failed { reason } if reason.contains("boom")));

        let (_, outcome) = apply_post_optimizer(&FixedOptimizer(Err("unavailable")), vec![7; 5]);
        assert_eq!(outcome, PostOptimizeOutcome::Unavailable);
    }

    proptest! {
        #[test]
        fn prop_never_worse(input in proptest::collection::vec(any::<u8>(), 0..256),
                            produced in proptest::collection::vec(any::<u8>(), 0..256)) {
            let (out, outcome) = apply_post_optimizer(&FixedOptimizer(Ok(produced.clone())), input.clone());
            prop_assert!(out.len() <= input.len());
            match outcome {
                PostOptimizeOutcome::Applied { saved } => {
                    prop_assert_eq!(saved, input.len() - out.len());
                    prop_assert_eq!(out, produced);
                }
                _ => prop_assert_eq!(out, input),
            }
        }
    }
}
