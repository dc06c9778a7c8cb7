//! Observer trait for summarize-action events.
//!
//! Inject an [`Arc<dyn PipelineObserver>`] via
//! [`crate::config::SummaryConfigBuilder::observer`] to follow a summarize
//! action as it moves through its stages.
//!
//! # Example
//!
//! ```rust
//! use edgequake_paper_summary::{PipelineObserver, Stage, SummaryConfig};
//! use std::sync::Arc;
//!
//! struct PrintStages;
//!
//! impl PipelineObserver for PrintStages {
//!     fn on_stage(&self, stage: Stage) {
//!         eprintln!("→ {stage}");
//!     }
//! }
//!
//! let config = SummaryConfig::builder()
//!     .observer(Arc::new(PrintStages) as Arc<dyn PipelineObserver>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::{PipelineError, Stage};
use crate::summarize::SummaryResult;
use std::sync::Arc;

/// Receives events from the summarization pipeline.
///
/// All methods default to no-ops so implementations only override what they
/// care about. Calls for one session never overlap, but observers may be
/// shared between sessions, hence `Send + Sync`.
pub trait PipelineObserver: Send + Sync {
    /// Entered `stage`.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// The document text was cut to the character budget.
    ///
    /// # Arguments
    /// * `original_len`: length of the extracted text, in characters
    /// * `max_len`     : configured budget
    fn on_truncated(&self, original_len: usize, max_len: usize) {
        let _ = (original_len, max_len);
    }

    /// A piece of streamed output arrived.
    fn on_chunk(&self, chunk: &str) {
        let _ = chunk;
    }

    /// The action ended in the failed state.
    fn on_failed(&self, error: &PipelineError) {
        let _ = error;
    }

    /// The action finished and its result is stored in the session.
    fn on_complete(&self, result: &SummaryResult) {
        let _ = result;
    }
}

/// Observer that ignores everything. Used when none is configured.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::SummaryConfig`].
pub type SharedObserver = Arc<dyn PipelineObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SummaryError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        stages: Mutex<Vec<Stage>>,
        truncations: Mutex<Vec<(usize, usize)>>,
        failures: Mutex<Vec<Stage>>,
    }

    impl PipelineObserver for Recording {
        fn on_stage(&self, stage: Stage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_truncated(&self, original_len: usize, max_len: usize) {
            self.truncations.lock().unwrap().push((original_len, max_len));
        }

        fn on_failed(&self, error: &PipelineError) {
            self.failures.lock().unwrap().push(error.stage);
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let obs: SharedObserver = Arc::new(NoopObserver);
        obs.on_stage(Stage::Ingesting);
        obs.on_truncated(10, 5);
        obs.on_chunk("x");
        obs.on_failed(&PipelineError::new(
            Stage::Requesting,
            SummaryError::Internal("x".into()),
        ));
    }

    #[test]
    fn overridden_methods_receive_events() {
        let rec = Recording::default();
        rec.on_stage(Stage::Ingesting);
        rec.on_stage(Stage::Bounding);
        rec.on_truncated(120_000, 100_000);
        rec.on_chunk("ignored by default");
        rec.on_failed(&PipelineError::new(
            Stage::Requesting,
            SummaryError::BackendOverload {
                provider: "anthropic".into(),
            },
        ));

        assert_eq!(
            *rec.stages.lock().unwrap(),
            vec![Stage::Ingesting, Stage::Bounding]
        );
        assert_eq!(*rec.truncations.lock().unwrap(), vec![(120_000, 100_000)]);
        assert_eq!(*rec.failures.lock().unwrap(), vec![Stage::Requesting]);
    }
}
