//! Progress-callback trait for round, attempt and publish events.
//!
//! Inject an [`Arc<dyn SummaryProgressCallback>`] via
//! [`crate::config::SummaryConfigBuilder::progress_callback`] to receive
//! events as the orchestrator walks through its rounds and the publisher
//! submits block chunks.
//!
//! The CLI forwards these to an `indicatif` spinner; a web front-end could
//! forward them to a channel. The library knows nothing about either.
//!
//! # Example
//!
//! ```rust
//! use paper2notion::{Round, SummaryConfig, SummaryProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FailureCounter(AtomicUsize);
//!
//! impl SummaryProgressCallback for FailureCounter {
//!     fn on_attempt_failed(&self, round: &Round, attempt: u32, reason: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{round} attempt {attempt} failed: {reason}");
//!     }
//! }
//!
//! let config = SummaryConfig::builder()
//!     .progress_callback(Arc::new(FailureCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::Round;
use std::sync::Arc;

/// Called by the pipeline as it progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Calls arrive sequentially from the task driving the
/// run, but implementations must still be `Send + Sync` because the config
/// holding them is shared across tasks.
pub trait SummaryProgressCallback: Send + Sync {
    /// Called before every oracle call.
    ///
    /// # Arguments
    /// * `round`: which round the call belongs to
    /// * `attempt`: 1-indexed attempt within the round's budget
    /// * `max_attempts`: the round's budget
    fn on_attempt_start(&self, round: &Round, attempt: u32, max_attempts: u32) {
        let _ = (round, attempt, max_attempts);
    }

    /// Called when an attempt failed (oracle error or section missing from the reply).
    fn on_attempt_failed(&self, round: &Round, attempt: u32, reason: &str) {
        let _ = (round, attempt, reason);
    }

    /// Called when a section is merged into the result for the first time.
    fn on_section_resolved(&self, name: &str) {
        let _ = name;
    }

    /// Called once after the round protocol terminates.
    ///
    /// # Arguments
    /// * `resolved`: sections in the result, title included
    /// * `success`: whether every required section resolved
    fn on_generation_complete(&self, resolved: usize, success: bool) {
        let _ = (resolved, success);
    }

    /// Called after each block chunk is accepted by the document service.
    ///
    /// # Arguments
    /// * `chunk`: 1-indexed chunk number (1 is the page-create call)
    /// * `chunks`: total chunks for this page
    fn on_chunk_submitted(&self, chunk: usize, chunks: usize) {
        let _ = (chunk, chunks);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SummaryProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SummaryConfig`].
pub type ProgressCallback = Arc<dyn SummaryProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        failures: AtomicUsize,
        resolved: Mutex<Vec<String>>,
        chunks: AtomicUsize,
    }

    impl SummaryProgressCallback for TrackingCallback {
        fn on_attempt_start(&self, _round: &Round, _attempt: u32, _max: u32) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_attempt_failed(&self, _round: &Round, _attempt: u32, _reason: &str) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }

        fn on_section_resolved(&self, name: &str) {
            self.resolved.lock().unwrap().push(name.to_string());
        }

        fn on_chunk_submitted(&self, _chunk: usize, _chunks: usize) {
            self.chunks.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_attempt_start(&Round::Title, 1, 5);
        cb.on_attempt_failed(&Round::Bulk, 1, "timeout");
        cb.on_section_resolved("Name");
        cb.on_generation_complete(3, true);
        cb.on_chunk_submitted(1, 2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_attempt_start(&Round::Title, 1, 5);
        tracker.on_attempt_failed(&Round::Title, 1, "no heading");
        tracker.on_attempt_start(&Round::Title, 2, 5);
        tracker.on_section_resolved("Name");
        tracker.on_attempt_start(&Round::Section("Keywords".into()), 1, 3);
        tracker.on_section_resolved("Keywords");
        tracker.on_chunk_submitted(1, 1);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.failures.load(Ordering::SeqCst), 1);
        assert_eq!(*tracker.resolved.lock().unwrap(), vec!["Name", "Keywords"]);
        assert_eq!(tracker.chunks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_attempt_start(&Round::Bulk, 1, 1);
        cb.on_generation_complete(0, false);
    }
}
