//! Coarse progress reporting and cooperative cancellation.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

/// A progress snapshot emitted at phase boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Completion percentage (0..=100).
    pub percent: u8,
    /// Description of the current step.
    pub step: String,
}

impl Progress {
    /// Creates a progress snapshot.
    pub fn new(percent: u8, step: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            step: step.into(),
        }
    }
}

/// Receiver of progress snapshots.
pub trait ProgressSink: Send + Sync {
    /// Called at each phase boundary.
    fn report(&self, progress: Progress);
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _progress: Progress) {}
}

impl ProgressSink for Sender<Progress> {
    fn report(&self, progress: Progress) {
        // A dropped receiver just means nobody is polling any more.
        let _ = self.send(progress);
    }
}

/// Shared cancellation flag, checked between demand-unit placements.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_cancel_flag_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!flag.is_cancelled());
        clone.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_channel_sink() {
        let (tx, rx) = mpsc::channel();
        tx.report(Progress::new(150, "done"));
        drop(tx);
        let got: Vec<_> = rx.iter().collect();
        assert_eq!(got, vec![Progress::new(100, "done")]);
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (tx, rx) = mpsc::channel::<Progress>();
        drop(rx);
        tx.report(Progress::new(10, "validated"));
    }
}
