use std::sync::Arc;

use crossbeam_channel::{Receiver, TrySendError};
use serde::Serialize;

/// Immutable snapshot of an ingestion in flight.
///
/// A fresh snapshot is emitted before the first item and after every
/// attempted item; totals are frozen when the resolved item list is
/// finalized and never recomputed mid-execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub done_files: u64,
    pub done_bytes: u64,
    pub total_files: u64,
    pub total_bytes: u64,
    pub skipped_duplicates: u64,
    pub failed_count: u64,
}

impl Progress {
    /// Completed fraction in `[0, 1]`, by bytes. Empty batches read as done.
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.done_bytes as f64 / self.total_bytes as f64).min(1.0)
    }

    pub fn remaining_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.done_bytes)
    }
}

/// Callback invoked with each progress snapshot.
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Cooperative cancellation flag, evaluated once per item boundary.
pub type CancelPredicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Bridge the worker's progress callback to a consumer-driven channel.
///
/// The worker and its consumer run in different execution contexts; the
/// bounded channel lets a UI drain snapshots on its own cadence. When the
/// consumer lags behind the bound, newer snapshots are dropped rather than
/// blocking the upload loop (the consumer only ever cares about the latest
/// state).
pub fn progress_channel(capacity: usize) -> (ProgressCallback, Receiver<Progress>) {
    let (sender, receiver) = crossbeam_channel::bounded(capacity);
    let callback: ProgressCallback = Arc::new(move |snapshot: Progress| {
        match sender.try_send(snapshot) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                log::debug!("Progress consumer is lagging; dropping snapshot");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    });
    (callback, receiver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_handles_empty_and_partial_batches() {
        let empty = Progress::default();
        assert_eq!(empty.fraction(), 1.0);

        let partial = Progress {
            done_bytes: 25,
            total_bytes: 100,
            ..Default::default()
        };
        assert_eq!(partial.fraction(), 0.25);
        assert_eq!(partial.remaining_bytes(), 75);
    }

    #[test]
    fn channel_delivers_snapshots_in_order() {
        let (callback, receiver) = progress_channel(8);

        for done_files in 0..3 {
            callback(Progress {
                done_files,
                total_files: 3,
                ..Default::default()
            });
        }

        let seen: Vec<u64> = receiver.try_iter().map(|p| p.done_files).collect();
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn full_channel_drops_instead_of_blocking() {
        let (callback, receiver) = progress_channel(1);

        callback(Progress::default());
        callback(Progress {
            done_files: 1,
            ..Default::default()
        });

        assert_eq!(receiver.try_iter().count(), 1);
    }

    #[test]
    fn disconnected_receiver_is_not_an_error() {
        let (callback, receiver) = progress_channel(1);
        drop(receiver);
        callback(Progress::default());
    }
}
