//! Sliding-window sample reservoirs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tidemark_core::SkipList;
use tidemark_crossbeam::EpochGuard;

use crate::clock::{Clock, SystemClock};
use crate::snapshot::{Snapshot, WindowSnapshot};

/// One recorded measurement.
///
/// Samples order by `(elapsed_nanos, seq)`. The sequence number comes
/// from a per-reservoir counter, so two samples never compare equal and
/// the de-duplicating list keeps every one of them; the measured value
/// takes no part in the ordering.
#[derive(Debug, Clone, Copy)]
struct Sample {
    at_nanos: u64,
    seq: u64,
    value: f64,
}

impl PartialEq for Sample {
    fn eq(&self, other: &Self) -> bool {
        self.at_nanos == other.at_nanos && self.seq == other.seq
    }
}

impl Eq for Sample {}

impl PartialOrd for Sample {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Sample {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.at_nanos, self.seq).cmp(&(other.at_nanos, other.seq))
    }
}

/// A reservoir holding every sample recorded within the trailing `window`.
///
/// Samples live in the lock-free skip list ordered by record time, so
/// recording threads never serialize against each other or against
/// snapshot readers. Expired samples are pruned from the front of the
/// list by whichever caller notices them.
pub struct SlidingWindow<C: Clock = SystemClock> {
    window: Duration,
    clock: C,
    seq: AtomicU64,
    samples: SkipList<Sample, EpochGuard, 16>,
}

impl SlidingWindow<SystemClock> {
    pub fn new(window: Duration) -> Self {
        Self::with_clock(window, SystemClock::default())
    }
}

impl<C: Clock> SlidingWindow<C> {
    pub fn with_clock(window: Duration, clock: C) -> Self {
        SlidingWindow {
            window,
            clock,
            seq: AtomicU64::new(0),
            samples: SkipList::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a measurement at the current time.
    pub fn record(&self, value: f64) {
        let at_nanos = self.clock.elapsed().as_nanos() as u64;
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);

        self.samples.insert(Sample {
            at_nanos,
            seq,
            value,
        });

        self.prune(at_nanos);
    }

    /// Number of samples currently inside the window.
    pub fn len(&self) -> usize {
        self.snapshot().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The samples currently inside the window, with their statistics.
    pub fn snapshot(&self) -> WindowSnapshot {
        let now_nanos = self.clock.elapsed().as_nanos() as u64;
        self.prune(now_nanos);

        let cutoff = self.cutoff(now_nanos);
        let values = self
            .samples
            .iter()
            .filter(|sample| sample.at_nanos >= cutoff)
            .map(|sample| sample.value)
            .collect();

        WindowSnapshot::from_values(values)
    }

    pub fn aggregate_snapshot(&self) -> Snapshot {
        Snapshot::Window(self.snapshot())
    }

    fn cutoff(&self, now_nanos: u64) -> u64 {
        now_nanos.saturating_sub(self.window.as_nanos() as u64)
    }

    /// Erase expired samples from the front of the list. A lost erase race
    /// just means another caller pruned the same sample first.
    fn prune(&self, now_nanos: u64) {
        let cutoff = self.cutoff(now_nanos);

        loop {
            let cursor = self.samples.begin();
            match cursor.value() {
                Some(sample) if sample.at_nanos < cutoff => {
                    self.samples.erase(&cursor);
                }
                _ => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use crate::clock::ManualClock;

    use super::SlidingWindow;

    fn manual_window(secs: u64) -> (SlidingWindow<Arc<ManualClock>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let window = SlidingWindow::with_clock(Duration::from_secs(secs), Arc::clone(&clock));
        (window, clock)
    }

    #[test]
    fn test_records_and_summarizes() {
        let (window, _clock) = manual_window(60);

        window.record(3.0);
        window.record(1.0);
        window.record(2.0);

        let snapshot = window.snapshot();
        assert_eq!(snapshot.count(), 3);
        assert_eq!(snapshot.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(snapshot.mean(), Some(2.0));
    }

    #[test]
    fn test_equal_values_are_all_kept() {
        let (window, _clock) = manual_window(60);

        for _ in 0..5 {
            window.record(7.5);
        }

        assert_eq!(window.snapshot().count(), 5);
    }

    #[test]
    fn test_old_samples_expire() {
        let (window, clock) = manual_window(10);

        window.record(1.0);
        clock.advance(Duration::from_secs(6));
        window.record(2.0);
        clock.advance(Duration::from_secs(6));
        window.record(3.0);

        // 1.0 is 12s old and out; 2.0 (6s) and 3.0 (now) remain.
        let snapshot = window.snapshot();
        assert_eq!(snapshot.values(), &[2.0, 3.0]);
    }

    #[test]
    fn test_expiry_without_new_records() {
        let (window, clock) = manual_window(10);

        window.record(1.0);
        window.record(2.0);
        clock.advance(Duration::from_secs(11));

        assert!(window.is_empty());
        assert_eq!(window.snapshot().count(), 0);
    }

    #[test]
    fn test_concurrent_recording() {
        let (window, _clock) = manual_window(60);
        let window = Arc::new(window);

        let workers: Vec<_> = (0..8)
            .map(|t| {
                let window = Arc::clone(&window);
                thread::spawn(move || {
                    for i in 0..1000 {
                        window.record((t * 1000 + i) as f64);
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        let snapshot = window.snapshot();
        assert_eq!(snapshot.count(), 8000);
        assert_eq!(snapshot.min(), Some(0.0));
        assert_eq!(snapshot.max(), Some(7999.0));
    }
}
