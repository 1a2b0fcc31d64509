//! Exponentially weighted moving averages.

use std::sync::Mutex;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::snapshot::Snapshot;

/// An exponentially weighted moving average of per-interval totals.
///
/// Values marked within one `interval` are summed; at each interval
/// boundary the running average moves toward that sum with
/// `alpha = 1 - exp(-interval / window)`, so a contribution has decayed
/// to roughly `1/e` of its weight after `window`.
///
/// The arithmetic lives behind a mutex. The contended path of the metrics
/// layer is sample recording in the skip list; the EWMA's critical
/// section is a handful of float operations.
pub struct Ewma<C: Clock = SystemClock> {
    interval: Duration,
    alpha: f64,
    clock: C,
    state: Mutex<EwmaState>,
}

struct EwmaState {
    /// Completed intervals at the last tick.
    last_interval: u64,
    /// Sum of values marked in the current interval.
    uncounted: f64,
    /// The moving average; `None` until the first interval completes.
    rate: Option<f64>,
}

impl Ewma<SystemClock> {
    /// An EWMA with decay horizon `window`, accumulating over `interval`.
    pub fn new(window: Duration, interval: Duration) -> Self {
        Self::with_clock(window, interval, SystemClock::default())
    }
}

impl<C: Clock> Ewma<C> {
    pub fn with_clock(window: Duration, interval: Duration, clock: C) -> Self {
        let interval = interval.max(Duration::from_nanos(1));
        let window = window.max(interval);
        let alpha = 1.0 - (-(interval.as_secs_f64() / window.as_secs_f64())).exp();

        Ewma {
            interval,
            alpha,
            clock,
            state: Mutex::new(EwmaState {
                last_interval: 0,
                uncounted: 0.0,
                rate: None,
            }),
        }
    }

    /// Record a value into the current interval.
    pub fn mark(&self, value: f64) {
        let mut state = self.state.lock().unwrap();
        self.tick(&mut state);
        state.uncounted += value;
    }

    /// Record a single event.
    pub fn mark_one(&self) {
        self.mark(1.0);
    }

    /// The current average. Before the first interval completes this is
    /// the partial sum so far, the best estimate available.
    pub fn rate(&self) -> f64 {
        let mut state = self.state.lock().unwrap();
        self.tick(&mut state);
        state.rate.unwrap_or(state.uncounted)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::Ewma(self.rate())
    }

    /// Fold completed intervals into the average: the interval that held
    /// `uncounted` contributes it, every further elapsed interval decays
    /// the average toward an empty one.
    fn tick(&self, state: &mut EwmaState) {
        let now_interval = (self.clock.elapsed().as_nanos() / self.interval.as_nanos()) as u64;
        let elapsed = now_interval.saturating_sub(state.last_interval);
        if elapsed == 0 {
            return;
        }

        let rate = match state.rate {
            None => state.uncounted,
            Some(rate) => rate + self.alpha * (state.uncounted - rate),
        };
        let idle = (elapsed - 1).min(i32::MAX as u64) as i32;
        state.rate = Some(rate * (1.0 - self.alpha).powi(idle));

        state.uncounted = 0.0;
        state.last_interval = now_interval;
    }
}
