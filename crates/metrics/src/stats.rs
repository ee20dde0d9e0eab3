//! Duration statistics and event-rate accumulators backing the metrics
//! handles.

use {
    serde::Serialize,
    std::{
        collections::VecDeque,
        sync::{Mutex, PoisonError},
        time::{Duration, Instant},
    },
};

/// Point-in-time view of a duration accumulator, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    pub count: u64,
    pub mean: f64,
    pub standard_deviation: f64,
    pub min: f64,
    pub max: f64,
}

impl Statistics {
    const EMPTY: Self = Self {
        count: 0,
        mean: 0.0,
        standard_deviation: 0.0,
        min: 0.0,
        max: 0.0,
    };
}

#[derive(Debug, Default)]
struct Welford {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

/// Concurrent duration accumulator using Welford's online algorithm.
#[derive(Debug, Default)]
pub struct DurationStats {
    state: Mutex<Welford>,
}

impl DurationStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, duration: Duration) {
        let millis = duration.as_secs_f64() * 1_000.0;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.count += 1;
        if state.count == 1 {
            state.min = millis;
            state.max = millis;
        } else {
            state.min = state.min.min(millis);
            state.max = state.max.max(millis);
        }
        let delta = millis - state.mean;
        state.mean += delta / state.count as f64;
        state.m2 += delta * (millis - state.mean);
    }

    #[must_use]
    pub fn snapshot(&self) -> Statistics {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.count == 0 {
            return Statistics::EMPTY;
        }
        let variance = if state.count > 1 {
            state.m2 / (state.count - 1) as f64
        } else {
            0.0
        };
        Statistics {
            count: state.count,
            mean: state.mean,
            standard_deviation: variance.sqrt(),
            min: state.min,
            max: state.max,
        }
    }
}

/// Point-in-time view of a rate meter: the all-time event count plus the
/// events-per-second observed over the recent window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateSnapshot {
    pub count: u64,
    pub per_second: f64,
}

const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window event rate meter.
#[derive(Debug)]
pub struct RateMeter {
    window: Duration,
    total: Mutex<u64>,
    recent: Mutex<VecDeque<Instant>>,
}

impl Default for RateMeter {
    fn default() -> Self {
        Self::with_window(DEFAULT_RATE_WINDOW)
    }
}

impl RateMeter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            total: Mutex::new(0),
            recent: Mutex::new(VecDeque::new()),
        }
    }

    pub fn record(&self) {
        *self.total.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        let now = Instant::now();
        let mut recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
        recent.push_back(now);
        Self::prune(&mut recent, now, self.window);
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        *self.total.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn snapshot(&self) -> RateSnapshot {
        let count = self.count();
        let now = Instant::now();
        let mut recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
        Self::prune(&mut recent, now, self.window);
        RateSnapshot {
            count,
            per_second: recent.len() as f64 / self.window.as_secs_f64(),
        }
    }

    fn prune(recent: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(oldest) = recent.front() {
            if now.duration_since(*oldest) > window {
                recent.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn duration_stats_track_mean_and_spread() {
        let stats = DurationStats::new();
        for millis in [10, 20, 30] {
            stats.record(Duration::from_millis(millis));
        }
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.count, 3);
        assert!((snapshot.mean - 20.0).abs() < 1e-9);
        assert!((snapshot.standard_deviation - 10.0).abs() < 1e-9);
        assert!((snapshot.min - 10.0).abs() < 1e-9);
        assert!((snapshot.max - 30.0).abs() < 1e-9);
    }

    #[test]
    fn empty_stats_snapshot_is_zeroed() {
        let snapshot = DurationStats::new().snapshot();
        assert_eq!(snapshot.count, 0);
        assert_eq!(snapshot.mean, 0.0);
    }

    #[test]
    fn rate_meter_counts_and_windows() {
        let meter = RateMeter::with_window(Duration::from_secs(10));
        for _ in 0..5 {
            meter.record();
        }
        let snapshot = meter.snapshot();
        assert_eq!(snapshot.count, 5);
        assert!((snapshot.per_second - 0.5).abs() < 1e-9);
    }
}
