use std::sync::{Mutex, PoisonError};
use std::time::Duration;

pub const SAMPLE_COUNT: usize = 128;

const K_QUERY: f64 = 3.0;
const K_FAIL: f64 = 2.0;
const MIN_FAILURE_PENALTY_MS: f64 = 50.0;
const MIN_TIMEOUT_MS: f64 = 1.0;

struct Samples {
    ring: [f64; SAMPLE_COUNT],
    next: usize,
}

/// Rolling round-trip statistics for one upstream.
///
/// The ring starts full of `max_timeout` samples so a fresh upstream gets
/// the whole budget until it has shown how fast it really is.
pub struct TimingEstimator {
    samples: Mutex<Samples>,
    max_timeout: Duration,
}

impl TimingEstimator {
    pub fn new(max_timeout: Duration) -> Self {
        let seed = max_timeout.as_secs_f64() * 1000.0;
        Self {
            samples: Mutex::new(Samples {
                ring: [seed; SAMPLE_COUNT],
                next: 0,
            }),
            max_timeout,
        }
    }

    pub fn max_timeout(&self) -> Duration {
        self.max_timeout
    }

    pub fn record_success(&self, round_trip: Duration) {
        self.push(round_trip.as_secs_f64() * 1000.0);
    }

    /// A failure counts as the time spent waiting plus a deviation penalty.
    pub fn record_failure(&self, waited: Duration) {
        let (_, stddev) = self.stats();
        let penalty = (K_FAIL * stddev).max(MIN_FAILURE_PENALTY_MS);
        self.push(waited.as_secs_f64() * 1000.0 + penalty);
    }

    /// The last-resort upstream always waits the full `max_timeout`.
    pub fn timeout(&self, last_resort: bool) -> Duration {
        let max_ms = self.max_timeout.as_secs_f64() * 1000.0;
        if last_resort {
            return self.max_timeout;
        }
        let (mean, stddev) = self.stats();
        let ms = (mean + K_QUERY * stddev).clamp(MIN_TIMEOUT_MS.min(max_ms), max_ms);
        Duration::from_secs_f64(ms / 1000.0)
    }

    /// Mean and population standard deviation, recomputed over the whole ring.
    fn stats(&self) -> (f64, f64) {
        let samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        let n = SAMPLE_COUNT as f64;
        let mean = samples.ring.iter().sum::<f64>() / n;
        let variance = samples
            .ring
            .iter()
            .map(|s| (s - mean).powi(2))
            .sum::<f64>()
            / n;
        (mean, variance.sqrt())
    }

    fn push(&self, sample_ms: f64) {
        let mut samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = samples.next;
        samples.ring[slot] = sample_ms;
        samples.next = (slot + 1) % SAMPLE_COUNT;
    }
}
