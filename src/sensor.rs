//! # Sensor Value Smoothing
//!
//! [`SensorProcessor`] turns a noisy stream of readings into a sparse stream
//! of updates worth publishing. Each reading is folded into a running mean
//! over roughly the last `window` samples. The mean is reported when it has
//! moved by more than `eps` since the last report, or when `poll` has passed
//! without a report.
//!
//! ```ignore
//! let mut temp = SensorProcessor::new(s.clock(), 5, Duration::from_secs(60), 0.1);
//!
//! sched.add(Duration::from_secs(2), move |s| {
//!     if let Some(value) = temp.filter(s.clock(), read_sensor()) {
//!         let _ = s.publish("node/sensors/temp", &format!("{value:.1}"));
//!     }
//! })?;
//! ```

use embassy_time::Duration;

use crate::time::{Clock, time_diff};

/// Running-mean filter with change and staleness thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorProcessor {
    window: u32,
    poll: Duration,
    eps: f64,
    samples: u32,
    mean: f64,
    /// Last reported mean, `None` until the first report after a reset.
    reported: Option<f64>,
    last: u64,
}

impl SensorProcessor {
    /// Create a filter.
    ///
    /// - `window`: number of samples the mean is weighted over.
    /// - `poll`: report at least this often, even if the mean is unchanged.
    ///   A zero `poll` disables periodic reports.
    /// - `eps`: minimal change of the mean that triggers a report.
    pub fn new<C: Clock + ?Sized>(clock: &C, window: u32, poll: Duration, eps: f64) -> Self {
        Self {
            window,
            poll,
            eps,
            samples: 0,
            mean: 0.0,
            reported: None,
            last: clock.now(),
        }
    }

    /// A filter over 5 samples that reports changes above `0.1` and at least
    /// once a minute.
    pub fn with_defaults<C: Clock + ?Sized>(clock: &C) -> Self {
        Self::new(clock, 5, Duration::from_secs(60), 0.1)
    }

    /// Fold `value` into the mean.
    ///
    /// Returns the smoothed value when it should be reported, `None` when
    /// the update can be suppressed. The first reading after construction or
    /// [`reset`](Self::reset) is always reported.
    pub fn filter<C: Clock + ?Sized>(&mut self, clock: &C, value: f64) -> Option<f64> {
        let n = f64::from(self.samples);
        self.mean = (self.mean * n + value) / (n + 1.0);
        if self.samples < self.window {
            self.samples += 1;
        }

        let changed = match self.reported {
            None => true,
            Some(reported) => {
                let delta = reported - self.mean;
                let delta = if delta < 0.0 { -delta } else { delta };
                delta > self.eps
            }
        };
        let now = clock.now();
        let stale = self.poll.as_micros() != 0
            && time_diff(self.last, now, C::WIDTH) > self.poll.as_micros();

        if changed || stale {
            self.reported = Some(self.mean);
            self.last = now;
            Some(self.mean)
        } else {
            None
        }
    }

    /// Integer variant of [`filter`](Self::filter). The reported mean is
    /// truncated toward zero.
    pub fn filter_i64<C: Clock + ?Sized>(&mut self, clock: &C, value: i64) -> Option<i64> {
        self.filter(clock, value as f64).map(|mean| mean as i64)
    }

    /// Forget all samples; the next reading is reported unconditionally.
    pub fn reset<C: Clock + ?Sized>(&mut self, clock: &C) {
        self.samples = 0;
        self.mean = 0.0;
        self.reported = None;
        self.last = clock.now();
    }

    /// Current smoothed value.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Last reported value, if any.
    pub fn last_reported(&self) -> Option<f64> {
        self.reported
    }
}
