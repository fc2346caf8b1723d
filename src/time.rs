//! # Clock Abstraction and Time Helpers
//!
//! The scheduler never reads hardware time itself. Instead the host provides a
//! [`Clock`]: a free-running microsecond counter of some fixed bit width that is
//! allowed to wrap around. All arithmetic on ticks goes through [`time_diff`],
//! which stays correct across a single overflow of the counter.
//!
//! On Embassy targets a clock is a one-liner:
//!
//! ```ignore
//! struct EmbassyClock;
//!
//! impl Clock for EmbassyClock {
//!     fn now(&self) -> u64 {
//!         embassy_time::Instant::now().as_micros()
//!     }
//! }
//! ```
//!
//! Arduino-style 32-bit `micros()` counters set `WIDTH = 32` so that a wrap
//! after ~71 minutes is handled.

use alloc::rc::Rc;
use core::cell::Cell;

use embassy_time::Duration;

/// A monotonic, wraparound-tolerant microsecond counter.
pub trait Clock {
    /// Bit width of the hardware counter. Values returned by [`Clock::now`]
    /// are interpreted modulo `2^WIDTH`.
    const WIDTH: u32 = 64;

    /// Current tick in microseconds.
    fn now(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    const WIDTH: u32 = C::WIDTH;

    fn now(&self) -> u64 {
        (**self).now()
    }
}

/// Mask selecting the low `width` bits of a tick value.
pub const fn tick_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Microseconds elapsed from `earlier` to `later` on a counter of the given
/// bit width.
///
/// The result is correct as long as less than one full counter period passed
/// between the two readings.
pub const fn time_diff(earlier: u64, later: u64, width: u32) -> u64 {
    later.wrapping_sub(earlier) & tick_mask(width)
}

/// Elapsed time since `earlier` on `clock`, as a [`Duration`].
pub fn elapsed_since<C: Clock + ?Sized>(clock: &C, earlier: u64) -> Duration {
    Duration::from_micros(time_diff(earlier, clock.now(), C::WIDTH))
}

/// A software clock whose value is set explicitly.
///
/// Clones share the same counter, so a test can keep one handle while the
/// scheduler owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    ticks: Rc<Cell<u64>>,
}

impl ManualClock {
    /// Create a clock starting at tick zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock starting at the given tick.
    pub fn starting_at(micros: u64) -> Self {
        let clock = Self::new();
        clock.set(micros);
        clock
    }

    /// Set the current tick.
    pub fn set(&self, micros: u64) {
        self.ticks.set(micros);
    }

    /// Advance the counter, wrapping on overflow.
    pub fn advance(&self, duration: Duration) {
        self.ticks
            .set(self.ticks.get().wrapping_add(duration.as_micros()));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.ticks.get()
    }
}

/// A one-shot timeout measured against a [`Clock`].
///
/// Typical use is a reconnect guard inside a periodic task:
///
/// ```ignore
/// if state == Reconnecting && connect_timeout.is_elapsed(&clock) {
///     // give up
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Timeout {
    start: u64,
    length: Duration,
}

impl Timeout {
    /// Start a timeout of `length` now.
    pub fn new<C: Clock + ?Sized>(clock: &C, length: Duration) -> Self {
        Self {
            start: clock.now(),
            length,
        }
    }

    /// Returns `true` once strictly more than the timeout length has passed
    /// since creation or the last [`Timeout::reset`].
    pub fn is_elapsed<C: Clock + ?Sized>(&self, clock: &C) -> bool {
        elapsed_since(clock, self.start) > self.length
    }

    /// Restart the timeout from the current tick.
    pub fn reset<C: Clock + ?Sized>(&mut self, clock: &C) {
        self.start = clock.now();
    }

    /// The configured length.
    pub fn length(&self) -> Duration {
        self.length
    }

    /// Change the length without restarting.
    pub fn set_length(&mut self, length: Duration) {
        self.length = length;
    }
}

/// Fires at a fixed cadence when polled from a periodic task.
///
/// A zero length never fires.
#[derive(Debug, Clone, Copy)]
pub struct Heartbeat {
    start: u64,
    length: Duration,
}

impl Heartbeat {
    pub fn new<C: Clock + ?Sized>(clock: &C, length: Duration) -> Self {
        Self {
            start: clock.now(),
            length,
        }
    }

    /// Number of whole cycles completed since the last beat, or `0`.
    ///
    /// The remainder of a partial cycle is carried over, so beats stay on a
    /// fixed grid even when polled late.
    pub fn beat<C: Clock + ?Sized>(&mut self, clock: &C) -> u64 {
        let length = self.length.as_micros();
        let now = clock.now();
        let diff = time_diff(self.start, now, C::WIDTH);
        if length == 0 || diff < length {
            return 0;
        }
        self.start = now.wrapping_sub(diff % length) & tick_mask(C::WIDTH);
        diff / length
    }

    /// Number of whole cycles completed since the last call, or `0`.
    ///
    /// Unlike [`Heartbeat::beat`] this restarts from the current tick, so two
    /// successive non-zero results are always at least one cycle apart.
    pub fn elapsed<C: Clock + ?Sized>(&mut self, clock: &C) -> u64 {
        let length = self.length.as_micros();
        let now = clock.now();
        let diff = time_diff(self.start, now, C::WIDTH);
        if length == 0 || diff < length {
            return 0;
        }
        self.start = now;
        diff / length
    }

    pub fn length(&self) -> Duration {
        self.length
    }

    pub fn set_length(&mut self, length: Duration) {
        self.length = length;
    }
}
