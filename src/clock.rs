//! Injected time source.
//!
//! Every timer and driver in the system references the same clock instance,
//! so test code can steer time deterministically through [`ManualClock`]
//! while production code runs on [`MonotonicClock`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic seconds plus blocking sleeps.
///
/// The whole system is single-threaded, so a `sleep` call really does stall
/// the device for its duration; the mission scheduler relies on that for its
/// power-saving idle.
pub trait Clock {
    /// Monotonic time in whole seconds.
    fn now(&self) -> u64;

    /// Block for `seconds`.
    fn sleep(&self, seconds: u64);

    /// Block for `ms` milliseconds (guard intervals, charge-up delays).
    fn sleep_ms(&self, ms: u64);
}

/// Shared handle to the system clock.
pub type SharedClock = Rc<dyn Clock>;

/// Wall-clock backed [`Clock`] measured from process start.
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn shared() -> SharedClock {
        Rc::new(Self::new())
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> u64 {
        self.start.elapsed().as_secs()
    }

    fn sleep(&self, seconds: u64) {
        std::thread::sleep(std::time::Duration::from_secs(seconds));
    }

    fn sleep_ms(&self, ms: u64) {
        std::thread::sleep(std::time::Duration::from_millis(ms));
    }
}

/// Hand-cranked clock where sleeps advance time instead of blocking.
///
/// Sub-second sleeps accumulate in a millisecond remainder so repeated
/// guard intervals still move the clock forward.
pub struct ManualClock {
    now: Cell<u64>,
    ms_carry: Cell<u64>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: Cell::new(start),
            ms_carry: Cell::new(0),
        }
    }

    pub fn shared(start: u64) -> Rc<ManualClock> {
        Rc::new(Self::new(start))
    }

    /// Move time forward by `seconds`.
    pub fn advance(&self, seconds: u64) {
        self.now.set(self.now.get() + seconds);
    }

    /// Jump to an absolute timestamp.
    pub fn set(&self, now: u64) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.get()
    }

    fn sleep(&self, seconds: u64) {
        self.advance(seconds);
    }

    fn sleep_ms(&self, ms: u64) {
        let total = self.ms_carry.get() + ms;
        self.now.set(self.now.get() + total / 1000);
        self.ms_carry.set(total % 1000);
    }
}
