//! Software countdown timers.

use crate::clock::SharedClock;

/// A named countdown timer with a latched expiry flag.
///
/// The timer never fires on its own: callers poll it with [`wait`] (or
/// [`expired`], which evaluates a wait internally). Once the delay has
/// elapsed the `expired` latch stays set until [`reset`] is called.
///
/// The marker is signed so it can be backdated past zero to force an
/// immediate expiry on startup.
///
/// [`wait`]: ActivityTimer::wait
/// [`expired`]: ActivityTimer::expired
/// [`reset`]: ActivityTimer::reset
pub struct ActivityTimer {
    pub name: &'static str,
    pub delay: u64,
    pub marker: i64,
    clock: SharedClock,
    expired: bool,
    running: bool,
    checked: i64,
}

impl ActivityTimer {
    pub fn new(name: &'static str, clock: SharedClock, delay: u64) -> Self {
        Self {
            name,
            clock,
            delay,
            marker: 0,
            expired: false,
            running: false,
            checked: 0,
        }
    }

    /// Arm the timer. No-op if already running.
    pub fn start(&mut self) {
        if !self.running {
            self.marker = self.clock.now() as i64;
            self.running = true;
        }
    }

    /// Disarm the timer. Does not clear the expired latch.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Re-arm from the current time and clear the expired latch.
    pub fn reset(&mut self) {
        self.marker = self.clock.now() as i64;
        self.expired = false;
    }

    /// Change the countdown length. Takes effect from the current marker.
    pub fn set_delay(&mut self, delay: u64) {
        self.delay = delay;
    }

    pub fn running(&self) -> bool {
        self.running
    }

    /// Evaluate the timer: returns true while time remains, false when the
    /// timer is stopped or has run out (latching `expired` in the latter
    /// case).
    pub fn wait(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.checked = self.clock.now() as i64;
        if self.checked - self.marker > self.delay as i64 {
            self.expired = true;
            return false;
        }
        true
    }

    /// Evaluate the timer and report the expired latch.
    pub fn expired(&mut self) -> bool {
        self.wait();
        self.expired
    }

    /// Seconds until expiry, or 0 if stopped or already expired.
    pub fn wait_time(&mut self) -> u64 {
        if self.wait() {
            (self.delay as i64 - (self.checked - self.marker)).max(0) as u64
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::rc::Rc;

    #[test]
    fn test_not_running_never_expires() {
        let clock = ManualClock::shared(0);
        let mut timer = ActivityTimer::new("idle", clock.clone(), 10);
        clock.advance(100);
        assert!(!timer.wait());
        assert!(!timer.expired());
    }

    #[test]
    fn test_expiry_latches_until_reset() {
        let clock = ManualClock::shared(1000);
        let mut timer = ActivityTimer::new("loc_send", clock.clone(), 60);
        timer.start();

        clock.advance(60);
        assert!(timer.wait());
        assert!(!timer.expired());

        clock.advance(1);
        assert!(!timer.wait());
        assert!(timer.expired());

        // Latch holds even though no further time passes
        assert!(timer.expired());

        timer.reset();
        assert!(!timer.expired());
        assert!(timer.wait());
    }

    #[test]
    fn test_start_is_idempotent() {
        let clock = ManualClock::shared(0);
        let mut timer = ActivityTimer::new("sat_view", clock.clone(), 30);
        timer.start();
        clock.advance(20);
        // Re-starting a running timer must not move the marker
        timer.start();
        clock.advance(11);
        assert!(timer.expired());
    }

    #[test]
    fn test_stop_preserves_latch() {
        let clock = ManualClock::shared(0);
        let mut timer = ActivityTimer::new("beacon", clock.clone(), 5);
        timer.start();
        clock.advance(6);
        assert!(timer.expired());
        timer.stop();
        assert!(!timer.wait());
        // expired() forces a wait, which short-circuits when stopped, but the
        // latch from before the stop is still visible
        assert!(timer.expired());
    }

    #[test]
    fn test_wait_time_counts_down() {
        let clock = ManualClock::shared(50);
        let mut timer = ActivityTimer::new("loc_send", clock.clone(), 100);
        timer.start();
        assert_eq!(timer.wait_time(), 100);
        clock.advance(40);
        assert_eq!(timer.wait_time(), 60);
        clock.advance(61);
        assert_eq!(timer.wait_time(), 0);
    }

    #[test]
    fn test_backdated_marker_forces_expiry() {
        let clock = ManualClock::shared(0);
        let mut timer = ActivityTimer::new("loc_send", clock.clone(), 3600);
        timer.start();
        // Exactly one delay back sits on the strict boundary
        timer.marker = -3600;
        assert!(!timer.expired());
        timer.marker = -3601;
        assert!(timer.expired());
    }
}
