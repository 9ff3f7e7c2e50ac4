//! Collaborator traits for the bits of hardware the mission core drives
//! but does not model: sleep/reset rails and the battery monitor.

/// Device-wide power primitives.
///
/// `deep_sleep` implementations must quiesce persistent storage first (the
/// firmware unmounts the filesystem before dropping the power rail); the
/// core does not resume from deep sleep, it restarts.
pub trait PowerControl {
    /// Suspend the CPU for `ms`, resuming in place.
    fn light_sleep(&mut self, ms: u64);

    /// Power down for `ms`; execution does not continue past this call on
    /// real hardware.
    fn deep_sleep(&mut self, ms: u64);

    /// Full device restart.
    fn reset(&mut self);
}

/// Battery voltage sampling.
pub trait BatteryMonitor {
    /// Sample the main rail. `None` when the monitor is unreadable; the
    /// caller simply omits the reading.
    fn check(&mut self) -> Option<f32>;
}
