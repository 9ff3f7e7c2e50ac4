//! One satellite short-burst-data transaction attempt.

use crate::clock::SharedClock;
use crate::link::response::SessionResult;
use tracing::warn;

/// Default seconds a Trying session may run before it is failed.
pub const SESSION_TIMEOUT_S: u64 = 30;

/// Session lifecycle. Transitions are monotonic within one session object;
/// a retry is a fresh session, never a rewound one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Attemptable: waiting for signal good enough to try.
    Ready,
    /// Transaction issued to the modem, response pending.
    Trying,
    /// Backoff delay running; becomes Ready when it elapses.
    Delayed,
    /// Timed out. Terminal.
    Failed,
    /// Result received. Terminal.
    Complete,
}

/// Tracks the status and result of one SBD session.
///
/// The session never runs its own clock: time-based transitions happen only
/// inside [`poll`], driven by the owning link driver once per tick.
///
/// [`poll`]: SbdSession::poll
pub struct SbdSession {
    clock: SharedClock,
    status: SessionStatus,
    /// Attempt start (Trying) or construction time (Delayed).
    start: u64,
    timeout: u64,
    /// How many attempts preceded this one.
    pub retry: u8,
    /// Backoff seconds gating a Delayed session.
    pub delay: u64,
    pub result: Option<SessionResult>,
}

impl std::fmt::Debug for SbdSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SbdSession")
            .field("status", &self.status)
            .field("start", &self.start)
            .field("retry", &self.retry)
            .field("delay", &self.delay)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

impl SbdSession {
    /// A fresh session. With `delay > 0` the session starts Delayed and
    /// only becomes attemptable once the delay has elapsed.
    pub fn new(clock: SharedClock, retry: u8, delay: u64) -> Self {
        let (status, start) = if delay > 0 {
            (SessionStatus::Delayed, clock.now())
        } else {
            (SessionStatus::Ready, 0)
        };
        Self {
            clock,
            status,
            start,
            timeout: SESSION_TIMEOUT_S,
            retry,
            delay,
            result: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Begin the transaction. Only meaningful while Ready; returns true if
    /// the caller should now issue the session-initiate command to the
    /// modem.
    pub fn attempt(&mut self) -> bool {
        if self.status != SessionStatus::Ready {
            return false;
        }
        self.start = self.clock.now();
        self.status = SessionStatus::Trying;
        true
    }

    /// Deliver the modem's session result. Only meaningful while Trying;
    /// anywhere else the result is logged and dropped.
    pub fn complete(&mut self, result: SessionResult) {
        if self.status != SessionStatus::Trying {
            warn!(status = ?self.status, "session result in non-trying state, dropped");
            return;
        }
        self.result = Some(result);
        self.status = SessionStatus::Complete;
    }

    /// Evaluate time-based transitions and report whether the session is
    /// still alive (the owner should keep waiting on it).
    ///
    /// Trying runs out at `start + timeout`; Delayed becomes Ready at
    /// `start + delay`. Failed and Complete report dead.
    pub fn poll(&mut self) -> bool {
        match self.status {
            SessionStatus::Ready => true,
            SessionStatus::Trying => {
                if self.clock.now() - self.start < self.timeout {
                    true
                } else {
                    self.status = SessionStatus::Failed;
                    false
                }
            }
            SessionStatus::Delayed => {
                if self.clock.now() - self.start > self.delay {
                    self.status = SessionStatus::Ready;
                }
                true
            }
            SessionStatus::Failed | SessionStatus::Complete => false,
        }
    }
}
