//! Epoch-guarded deadline timers.
//!
//! The controller's timeouts (identification, confirmation, fault cooldown)
//! are measured in control-loop ticks. Each timer carries a generation
//! counter: arming or cancelling bumps the epoch, and a [`TimerToken`]
//! minted by an earlier arm can never fire afterwards. A timeout that
//! "fires" after the state that armed it has been left is therefore a
//! guaranteed no-op, regardless of delivery order.

/// Opaque proof of a specific arm operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken {
    epoch: u64,
}

/// A single cancellable deadline, measured in ticks.
#[derive(Debug, Default)]
pub struct DeadlineTimer {
    epoch: u64,
    deadline: Option<u64>,
}

impl DeadlineTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer to expire `ticks` from `now`. Any previously minted
    /// token is invalidated. `ticks` is clamped to at least 1 so a timer
    /// can never expire on the tick that armed it.
    pub fn arm(&mut self, now: u64, ticks: u64) -> TimerToken {
        self.epoch += 1;
        self.deadline = Some(now + ticks.max(1));
        TimerToken { epoch: self.epoch }
    }

    /// Disarm and invalidate outstanding tokens. Idempotent.
    pub fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            self.epoch += 1;
        }
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Attempt to fire with a token. Succeeds only if the timer is still
    /// armed, the token belongs to the current arming, and the deadline has
    /// passed. On success the timer disarms (a deadline fires once).
    pub fn fire(&mut self, token: TimerToken, now: u64) -> bool {
        let Some(deadline) = self.deadline else {
            return false;
        };
        if token.epoch != self.epoch || now < deadline {
            return false;
        }
        self.deadline = None;
        self.epoch += 1;
        true
    }
}

/// A timer slot that keeps its own arm token, for owners that arm and
/// check from the same place (the state handlers).
#[derive(Debug, Default)]
pub struct TimerSlot {
    timer: DeadlineTimer,
    token: Option<TimerToken>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, now: u64, ticks: u64) {
        self.token = Some(self.timer.arm(now, ticks));
    }

    pub fn cancel(&mut self) {
        self.token = None;
        self.timer.cancel();
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_armed()
    }

    /// True exactly once, on the first check at or after the deadline.
    pub fn expired(&mut self, now: u64) -> bool {
        match self.token {
            Some(token) => {
                if self.timer.fire(token, now) {
                    self.token = None;
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }
}
