//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SortController (domain)
//! ```
//!
//! Driven adapters (the beam sensor, the gate mechanism, event sinks)
//! implement these traits. The [`SortController`](super::service::SortController)
//! consumes them via generics, so the domain core never touches hardware
//! directly — and never branches on which substrate (simulated or real
//! GPIO) is bound.

use crate::error::ActuatorError;
use crate::fsm::context::BeamState;
use crate::rules::Pile;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the worker polls this to observe the detection beam.
///
/// Must be safe to call from the controller's single consuming context.
/// Implementations report the current level; edge detection happens in
/// the worker, which turns level changes into commands.
pub trait SensorPort {
    fn read_beam(&mut self) -> BeamState;
}

// ───────────────────────────────────────────────────────────────
// Gate port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain commands the routing mechanism.
pub trait GatePort {
    /// Drive the mechanism so the current card lands in `pile`.
    ///
    /// Blocks for the duration of the move (physical actuation takes
    /// time); the motor is guaranteed stopped before this returns,
    /// success or failure. Failures are values — this call never
    /// panics across the port boundary.
    fn move_to_pile(&mut self, pile: Pile) -> Result<(), ActuatorError>;

    /// Immediate halt. Callable at any time, idempotent. Only stops
    /// further motion — a partially fed card is not reversed.
    fn stop(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / dashboard)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (log lines, a
/// dashboard feed, a test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
