//! Unified error types for the card sorter.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level control loop's error handling uniform. Hardware-facing variants
//! are `Copy` so they can be cheaply passed through the state machine as
//! values rather than raised across the HAL boundary.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the control core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read.
    Sensor(SensorError),
    /// An actuator command failed.
    Actuator(ActuatorError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// GPIO read returned an error.
    GpioReadFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioReadFailed => write!(f, "GPIO read failed"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

/// Failures reported as values by `GatePort::move_to_pile`.
///
/// The HAL never panics across the port boundary; the controller reacts to
/// these deterministically by entering the fault state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// GPIO set failed.
    GpioWriteFailed,
    /// The home beam was never reached within the bounded step window.
    HomingTimeout,
    /// The home beam could not be read during a move.
    BeamReadFailed,
    /// A stop request halted the move before it completed.
    Interrupted,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::HomingTimeout => write!(f, "homing timeout"),
            Self::BeamReadFailed => write!(f, "beam read failed"),
            Self::Interrupted => write!(f, "move interrupted"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Fault reasons
// ---------------------------------------------------------------------------

/// Recoverable faults. Each one sends the state machine to `Fault`, which
/// stops the motor, waits out a cooldown, and self-resets to `Idle`. The
/// physical machine may still need a manual jam clear, but the control
/// software always returns to a ready state on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultReason {
    /// No identification arrived for a detected card within the window.
    IdentificationTimeout,
    /// The gate mechanism failed to route the card.
    Actuation(ActuatorError),
    /// The card never left the detection zone after routing.
    ConfirmationTimeout,
}

impl fmt::Display for FaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdentificationTimeout => write!(f, "identification timeout"),
            Self::Actuation(e) => write!(f, "actuation failure: {e}"),
            Self::ConfirmationTimeout => write!(f, "confirmation timeout"),
        }
    }
}

// ---------------------------------------------------------------------------
// Anomalies
// ---------------------------------------------------------------------------

/// Non-fatal unexpected inputs. Logged and discarded; never a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    /// A card was detected while another card was still in flight.
    /// The single-occupancy invariant forbids starting a second flow.
    UnexpectedDetection { state: &'static str },
    /// An identification arrived with no card awaiting one
    /// (stale or duplicate webhook delivery).
    StaleIdentification { state: &'static str },
    /// The command queue was full and a command was dropped.
    CommandQueueFull,
    /// A timer expiry carried an outdated epoch token and was ignored.
    StaleTimer { timer: &'static str },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedDetection { state } => {
                write!(f, "card detected while busy (state {state})")
            }
            Self::StaleIdentification { state } => {
                write!(f, "stale identification discarded (state {state})")
            }
            Self::CommandQueueFull => write!(f, "command queue full, command dropped"),
            Self::StaleTimer { timer } => write!(f, "stale {timer} timer expiry ignored"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
