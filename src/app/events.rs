//! Outbound application events.
//!
//! The [`SortController`](super::service::SortController) emits these
//! through the [`EventSink`](super::ports::EventSink) port. Adapters on
//! the other side decide what to do with them — log to the console, feed
//! the dashboard status line, record them in a test.

use crate::error::{Anomaly, FaultReason};
use crate::fsm::StateId;
use crate::rules::Pile;

/// Structured events emitted by the control core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The controller has started (carries initial state).
    Started(StateId),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// A card completed its sort cycle and was appended to the ledger.
    CardSorted {
        name: String,
        pile: Pile,
        /// Position of the matched rule, `None` for the default pile.
        matched: Option<usize>,
    },

    /// The controller entered the fault state.
    FaultRaised {
        reason: FaultReason,
        /// State the machine was in when the fault struck.
        state: StateId,
        /// Name of the in-flight card, when one had been identified.
        card: Option<String>,
    },

    /// The fault cooldown elapsed and the controller is ready again.
    FaultCleared,

    /// A non-fatal unexpected input was discarded.
    Anomaly(Anomaly),
}
