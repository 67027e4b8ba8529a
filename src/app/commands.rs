//! Inbound commands to the sort controller.
//!
//! Both producers — the identification webhook and the beam sensor
//! observation path — funnel into a single serialized queue of these.
//! Producers never touch controller state directly; total ordering of
//! state transitions falls out of the one consuming worker.

use crate::cards::Card;
use crate::fsm::context::BeamState;

/// Commands external producers can send into the controller.
#[derive(Debug, Clone)]
pub enum SorterCommand {
    /// The beam changed level (edge, not level: producers only report
    /// transitions).
    SensorEdge(BeamState),

    /// The identification collaborator delivered a fully populated card
    /// for the currently detected physical event.
    IdentificationReceived(Card),
}
