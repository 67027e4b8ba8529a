//! Shared mutable context threaded through every FSM handler.
//!
//! `SorterContext` is the single struct that state handlers read from and
//! write to. It contains the observed beam level, the card currently in
//! flight, the rule snapshot and routing decision, timer slots, and
//! configuration. Think of it as the "blackboard" in a blackboard
//! architecture: commands and the service write inputs, state handlers
//! consume them and leave outputs behind.

use std::sync::Arc;

use crate::config::SorterConfig;
use crate::error::{ActuatorError, FaultReason};
use crate::cards::Card;
use crate::rules::store::RuleStore;
use crate::rules::{Pile, RouteDecision, Rule};
use crate::timer::TimerSlot;

// ---------------------------------------------------------------------------
// Sensor state
// ---------------------------------------------------------------------------

/// Beam-break sensor level. Owned by the HAL; the controller only
/// observes transitions delivered as commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BeamState {
    /// Nothing obstructs the beam.
    #[default]
    Clear,
    /// A card is blocking the beam.
    Broken,
}

// ---------------------------------------------------------------------------
// SorterContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct SorterContext {
    // -- Timing --
    /// Ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,
    /// Monotonic total tick count.
    pub total_ticks: u64,
    /// Duration of one tick in seconds (inverse of control loop frequency).
    pub tick_period_secs: f32,

    // -- Configuration & collaborators --
    pub config: SorterConfig,
    /// Shared rule store; `Evaluating` takes a snapshot on entry.
    pub rules: RuleStore,

    // -- Live inputs (written by command handling) --
    /// Last observed beam level.
    pub beam: BeamState,
    /// A detection was accepted while idle and awaits pickup.
    pub pending_detection: bool,
    /// The card currently in flight, once identified.
    pub card: Option<Card>,

    // -- Evaluation --
    /// Rule snapshot captured when `Evaluating` was entered.
    pub rule_snapshot: Option<Arc<[Rule]>>,
    /// Evaluator output carried into routing.
    pub decision: Option<RouteDecision>,

    // -- Routing (service applies requests to the gate port) --
    /// Posted by `Routing` on entry; taken by the service after the tick.
    pub route_request: Option<Pile>,
    /// Written back by the service once the gate move finishes.
    pub route_result: Option<Result<(), ActuatorError>>,

    // -- Outcomes --
    /// Set when a cycle finishes; the service turns it into a ScanEvent.
    pub completed: Option<(Card, RouteDecision)>,
    /// Reason for the most recent fault, while in the fault state.
    pub fault: Option<FaultReason>,

    // -- Timers --
    pub identification_timer: TimerSlot,
    pub confirmation_timer: TimerSlot,
    pub cooldown_timer: TimerSlot,
}

impl SorterContext {
    /// Create a new context with the given configuration and rule store.
    pub fn new(config: SorterConfig, rules: RuleStore) -> Self {
        Self {
            ticks_in_state: 0,
            total_ticks: 0,
            tick_period_secs: config.control_loop_interval_ms as f32 / 1000.0,
            config,
            rules,
            beam: BeamState::Clear,
            pending_detection: false,
            card: None,
            rule_snapshot: None,
            decision: None,
            route_request: None,
            route_result: None,
            completed: None,
            fault: None,
            identification_timer: TimerSlot::new(),
            confirmation_timer: TimerSlot::new(),
            cooldown_timer: TimerSlot::new(),
        }
    }

    /// Seconds elapsed since the current state was entered.
    pub fn secs_in_state(&self) -> f32 {
        self.ticks_in_state as f32 * self.tick_period_secs
    }

    /// Convert a configured duration into control-loop ticks (at least 1).
    pub fn ticks_for_secs(&self, secs: u16) -> u64 {
        (u64::from(secs) * 1000)
            .div_ceil(u64::from(self.config.control_loop_interval_ms))
            .max(1)
    }

    /// Drop all per-cycle scratch state. Called when returning to idle.
    /// Deliberately leaves `completed` alone — the service harvests it
    /// after the tick that set it.
    pub fn clear_cycle(&mut self) {
        self.card = None;
        self.rule_snapshot = None;
        self.decision = None;
        self.route_request = None;
        self.route_result = None;
        self.identification_timer.cancel();
        self.confirmation_timer.cancel();
        self.cooldown_timer.cancel();
    }
}
