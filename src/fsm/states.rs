//! Concrete state handler functions and table builder.
//!
//! Each state is defined by three plain `fn` pointers — no closures, no
//! dynamic dispatch, no heap.
//!
//! ```text
//!  IDLE ──[beam broken]──▶ AWAIT_IDENTIFICATION
//!                               │
//!                        [card identified]
//!                               ▼
//!                           EVALUATING ──▶ ROUTING ──▶ CONFIRMING
//!    ▲                                                     │
//!    └────────────────[beam clear, ledger entry]───────────┘
//!
//!  Timeouts / actuation failure ──▶ FAULT ──[cooldown]──▶ IDLE
//! ```
//!
//! Handlers are pure over the context: all I/O (the gate move, the fault
//! stop, ledger appends) is carried out by the service after the tick,
//! driven by what the handlers left on the blackboard.

use log::{info, warn};

use crate::error::FaultReason;
use crate::rules::evaluate;

use super::context::{BeamState, SorterContext};
use super::{StateDescriptor, StateId};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table. Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0 — Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1 — AwaitIdentification
        StateDescriptor {
            id: StateId::AwaitIdentification,
            name: "AwaitIdentification",
            on_enter: Some(await_identification_enter),
            on_exit: Some(await_identification_exit),
            on_update: await_identification_update,
        },
        // Index 2 — Evaluating
        StateDescriptor {
            id: StateId::Evaluating,
            name: "Evaluating",
            on_enter: Some(evaluating_enter),
            on_exit: None,
            on_update: evaluating_update,
        },
        // Index 3 — Routing
        StateDescriptor {
            id: StateId::Routing,
            name: "Routing",
            on_enter: Some(routing_enter),
            on_exit: None,
            on_update: routing_update,
        },
        // Index 4 — Confirming
        StateDescriptor {
            id: StateId::Confirming,
            name: "Confirming",
            on_enter: Some(confirming_enter),
            on_exit: Some(confirming_exit),
            on_update: confirming_update,
        },
        // Index 5 — Fault
        StateDescriptor {
            id: StateId::Fault,
            name: "Fault",
            on_enter: Some(fault_enter),
            on_exit: Some(fault_exit),
            on_update: fault_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state — waiting for a card to break the beam
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut SorterContext) {
    ctx.clear_cycle();
    info!("IDLE: awaiting card detection");
}

fn idle_update(ctx: &mut SorterContext) -> Option<StateId> {
    if ctx.pending_detection {
        ctx.pending_detection = false;
        return Some(StateId::AwaitIdentification);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  AWAIT_IDENTIFICATION — card present, webhook has not named it yet
// ═══════════════════════════════════════════════════════════════════════════

fn await_identification_enter(ctx: &mut SorterContext) {
    let ticks = ctx.ticks_for_secs(ctx.config.identification_timeout_secs);
    ctx.identification_timer.arm(ctx.total_ticks, ticks);
    info!(
        "AWAIT_IDENTIFICATION: card detected, waiting {}s for identification",
        ctx.config.identification_timeout_secs
    );
}

fn await_identification_exit(ctx: &mut SorterContext) {
    ctx.identification_timer.cancel();
}

fn await_identification_update(ctx: &mut SorterContext) -> Option<StateId> {
    if ctx.card.is_some() {
        return Some(StateId::Evaluating);
    }

    if ctx.identification_timer.expired(ctx.total_ticks) {
        warn!(
            "AWAIT_IDENTIFICATION: no identification after {:.0}s",
            ctx.secs_in_state()
        );
        ctx.fault = Some(FaultReason::IdentificationTimeout);
        return Some(StateId::Fault);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  EVALUATING — run the rule list against the identified card
// ═══════════════════════════════════════════════════════════════════════════

fn evaluating_enter(ctx: &mut SorterContext) {
    // Snapshot here: edits committed after this point belong to the next
    // evaluation, not this one.
    let snapshot = ctx.rules.snapshot();
    info!("EVALUATING: {} rules in snapshot", snapshot.len());
    ctx.rule_snapshot = Some(snapshot);
}

fn evaluating_update(ctx: &mut SorterContext) -> Option<StateId> {
    let (Some(card), Some(snapshot)) = (ctx.card.as_ref(), ctx.rule_snapshot.as_ref()) else {
        warn!("EVALUATING: no card or snapshot on blackboard, resetting");
        return Some(StateId::Idle);
    };

    let decision = evaluate(card, snapshot, ctx.config.default_pile);
    match decision.matched {
        Some(position) => info!(
            "EVALUATING: '{}' matched rule {} -> {}",
            card.name, position, decision.pile
        ),
        None => info!(
            "EVALUATING: '{}' matched no rule -> default {}",
            card.name, decision.pile
        ),
    }
    ctx.decision = Some(decision);
    Some(StateId::Routing)
}

// ═══════════════════════════════════════════════════════════════════════════
//  ROUTING — drive the gate mechanism toward the resolved pile
// ═══════════════════════════════════════════════════════════════════════════

fn routing_enter(ctx: &mut SorterContext) {
    let Some(decision) = ctx.decision else {
        warn!("ROUTING: entered without a decision, resetting");
        return;
    };
    info!("ROUTING: moving to {}", decision.pile);
    ctx.route_request = Some(decision.pile);
    ctx.route_result = None;
}

fn routing_update(ctx: &mut SorterContext) -> Option<StateId> {
    match ctx.route_result.take() {
        Some(Ok(())) => Some(StateId::Confirming),
        Some(Err(e)) => {
            ctx.fault = Some(FaultReason::Actuation(e));
            Some(StateId::Fault)
        }
        // The service has not applied the move yet.
        None => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONFIRMING — wait for the card to physically leave the detection zone
// ═══════════════════════════════════════════════════════════════════════════

fn confirming_enter(ctx: &mut SorterContext) {
    let ticks = ctx.ticks_for_secs(ctx.config.confirmation_timeout_secs);
    ctx.confirmation_timer.arm(ctx.total_ticks, ticks);
    info!(
        "CONFIRMING: waiting up to {}s for beam to clear",
        ctx.config.confirmation_timeout_secs
    );
}

fn confirming_exit(ctx: &mut SorterContext) {
    ctx.confirmation_timer.cancel();
}

fn confirming_update(ctx: &mut SorterContext) -> Option<StateId> {
    if ctx.beam == BeamState::Clear {
        ctx.completed = ctx.card.take().zip(ctx.decision.take());
        return Some(StateId::Idle);
    }

    if ctx.confirmation_timer.expired(ctx.total_ticks) {
        warn!("CONFIRMING: beam never cleared, card likely jammed");
        ctx.fault = Some(FaultReason::ConfirmationTimeout);
        return Some(StateId::Fault);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  FAULT — stop everything, cool down, self-reset to idle
// ═══════════════════════════════════════════════════════════════════════════

fn fault_enter(ctx: &mut SorterContext) {
    // Drop any unapplied gate request; the service issues the stop.
    ctx.route_request = None;
    let ticks = ctx.ticks_for_secs(ctx.config.fault_cooldown_secs);
    ctx.cooldown_timer.arm(ctx.total_ticks, ticks);

    let reason = ctx.fault.map_or_else(|| "unknown".to_string(), |r| r.to_string());
    match ctx.card.as_ref() {
        Some(card) => warn!(
            "FAULT: {} (card '{}'), cooling down {}s",
            reason, card.name, ctx.config.fault_cooldown_secs
        ),
        None => warn!(
            "FAULT: {} (no card identified), cooling down {}s",
            reason, ctx.config.fault_cooldown_secs
        ),
    }
}

fn fault_exit(ctx: &mut SorterContext) {
    ctx.fault = None;
    info!("FAULT: cooldown elapsed, resuming");
}

fn fault_update(ctx: &mut SorterContext) -> Option<StateId> {
    if ctx.cooldown_timer.expired(ctx.total_ticks) {
        return Some(StateId::Idle);
    }
    None
}
