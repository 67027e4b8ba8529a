//! Sort controller — the hexagonal core.
//!
//! [`SortController`] owns the FSM, its context blackboard, and the scan
//! ledger handle. It exposes a clean, hardware-agnostic API: commands in,
//! ticks forward, events out. All I/O flows through port traits injected
//! at call sites, making the entire controller testable with the
//! simulated HAL.
//!
//! ```text
//!  SorterCommand ──▶ ┌──────────────────────┐ ──▶ EventSink
//!                    │    SortController     │
//!       GatePort ◀── │  FSM · timers · rules │ ──▶ ScanLedger
//!                    └──────────────────────┘
//! ```

use chrono::Utc;
use log::{info, warn};

use crate::config::SorterConfig;
use crate::error::{Anomaly, FaultReason};
use crate::fsm::context::{BeamState, SorterContext};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::ledger::{ScanEvent, ScanLedger};
use crate::rules::store::RuleStore;

use super::commands::SorterCommand;
use super::events::AppEvent;
use super::ports::{EventSink, GatePort};

// ───────────────────────────────────────────────────────────────
// SortController
// ───────────────────────────────────────────────────────────────

/// The controller orchestrating one physical sort path.
///
/// Single-occupancy invariant: at most one card is in flight (identified
/// but not yet routed and confirmed) at any time. Detections that arrive
/// while busy are anomalies, never a second flow.
pub struct SortController {
    fsm: Fsm,
    ctx: SorterContext,
    ledger: ScanLedger,
}

impl SortController {
    /// Construct the controller. Does **not** start the FSM — call
    /// [`start`](Self::start) next.
    pub fn new(config: SorterConfig, rules: RuleStore, ledger: ScanLedger) -> Self {
        let ctx = SorterContext::new(config, rules);
        let fsm = Fsm::new(build_state_table(), StateId::Idle);
        Self { fsm, ctx, ledger }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Run the initial state's entry action and announce readiness.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("SortController started in {:?}", self.fsm.current_state());
    }

    // ── Command handling ──────────────────────────────────────

    /// Process one command from the serialized ingress queue.
    ///
    /// This is the only place controller state reacts to external input,
    /// and it runs on the single consuming worker — no locks needed in
    /// the state machine itself.
    pub fn handle_command(&mut self, cmd: SorterCommand, sink: &mut impl EventSink) {
        match cmd {
            SorterCommand::SensorEdge(level) => {
                let prev = self.ctx.beam;
                self.ctx.beam = level;

                if level == BeamState::Broken && prev != BeamState::Broken {
                    if self.fsm.current_state() == StateId::Idle {
                        info!("sensor: beam broken, card detected");
                        self.ctx.pending_detection = true;
                    } else {
                        let anomaly = Anomaly::UnexpectedDetection {
                            state: self.fsm.current_state().name(),
                        };
                        warn!("{anomaly}");
                        sink.emit(&AppEvent::Anomaly(anomaly));
                    }
                }
            }
            SorterCommand::IdentificationReceived(card) => {
                if self.fsm.current_state() == StateId::AwaitIdentification
                    && self.ctx.card.is_none()
                {
                    info!("identification received: '{}'", card.name);
                    self.ctx.card = Some(card);
                } else {
                    let anomaly = Anomaly::StaleIdentification {
                        state: self.fsm.current_state().name(),
                    };
                    warn!("{anomaly} ('{}')", card.name);
                    sink.emit(&AppEvent::Anomaly(anomaly));
                }
            }
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: FSM tick → apply gate request → fault and
    /// completion side effects → emit state change.
    ///
    /// The gate move blocks the worker for the duration of the physical
    /// actuation. That is by contract acceptable: only one card is ever
    /// in flight, so nothing else needs this thread; further commands
    /// simply queue until the worker comes back around.
    pub fn tick(&mut self, gate: &mut impl GatePort, sink: &mut impl EventSink) {
        let prev = self.fsm.current_state();

        self.fsm.tick(&mut self.ctx);

        // 1. Apply a gate move posted by the Routing state.
        if let Some(pile) = self.ctx.route_request.take() {
            let result = gate.move_to_pile(pile);
            if let Err(e) = result {
                warn!("gate move to {pile} failed: {e}");
                gate.stop();
            }
            self.ctx.route_result = Some(result);
        }

        let state = self.fsm.current_state();

        // 2. Fault entry: stop the mechanism unconditionally and surface
        //    the fault with full context.
        if state == StateId::Fault && prev != StateId::Fault {
            gate.stop();
            if let Some(reason) = self.ctx.fault {
                sink.emit(&AppEvent::FaultRaised {
                    reason,
                    state: prev,
                    card: self.ctx.card.as_ref().map(|c| c.name.clone()),
                });
            }
        }
        if prev == StateId::Fault && state != StateId::Fault {
            sink.emit(&AppEvent::FaultCleared);
        }

        // 3. Completed cycle → exactly one ledger entry.
        if let Some((card, decision)) = self.ctx.completed.take() {
            sink.emit(&AppEvent::CardSorted {
                name: card.name.clone(),
                pile: decision.pile,
                matched: decision.matched,
            });
            self.ledger.append(ScanEvent {
                timestamp: Utc::now(),
                card,
                matched: decision.matched,
                pile: decision.pile,
            });
        }

        // 4. Announce the transition, if any.
        if state != prev {
            sink.emit(&AppEvent::StateChanged { from: prev, to: state });
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Active fault reason, while in the fault state.
    pub fn fault(&self) -> Option<FaultReason> {
        self.ctx.fault
    }

    /// The live configuration.
    pub fn config(&self) -> &SorterConfig {
        &self.ctx.config
    }

    /// Handle to the scan ledger this controller appends to.
    pub fn ledger(&self) -> &ScanLedger {
        &self.ledger
    }

    /// Total control ticks executed since startup.
    pub fn ticks(&self) -> u64 {
        self.ctx.total_ticks
    }
}
