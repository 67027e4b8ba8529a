//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the console log — the status feed the dashboard collaborator tails.
//! A future push adapter (SSE, websocket) would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::CardSorted {
                name,
                pile,
                matched,
            } => match matched {
                Some(position) => info!("SORTED | '{name}' -> {pile} (rule {position})"),
                None => info!("SORTED | '{name}' -> {pile} (no match)"),
            },
            AppEvent::FaultRaised {
                reason,
                state,
                card,
            } => {
                warn!(
                    "FAULT | {reason} in {state:?} (card: {})",
                    card.as_deref().unwrap_or("none")
                );
            }
            AppEvent::FaultCleared => {
                info!("FAULT | cleared, ready");
            }
            AppEvent::Anomaly(anomaly) => {
                warn!("ANOMALY | {anomaly}");
            }
        }
    }
}
