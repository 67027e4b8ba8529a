//! Append-only scan ledger.
//!
//! One [`ScanEvent`] is created per completed sort cycle and never updated
//! or deleted by the core. The handle is cheaply cloneable so the
//! dashboard and export collaborators can read while the controller
//! appends.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cards::Card;
use crate::rules::Pile;

/// Record of one completed sort.
#[derive(Debug, Clone, Serialize)]
pub struct ScanEvent {
    pub timestamp: DateTime<Utc>,
    pub card: Card,
    /// Position of the matched rule; `None` means the default pile took it.
    pub matched: Option<usize>,
    pub pile: Pile,
}

/// Shared append-only sequence of scan events, in insertion order.
#[derive(Clone, Default)]
pub struct ScanLedger {
    inner: Arc<Mutex<Vec<ScanEvent>>>,
}

impl ScanLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed sort. Infallible by contract.
    pub fn append(&self, event: ScanEvent) {
        self.lock().push(event);
    }

    /// All events in insertion order.
    pub fn list(&self) -> Vec<ScanEvent> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Wipe the ledger. Exists for the dashboard collaborator; the core
    /// never calls this.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ScanEvent>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str, pile: u8) -> ScanEvent {
        ScanEvent {
            timestamp: Utc::now(),
            card: Card {
                name: name.into(),
                ..Card::default()
            },
            matched: Some(0),
            pile: Pile(pile),
        }
    }

    #[test]
    fn preserves_insertion_order() {
        let ledger = ScanLedger::new();
        ledger.append(event("first", 1));
        ledger.append(event("second", 2));
        let all = ledger.list();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].card.name, "first");
        assert_eq!(all[1].card.name, "second");
    }

    #[test]
    fn clones_observe_appends() {
        let ledger = ScanLedger::new();
        let reader = ledger.clone();
        ledger.append(event("x", 0));
        assert_eq!(reader.len(), 1);
        assert!(!reader.is_empty());
    }

    #[test]
    fn events_serialize_for_export() {
        let json = serde_json::to_string(&event("Birds of Paradise", 3)).unwrap();
        assert!(json.contains("\"pile\":3"));
        assert!(json.contains("Birds of Paradise"));
    }
}
