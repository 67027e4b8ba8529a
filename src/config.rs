//! System configuration parameters
//!
//! All tunable parameters for the card sorter. Values can be overridden
//! via a JSON config file loaded at startup.

use serde::{Deserialize, Serialize};

use crate::rules::Pile;

/// Core sorter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SorterConfig {
    // --- Timeouts ---
    /// Seconds to wait for the identification webhook after a card is
    /// detected, before declaring an identification-timeout fault.
    pub identification_timeout_secs: u16,
    /// Seconds to wait for the beam to clear after routing, before
    /// declaring a confirmation-timeout fault.
    pub confirmation_timeout_secs: u16,
    /// Seconds the controller stays in the fault state before
    /// self-resetting to idle.
    pub fault_cooldown_secs: u16,

    // --- Routing ---
    /// Pile a card is routed to when no rule matches.
    pub default_pile: Pile,

    // --- Stepper motion ---
    /// Steps between adjacent pile positions.
    pub steps_per_pile: u32,
    /// Steps of the final eject move that pushes the card off the track.
    pub eject_steps: u32,
    /// Upper bound on homing steps before the move is declared failed.
    pub homing_max_steps: u32,
    /// Half-period of one step pulse (microseconds).
    pub step_delay_us: u64,

    // --- Timing ---
    /// Control loop interval (milliseconds)
    pub control_loop_interval_ms: u32,
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            // Timeouts
            identification_timeout_secs: 10,
            confirmation_timeout_secs: 5,
            fault_cooldown_secs: 3,

            // Routing
            default_pile: Pile(0),

            // Motion (matches the machine's wiring-bench calibration)
            steps_per_pile: 1000,
            eject_steps: 2000,
            homing_max_steps: 50_000,
            step_delay_us: 1000,

            // Timing
            control_loop_interval_ms: 25, // 40 Hz
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SorterConfig::default();
        assert!(c.identification_timeout_secs > 0);
        assert!(c.confirmation_timeout_secs > 0);
        assert!(c.fault_cooldown_secs > 0);
        assert!(c.steps_per_pile > 0);
        assert!(c.eject_steps > 0);
        assert!(c.homing_max_steps > c.eject_steps);
        assert!(c.control_loop_interval_ms > 0);
    }

    #[test]
    fn serde_roundtrip() {
        let c = SorterConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: SorterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.identification_timeout_secs, c2.identification_timeout_secs);
        assert_eq!(c.default_pile, c2.default_pile);
        assert_eq!(c.eject_steps, c2.eject_steps);
        assert_eq!(c.control_loop_interval_ms, c2.control_loop_interval_ms);
    }

    #[test]
    fn timeouts_fit_in_tick_arithmetic() {
        let c = SorterConfig::default();
        // One control tick must be shorter than the shortest timeout,
        // otherwise the timers can never be observed before they expire.
        let shortest_secs = c
            .confirmation_timeout_secs
            .min(c.identification_timeout_secs)
            .min(c.fault_cooldown_secs);
        assert!(u64::from(c.control_loop_interval_ms) < u64::from(shortest_secs) * 1000);
    }
}
