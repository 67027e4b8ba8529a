//! Simulated HAL — laptop substrate, no real timing.
//!
//! The beam is an in-memory flag toggled through a cloneable
//! [`SimHandle`] (the test harness or the simulation control channel
//! plays the role of the physical card). Gate moves resolve after an
//! optional synthetic delay and always succeed unless a failure has been
//! injected for fault-path testing. Every routed pile and every stop is
//! recorded so tests can assert on the full command history.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::app::ports::{GatePort, SensorPort};
use crate::drivers::stepper::MotorState;
use crate::error::ActuatorError;
use crate::fsm::context::BeamState;
use crate::rules::Pile;

#[derive(Default)]
struct SimShared {
    beam_broken: AtomicBool,
    stops: AtomicU32,
    injected_failure: Mutex<Option<ActuatorError>>,
    motor: Mutex<MotorState>,
    routed: Mutex<Vec<Pile>>,
}

/// External control handle: the "hands" of the simulation. Cloneable;
/// safe to use from any thread while the worker owns the HAL.
#[derive(Clone)]
pub struct SimHandle(Arc<SimShared>);

impl SimHandle {
    /// Place (`true`) or remove (`false`) the simulated card.
    pub fn set_beam(&self, broken: bool) {
        self.0.beam_broken.store(broken, Ordering::Relaxed);
    }

    /// Make the next gate move fail with `error`.
    pub fn inject_failure(&self, error: ActuatorError) {
        *lock(&self.0.injected_failure) = Some(error);
    }

    /// Piles routed so far, in order.
    pub fn routed(&self) -> Vec<Pile> {
        lock(&self.0.routed).clone()
    }

    /// Number of `stop()` calls observed.
    pub fn stop_count(&self) -> u32 {
        self.0.stops.load(Ordering::Relaxed)
    }

    /// Current motor state.
    pub fn motor_state(&self) -> MotorState {
        *lock(&self.0.motor)
    }
}

/// The simulated sensor + gate substrate.
pub struct SimulatedHal {
    shared: Arc<SimShared>,
    route_delay: Duration,
}

impl SimulatedHal {
    /// Build the HAL and its control handle. Moves resolve instantly;
    /// use [`with_route_delay`](Self::with_route_delay) to make them
    /// take synthetic time.
    pub fn new() -> (Self, SimHandle) {
        let shared = Arc::new(SimShared::default());
        (
            Self {
                shared: Arc::clone(&shared),
                route_delay: Duration::ZERO,
            },
            SimHandle(shared),
        )
    }

    pub fn with_route_delay(mut self, delay: Duration) -> Self {
        self.route_delay = delay;
        self
    }
}

impl SensorPort for SimulatedHal {
    fn read_beam(&mut self) -> BeamState {
        if self.shared.beam_broken.load(Ordering::Relaxed) {
            BeamState::Broken
        } else {
            BeamState::Clear
        }
    }
}

impl GatePort for SimulatedHal {
    fn move_to_pile(&mut self, pile: Pile) -> Result<(), ActuatorError> {
        if let Some(error) = lock(&self.shared.injected_failure).take() {
            *lock(&self.shared.motor) = MotorState::Idle;
            return Err(error);
        }

        *lock(&self.shared.motor) = MotorState::MovingForward;
        if !self.route_delay.is_zero() {
            thread::sleep(self.route_delay);
        }
        lock(&self.shared.routed).push(pile);
        *lock(&self.shared.motor) = MotorState::Idle;
        Ok(())
    }

    fn stop(&mut self) {
        self.shared.stops.fetch_add(1, Ordering::Relaxed);
        *lock(&self.shared.motor) = MotorState::Idle;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beam_follows_handle() {
        let (mut hal, sim) = SimulatedHal::new();
        assert_eq!(hal.read_beam(), BeamState::Clear);
        sim.set_beam(true);
        assert_eq!(hal.read_beam(), BeamState::Broken);
        sim.set_beam(false);
        assert_eq!(hal.read_beam(), BeamState::Clear);
    }

    #[test]
    fn moves_are_recorded_in_order() {
        let (mut hal, sim) = SimulatedHal::new();
        hal.move_to_pile(Pile(3)).unwrap();
        hal.move_to_pile(Pile(1)).unwrap();
        assert_eq!(sim.routed(), vec![Pile(3), Pile(1)]);
        assert_eq!(sim.motor_state(), MotorState::Idle);
    }

    #[test]
    fn injected_failure_fails_exactly_one_move() {
        let (mut hal, sim) = SimulatedHal::new();
        sim.inject_failure(ActuatorError::HomingTimeout);
        assert_eq!(
            hal.move_to_pile(Pile(2)),
            Err(ActuatorError::HomingTimeout)
        );
        assert!(sim.routed().is_empty());
        // The injection is consumed; the next move succeeds.
        hal.move_to_pile(Pile(2)).unwrap();
        assert_eq!(sim.routed(), vec![Pile(2)]);
    }

    #[test]
    fn stop_is_idempotent_and_counted() {
        let (mut hal, sim) = SimulatedHal::new();
        hal.stop();
        hal.stop();
        assert_eq!(sim.stop_count(), 2);
        assert_eq!(sim.motor_state(), MotorState::Idle);
    }
}
