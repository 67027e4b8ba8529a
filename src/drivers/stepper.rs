//! Stepper motor driver (step/dir interface).
//!
//! Variable-direction pulse control over two digital outputs, with an
//! optional beam-bounded run for homing against a reference sensor.
//!
//! ## Safety contract
//!
//! Every public move returns with the motor stopped and `MotorState::Idle`,
//! whether it completed, tripped the beam, was interrupted, or failed.
//! A shared [`StopFlag`] is checked between steps, so a stop request takes
//! effect mid-move within one step period.
//!
//! ## Dual-target design
//!
//! Generic over `embedded-hal` digital pins: rppal pins on the Raspberry
//! Pi, in-memory pins in tests. The driver is a dumb actuator — pile
//! arithmetic and sequencing live in the GPIO adapter above it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::{ActuatorError, Result, SensorError};

/// Motor actuation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotorState {
    #[default]
    Idle,
    MovingForward,
    MovingReverse,
}

/// Cloneable stop request shared between the driver and whoever may need
/// to halt it (the gate adapter's `stop()`, a supervisor).
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How a move ended, with the number of steps actually taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// All requested steps were taken.
    Completed(u32),
    /// The target beam tripped.
    BeamTripped(u32),
    /// A stop request halted the move early.
    Interrupted(u32),
    /// The step bound was exhausted without the beam tripping.
    MaxSteps(u32),
}

pub struct Stepper<STEP, DIR> {
    step_pin: STEP,
    dir_pin: DIR,
    state: MotorState,
    half_period: Duration,
    stop: StopFlag,
}

impl<STEP: OutputPin, DIR: OutputPin> Stepper<STEP, DIR> {
    pub fn new(step_pin: STEP, dir_pin: DIR, step_delay_us: u64, stop: StopFlag) -> Self {
        Self {
            step_pin,
            dir_pin,
            state: MotorState::Idle,
            half_period: Duration::from_micros(step_delay_us),
            stop,
        }
    }

    pub fn state(&self) -> MotorState {
        self.state
    }

    pub fn is_moving(&self) -> bool {
        self.state != MotorState::Idle
    }

    /// Step a fixed number of times in the given direction.
    pub fn run_steps(&mut self, steps: u32, forward: bool) -> Result<StepOutcome> {
        self.begin(forward)?;
        let mut taken = 0;
        while taken < steps {
            if self.stop.is_set() {
                return Ok(self.finish(StepOutcome::Interrupted(taken)));
            }
            if let Err(e) = self.pulse() {
                self.state = MotorState::Idle;
                return Err(e.into());
            }
            taken += 1;
        }
        Ok(self.finish(StepOutcome::Completed(taken)))
    }

    /// Step in the given direction until `beam` reads low (tripped),
    /// bounded by `max_steps`. The wiring pulls the beam input high;
    /// an obstruction drives it low.
    pub fn run_until_beam<B: InputPin>(
        &mut self,
        beam: &mut B,
        forward: bool,
        max_steps: u32,
    ) -> Result<StepOutcome> {
        self.begin(forward)?;
        let mut taken = 0;
        while taken < max_steps {
            if self.stop.is_set() {
                return Ok(self.finish(StepOutcome::Interrupted(taken)));
            }
            let tripped = match beam.is_low() {
                Ok(level) => level,
                Err(_) => {
                    self.state = MotorState::Idle;
                    return Err(SensorError::GpioReadFailed.into());
                }
            };
            if tripped {
                return Ok(self.finish(StepOutcome::BeamTripped(taken)));
            }
            if let Err(e) = self.pulse() {
                self.state = MotorState::Idle;
                return Err(e.into());
            }
            taken += 1;
        }
        Ok(self.finish(StepOutcome::MaxSteps(taken)))
    }

    // ── Internal ──────────────────────────────────────────────

    fn begin(&mut self, forward: bool) -> Result<()> {
        let set = if forward {
            self.dir_pin.set_high()
        } else {
            self.dir_pin.set_low()
        };
        if set.is_err() {
            return Err(ActuatorError::GpioWriteFailed.into());
        }
        self.state = if forward {
            MotorState::MovingForward
        } else {
            MotorState::MovingReverse
        };
        Ok(())
    }

    fn finish(&mut self, outcome: StepOutcome) -> StepOutcome {
        self.state = MotorState::Idle;
        outcome
    }

    fn pulse(&mut self) -> core::result::Result<(), ActuatorError> {
        if self.step_pin.set_high().is_err() {
            return Err(ActuatorError::GpioWriteFailed);
        }
        thread::sleep(self.half_period);
        if self.step_pin.set_low().is_err() {
            return Err(ActuatorError::GpioWriteFailed);
        }
        thread::sleep(self.half_period);
        Ok(())
    }
}
