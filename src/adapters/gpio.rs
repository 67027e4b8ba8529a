//! Real-GPIO HAL — the physical gate mechanism.
//!
//! Owns the stepper driver and both beam-break inputs, exposing them
//! through [`SensorPort`] and [`GatePort`]. This is the only module in
//! the system that touches actual pins, and only through the
//! `embedded-hal` digital traits — the concrete pin types are injected,
//! so the same adapter drives rppal pins on the Raspberry Pi and
//! in-memory pins in tests.
//!
//! ## Routing sequence
//!
//! `move_to_pile(p)` = home (reverse until the home beam trips, bounded)
//! → advance `p × steps_per_pile` forward → eject. Homing overrun and
//! stop requests surface as [`ActuatorError`] values; the motor is
//! always stopped before the call returns.

use embedded_hal::digital::{InputPin, OutputPin};
use log::{info, warn};

use crate::app::ports::{GatePort, SensorPort};
use crate::config::SorterConfig;
use crate::drivers::stepper::{StepOutcome, Stepper, StopFlag};
use crate::error::{ActuatorError, Error};
use crate::fsm::context::BeamState;
use crate::rules::Pile;

/// Motion parameters for the gate mechanism, lifted from config.
#[derive(Debug, Clone, Copy)]
pub struct MotionProfile {
    pub steps_per_pile: u32,
    pub eject_steps: u32,
    pub homing_max_steps: u32,
    pub step_delay_us: u64,
}

impl MotionProfile {
    pub fn from_config(config: &SorterConfig) -> Self {
        Self {
            steps_per_pile: config.steps_per_pile,
            eject_steps: config.eject_steps,
            homing_max_steps: config.homing_max_steps,
            step_delay_us: config.step_delay_us,
        }
    }
}

/// Concrete adapter combining the stepper and beam sensors.
///
/// `HOME` is the reference beam the gate homes against; `SCAN` is the
/// detection-zone beam the controller observes for card presence.
pub struct GpioHal<STEP, DIR, HOME, SCAN> {
    stepper: Stepper<STEP, DIR>,
    home_beam: HOME,
    scan_beam: SCAN,
    profile: MotionProfile,
    stop: StopFlag,
    last_beam: BeamState,
}

impl<STEP, DIR, HOME, SCAN> GpioHal<STEP, DIR, HOME, SCAN>
where
    STEP: OutputPin,
    DIR: OutputPin,
    HOME: InputPin,
    SCAN: InputPin,
{
    pub fn new(
        step: STEP,
        dir: DIR,
        home_beam: HOME,
        scan_beam: SCAN,
        profile: MotionProfile,
    ) -> Self {
        let stop = StopFlag::new();
        Self {
            stepper: Stepper::new(step, dir, profile.step_delay_us, stop.clone()),
            home_beam,
            scan_beam,
            profile,
            stop,
            last_beam: BeamState::Clear,
        }
    }

    /// Cloneable handle that halts a move in progress from another
    /// thread (the worker blocks inside `move_to_pile`).
    pub fn stop_handle(&self) -> StopFlag {
        self.stop.clone()
    }

    fn drive(&mut self, steps: u32, label: &str) -> Result<(), ActuatorError> {
        match self.stepper.run_steps(steps, true) {
            Ok(StepOutcome::Completed(_)) => Ok(()),
            Ok(StepOutcome::Interrupted(taken)) => {
                warn!("gate {label} interrupted after {taken} steps");
                Err(ActuatorError::Interrupted)
            }
            Ok(outcome) => {
                warn!("unexpected gate {label} outcome: {outcome:?}");
                Err(ActuatorError::GpioWriteFailed)
            }
            Err(e) => Err(actuator_of(e)),
        }
    }
}

impl<STEP, DIR, HOME, SCAN> SensorPort for GpioHal<STEP, DIR, HOME, SCAN>
where
    STEP: OutputPin,
    DIR: OutputPin,
    HOME: InputPin,
    SCAN: InputPin,
{
    fn read_beam(&mut self) -> BeamState {
        // Pull-up wiring: an obstruction drives the input low.
        match self.scan_beam.is_low() {
            Ok(true) => {
                self.last_beam = BeamState::Broken;
                BeamState::Broken
            }
            Ok(false) => {
                self.last_beam = BeamState::Clear;
                BeamState::Clear
            }
            Err(_) => {
                warn!("scan beam read failed, holding last level");
                self.last_beam
            }
        }
    }
}

impl<STEP, DIR, HOME, SCAN> GatePort for GpioHal<STEP, DIR, HOME, SCAN>
where
    STEP: OutputPin,
    DIR: OutputPin,
    HOME: InputPin,
    SCAN: InputPin,
{
    fn move_to_pile(&mut self, pile: Pile) -> Result<(), ActuatorError> {
        // A fresh move supersedes any earlier stop request.
        self.stop.clear();

        // 1. Home against the reference beam.
        match self
            .stepper
            .run_until_beam(&mut self.home_beam, false, self.profile.homing_max_steps)
        {
            Ok(StepOutcome::BeamTripped(steps)) => {
                info!("gate homed after {steps} steps");
            }
            Ok(StepOutcome::MaxSteps(steps)) => {
                warn!("home beam never tripped within {steps} steps");
                return Err(ActuatorError::HomingTimeout);
            }
            Ok(StepOutcome::Interrupted(taken)) => {
                warn!("gate homing interrupted after {taken} steps");
                return Err(ActuatorError::Interrupted);
            }
            Ok(outcome) => {
                warn!("unexpected homing outcome: {outcome:?}");
                return Err(ActuatorError::HomingTimeout);
            }
            Err(e) => return Err(actuator_of(e)),
        }

        // 2. Advance to the pile position.
        let advance = u32::from(pile.0) * self.profile.steps_per_pile;
        if advance > 0 {
            self.drive(advance, "advance")?;
        }

        // 3. Eject the card into the bin.
        self.drive(self.profile.eject_steps, "eject")?;

        info!("gate routed card to {pile}");
        Ok(())
    }

    fn stop(&mut self) {
        self.stop.trigger();
    }
}

fn actuator_of(e: Error) -> ActuatorError {
    match e {
        Error::Actuator(a) => a,
        Error::Sensor(_) => ActuatorError::BeamReadFailed,
        Error::Config(_) => ActuatorError::GpioWriteFailed,
    }
}

// ───────────────────────────────────────────────────────────────
// Raspberry Pi binding
// ───────────────────────────────────────────────────────────────

#[cfg(feature = "raspi")]
pub mod raspi {
    //! Binds the adapter to the Pi's GPIO header via rppal. The rppal
    //! pin types implement the `embedded-hal` digital traits, so the
    //! generic adapter above needs no platform code.

    use log::info;
    use rppal::gpio::{Gpio, InputPin as PiInput, OutputPin as PiOutput};

    use crate::config::SorterConfig;
    use crate::pins;

    use super::{GpioHal, MotionProfile};

    pub type PiHal = GpioHal<PiOutput, PiOutput, PiInput, PiInput>;

    /// Probe the GPIO chip and claim the sorter's pins. Returns `None`
    /// when no usable GPIO is present (e.g. running on a laptop), so the
    /// caller can fall back to the simulated substrate.
    pub fn bind(config: &SorterConfig) -> Option<PiHal> {
        let gpio = match Gpio::new() {
            Ok(gpio) => gpio,
            Err(e) => {
                info!("no usable GPIO ({e}), not binding real hardware");
                return None;
            }
        };

        let step = gpio.get(pins::STEPPER1_STEP).ok()?.into_output_low();
        let dir = gpio.get(pins::STEPPER1_DIR).ok()?.into_output_low();
        let home = gpio.get(pins::BEAM_HOME).ok()?.into_input_pullup();
        let scan = gpio.get(pins::BEAM_SCAN).ok()?.into_input_pullup();

        info!("GPIO bound: step={} dir={} home={} scan={}",
            pins::STEPPER1_STEP, pins::STEPPER1_DIR, pins::BEAM_HOME, pins::BEAM_SCAN);

        Some(GpioHal::new(
            step,
            dir,
            home,
            scan,
            MotionProfile::from_config(config),
        ))
    }
}
