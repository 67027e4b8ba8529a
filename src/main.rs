//! Card Sorter — main entry point.
//!
//! Binds the hardware substrate once at startup (real GPIO when the chip
//! is present and the `raspi` feature is on, the simulated HAL
//! otherwise), loads configuration and rules, and runs the sort worker.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                    │
//! │                                                            │
//! │   GpioHal / SimulatedHal          LogEventSink             │
//! │   (SensorPort + GatePort)         (EventSink)              │
//! │                                                            │
//! │  ───────────────── Port Trait Boundary ─────────────────   │
//! │                                                            │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │            SortController (pure logic)               │  │
//! │  │  FSM · rule evaluation · timers · ledger             │  │
//! │  └──────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! In simulation a line-oriented control channel on stdin stands in for
//! the out-of-scope dashboard: it toggles the beam, injects scans and
//! faults, and hot-swaps rule files.

use std::fs;
use std::io::{self, BufRead};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use cardsorter::adapters::log_sink::LogEventSink;
use cardsorter::adapters::sim::{SimHandle, SimulatedHal};
use cardsorter::app::ports::{GatePort, SensorPort};
use cardsorter::app::runtime::{self, ControllerHandle};
use cardsorter::app::service::SortController;
use cardsorter::cards::Card;
use cardsorter::config::SorterConfig;
use cardsorter::error::ActuatorError;
use cardsorter::ledger::ScanLedger;
use cardsorter::rules::store::RuleStore;

const CONFIG_FILE: &str = "sorter.json";
const RULES_FILE: &str = "rules.json";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config(CONFIG_FILE)?;
    let rules = load_rules(RULES_FILE)?;
    let ledger = ScanLedger::new();

    info!("Card Sorter Control System");

    #[cfg(feature = "raspi")]
    if let Some(hal) = cardsorter::adapters::gpio::raspi::bind(&config) {
        info!("mode: RASPBERRY PI — real GPIO active");
        return serve(hal, None, config, rules, ledger);
    }

    info!("mode: SIMULATION");
    let (hal, sim) = SimulatedHal::new();
    let hal = hal.with_route_delay(Duration::from_millis(250));
    serve(hal, Some(sim), config, rules, ledger)
}

fn serve<H>(
    hal: H,
    sim: Option<SimHandle>,
    config: SorterConfig,
    rules: RuleStore,
    ledger: ScanLedger,
) -> Result<()>
where
    H: SensorPort + GatePort + Send + 'static,
{
    let controller = SortController::new(config, rules.clone(), ledger.clone());
    let (handle, worker) = runtime::spawn(controller, hal, LogEventSink::new());

    control_channel(&handle, &rules, sim.as_ref(), &ledger);

    handle.shutdown();
    match worker.join() {
        Ok(controller) => info!(
            "stopped in {:?} after {} sorted cards",
            controller.state(),
            controller.ledger().len()
        ),
        Err(_) => warn!("sort worker panicked"),
    }
    Ok(())
}

/// Line-oriented control channel, read until `quit` or EOF.
fn control_channel(
    handle: &ControllerHandle,
    rules: &RuleStore,
    sim: Option<&SimHandle>,
    ledger: &ScanLedger,
) {
    println!(
        "commands: beam on | beam off | scan <card-json> | fail | rules <path> | status | quit"
    );

    for line in io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        let line = line.trim();

        match line {
            "" => {}
            "quit" | "exit" => break,
            "status" => println!("scans: {}", ledger.len()),
            "beam on" | "beam off" => match sim {
                Some(sim) => sim.set_beam(line == "beam on"),
                None => println!("beam control only exists in simulation"),
            },
            "fail" => match sim {
                Some(sim) => sim.inject_failure(ActuatorError::HomingTimeout),
                None => println!("failure injection only exists in simulation"),
            },
            _ => {
                if let Some(json) = line.strip_prefix("scan ") {
                    match serde_json::from_str::<Card>(json) {
                        Ok(card) => {
                            handle.identification_received(card);
                        }
                        Err(e) => println!("bad card json: {e}"),
                    }
                } else if let Some(path) = line.strip_prefix("rules ") {
                    match fs::read_to_string(path.trim())
                        .map_err(|e| e.to_string())
                        .and_then(|s| RuleStore::from_json(&s).map_err(|e| e.to_string()))
                    {
                        Ok(list) => {
                            info!("installed {} rules from {path}", list.len());
                            rules.replace(list);
                        }
                        Err(e) => println!("rules not loaded: {e}"),
                    }
                } else {
                    println!("unknown command: {line}");
                }
            }
        }
    }
}

fn load_config(path: &str) -> Result<SorterConfig> {
    if !Path::new(path).exists() {
        info!("no {path}, using default configuration");
        return Ok(SorterConfig::default());
    }
    let raw = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))
}

fn load_rules(path: &str) -> Result<RuleStore> {
    if !Path::new(path).exists() {
        info!("no {path}, using factory rule set");
        return Ok(RuleStore::with_defaults());
    }
    let raw = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let list = RuleStore::from_json(&raw).with_context(|| format!("parsing {path}"))?;
    info!("loaded {} rules from {path}", list.len());
    Ok(RuleStore::new(list))
}
