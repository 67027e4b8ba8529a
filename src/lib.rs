//! Card sorter control core.
//!
//! Routes physical trading cards into output piles based on user-defined
//! rules, driven by events from a card-identification webhook and a
//! beam-break sensor, and actuated through a stepper-motor gate. The
//! dashboard, card-metadata lookup, and CSV export are external
//! collaborators reached only through this crate's interfaces
//! ([`app::runtime::ControllerHandle`], [`rules::store::RuleStore`],
//! [`ledger::ScanLedger`]).
//!
//! The crate is substrate-agnostic: the controller talks to hardware
//! through port traits, bound once at startup to either the simulated
//! HAL or the real-GPIO HAL.

#![deny(unused_must_use)]

pub mod app;
pub mod cards;
pub mod config;
pub mod error;
pub mod fsm;
pub mod ledger;
pub mod rules;
pub mod timer;

pub mod adapters;
pub mod drivers;

#[cfg(feature = "raspi")]
pub mod pins;
