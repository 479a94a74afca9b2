//! Application layer orchestrating the flight registry.
//!
//! `FlightRegistry` owns the mock flight state, `AutoPayMonitor` polls it on a
//! tokio task and settles payouts against the contract, and `Simulator`
//! replays admin actions for the CLI.

pub mod monitor;
pub mod registry;
pub mod simulator;
