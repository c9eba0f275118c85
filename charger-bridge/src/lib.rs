//! Core engine of the charger MQTT bridge.
//!
//! The binary in `main.rs` wires these modules to a real broker; the
//! devkit crate wires them to mocks. Either way the data flow is the
//! same: poll loop -> differ -> batcher -> bus, with inbound commands
//! funneled through a single queue onto the poll loop.

pub mod batcher;
pub mod bridge;
pub mod commands;
pub mod config;
pub mod controller;
pub mod differ;
pub mod health;
pub mod mqtt;
pub mod presence;
pub mod scheduler;
pub mod sim;
