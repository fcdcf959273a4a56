//! Batch Scenario Tests
//!
//! End-to-end checks of arbitration, accumulation, whitelisting and
//! finalization through the public facade.

#[path = "../common/mod.rs"]
mod common;

mod directories;
mod properties;
mod scenarios;
mod whitelist;
