//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the connectivity rules for the router: STA
//! reconnection and authentication escalation, AP NAT/DNS coordination
//! and credential provisioning.  All interaction with the radio, timers
//! and flash happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod events;
pub mod indicator;
pub mod ports;
pub mod provisioning;
pub mod service;
pub mod uplink;
