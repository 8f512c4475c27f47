//! SensorNode library.
//!
//! A cooperative scheduler for battery-powered mesh sensor nodes: a
//! [`Node`](scheduler::Node) owns a bounded set of pluggable
//! [`Sensor`](sensors::Sensor)s, polls them, reports their readings
//! upstream and sleeps until the earliest deadline or wake line.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │   SystemClock (ClockPort)   LoggingNetwork (NetworkPort)       │
//! │   sim::{RecordingNetwork, MemoryStorage, SimClock}             │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │   Node scheduler · IdAllocator · sleep planning                │
//! │   Sensors: heartbeat · presence · climate · dimmer · matrix    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod config;
pub mod device;
pub mod drivers;
pub mod error;
pub mod message;
pub mod persistence;
pub mod ports;
pub mod scheduler;
pub mod sensors;
