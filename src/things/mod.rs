//! Simulated things: kinds, payloads and the shared emission driver.
//!
//! - [`ThingKind`] closed set of device families, with parsing and delay bounds
//! - [`Telemetry`] per-kind payload sampling hook ([`BatteryPack`], [`Inverter`], [`Light`])
//! - [`Thing`] identity, stop signal, counter and the generic emission loop

mod kind;
mod random;
mod telemetry;
mod thing;

pub use kind::{DelayRange, ThingKind};
pub use telemetry::{AmpMeter, BatteryPack, Inverter, Light, Payload, Telemetry, Thermistor};
pub use thing::{Thing, ThingExit, ThingId, ThingInfo};
