//! # Kind-specific telemetry payloads.
//!
//! Every kind contributes one payload type implementing [`Telemetry`]. The emission
//! driver in [`thing`](super::thing) is generic over this trait, so the per-kind code
//! is limited to "sample the next reading".
//!
//! ## Wire shapes
//! ```text
//! BatteryPack → {"pack_voltage", "amp_meter": {"live_amps", "cycle_amps_hours", "total_amp_hours"},
//!                "thermistors": [{"temperature"}, {"temperature"}]}
//! Inverter    → {"watts", "volts", "state"}
//! Light       → {"light_level", "color_spectrum", "state"}
//! ```

use serde::{Deserialize, Serialize};

use super::kind::ThingKind;
use super::random;

/// A payload that can be sampled fresh on every tick.
pub trait Telemetry: Sized + Send + 'static {
    /// The kind this payload belongs to.
    const KIND: ThingKind;

    /// Draws a new reading; every field is sampled independently.
    fn sample() -> Self;

    /// Wraps the reading into the kind-erased event payload.
    fn into_payload(self) -> Payload;
}

/// Kind-erased payload carried by a [`ThingEvent`](crate::ThingEvent).
///
/// Serialized untagged: the `thing_type` field next to it tells readers which shape to expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    BatteryPack(BatteryPack),
    Inverter(Inverter),
    Light(Light),
}

impl Payload {
    /// Kind of the thing that produced this payload.
    pub fn kind(&self) -> ThingKind {
        match self {
            Payload::BatteryPack(_) => ThingKind::BatteryPack,
            Payload::Inverter(_) => ThingKind::Inverter,
            Payload::Light(_) => ThingKind::Light,
        }
    }
}

// ---- BatteryPack ----

const MIN_PACK_VOLTAGE: f64 = 227.0; // 71S * 3.2V
const MAX_PACK_VOLTAGE: f64 = 300.0; // 71S * 4.2V
const MIN_LIVE_AMPS: f64 = -200.0;
const MAX_LIVE_AMPS: f64 = 200.0;
const MAX_CYCLE_AMP_HOURS: f64 = 100.0;
const MAX_TOTAL_AMP_HOURS: f64 = 10_000.0;
const MIN_THERM: f64 = -40.0; // celsius
const MAX_THERM: f64 = 175.0;
const THERMISTORS: usize = 2;

/// Battery pack reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryPack {
    /// Total pack voltage.
    pub pack_voltage: f64,
    /// Current flow in/out of the pack.
    pub amp_meter: AmpMeter,
    /// Pack thermistors.
    pub thermistors: Vec<Thermistor>,
}

/// Coulomb counter of a battery pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmpMeter {
    pub live_amps: f64,
    pub cycle_amps_hours: f64,
    pub total_amp_hours: f64,
}

/// Single temperature probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thermistor {
    pub temperature: f64,
}

impl Telemetry for BatteryPack {
    const KIND: ThingKind = ThingKind::BatteryPack;

    fn sample() -> Self {
        Self {
            pack_voltage: random::float(MIN_PACK_VOLTAGE, MAX_PACK_VOLTAGE),
            amp_meter: AmpMeter {
                live_amps: random::float(MIN_LIVE_AMPS, MAX_LIVE_AMPS),
                cycle_amps_hours: random::float(0.0, MAX_CYCLE_AMP_HOURS),
                total_amp_hours: random::float(0.0, MAX_TOTAL_AMP_HOURS),
            },
            thermistors: (0..THERMISTORS)
                .map(|_| Thermistor {
                    temperature: random::float(MIN_THERM, MAX_THERM),
                })
                .collect(),
        }
    }

    fn into_payload(self) -> Payload {
        Payload::BatteryPack(self)
    }
}

// ---- Inverter ----

const MIN_WATTS: f64 = 10.0;
const MAX_WATTS: f64 = 10_000.0;
const MIN_VOLTS: f64 = 100.0;
const MAX_VOLTS: f64 = 480.0;

/// Inverter reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inverter {
    /// Live power.
    pub watts: f64,
    /// Live source voltage.
    pub volts: f64,
    /// On/off.
    pub state: bool,
}

impl Telemetry for Inverter {
    const KIND: ThingKind = ThingKind::Inverter;

    fn sample() -> Self {
        Self {
            watts: random::float(MIN_WATTS, MAX_WATTS),
            volts: random::float(MIN_VOLTS, MAX_VOLTS),
            state: random::flag(),
        }
    }

    fn into_payload(self) -> Payload {
        Payload::Inverter(self)
    }
}

// ---- Light ----

const MIN_LIGHT_LEVEL: i64 = 0;
const MAX_LIGHT_LEVEL: i64 = 100;
const MIN_CCT: i64 = 2_000;
const MAX_CCT: i64 = 6_000;

/// Luminaire reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    /// Dimming level in percent.
    pub light_level: u8,
    /// Correlated color temperature (CCT).
    pub color_spectrum: i16,
    /// On/off.
    pub state: bool,
}

impl Telemetry for Light {
    const KIND: ThingKind = ThingKind::Light;

    fn sample() -> Self {
        Self {
            light_level: random::int(MIN_LIGHT_LEVEL, MAX_LIGHT_LEVEL) as u8,
            color_spectrum: random::int(MIN_CCT, MAX_CCT) as i16,
            state: random::flag(),
        }
    }

    fn into_payload(self) -> Payload {
        Payload::Light(self)
    }
}
