//! # Closed set of thing kinds.
//!
//! [`ThingKind`] names the three simulated device families. The kind decides:
//! - the wire name written into `thing_type`,
//! - the payload schema (see [`telemetry`](super::telemetry)),
//! - the range the per-tick emission delay is drawn from ([`DelayRange`]).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::error::SupervisorError;

/// Device family of a simulated thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ThingKind {
    /// Battery pack with an amp meter and two thermistors.
    BatteryPack,
    /// Solar/grid inverter.
    Inverter,
    /// Luminaire.
    Light,
}

impl ThingKind {
    /// All kinds, in creation-rotation order.
    pub const ALL: [ThingKind; 3] = [ThingKind::BatteryPack, ThingKind::Inverter, ThingKind::Light];

    /// Wire name used in the event log and the roster.
    pub fn as_str(&self) -> &'static str {
        match self {
            ThingKind::BatteryPack => "BatteryPack",
            ThingKind::Inverter => "Inverter",
            ThingKind::Light => "Light",
        }
    }

    /// Default emission delay bounds for this kind.
    pub fn default_delays(&self) -> DelayRange {
        match self {
            ThingKind::BatteryPack => DelayRange::from_millis(1, 1_000),
            ThingKind::Inverter => DelayRange::from_millis(50, 2_000),
            ThingKind::Light => DelayRange::from_millis(1_000, 3_000),
        }
    }

    /// Next kind in rotation (battery → inverter → light → battery).
    pub fn next(&self) -> ThingKind {
        match self {
            ThingKind::BatteryPack => ThingKind::Inverter,
            ThingKind::Inverter => ThingKind::Light,
            ThingKind::Light => ThingKind::BatteryPack,
        }
    }
}

impl fmt::Display for ThingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ThingKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for ThingKind {
    type Err = SupervisorError;

    /// Accepts the wire name, the long name or the one-letter console alias (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "b" | "battery" | "batterypack" => Ok(ThingKind::BatteryPack),
            "i" | "inverter" => Ok(ThingKind::Inverter),
            "l" | "light" => Ok(ThingKind::Light),
            _ => Err(SupervisorError::UnknownKind { kind: s.to_string() }),
        }
    }
}

/// Inclusive bounds for the randomized delay between two emissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    /// Shortest delay.
    pub min: Duration,
    /// Longest delay.
    pub max: Duration,
}

impl DelayRange {
    /// Creates a range; bounds given in the wrong order are swapped.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Creates a range from millisecond bounds.
    pub fn from_millis(min: u64, max: u64) -> Self {
        Self::new(Duration::from_millis(min), Duration::from_millis(max))
    }
}
