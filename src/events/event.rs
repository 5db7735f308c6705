//! # Telemetry events emitted by things.
//!
//! A [`ThingEvent`] is an immutable snapshot of one thing's payload at one emission
//! instant. It is built inside the thing's emission loop, sent once on the shared
//! channel and written once to the event log by the aggregator.
//!
//! ## Wire format
//! One JSON object per line:
//! ```text
//! {"ts":"2024-05-01T12:00:00.123456Z","event_type_count":7,"thing_type":"Light",
//!  "event_data":{"light_level":42,"color_spectrum":3100,"state":true}}
//! ```
//! `event_type_count` carries the id of the originating thing.
//!
//! ## Ordering
//! `seq` is the per-thing emission number (1-based). It is not serialized; events of
//! one thing are strictly ordered by `seq` and by `ts`, events of different things are not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::things::{Payload, ThingId, ThingKind};

/// Timestamped payload snapshot of one thing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThingEvent {
    /// Emission time (RFC3339 on the wire).
    pub ts: DateTime<Utc>,
    /// Id of the thing that emitted the event.
    #[serde(rename = "event_type_count")]
    pub thing_id: ThingId,
    /// Kind of the emitting thing.
    #[serde(rename = "thing_type", deserialize_with = "deserialize_kind")]
    pub kind: ThingKind,
    /// Full payload at emission time.
    #[serde(rename = "event_data")]
    pub data: Payload,
    /// Per-thing emission number (1-based).
    #[serde(skip)]
    pub seq: u64,
}

impl ThingEvent {
    /// Creates an event stamped with the current wall-clock time.
    pub fn now(thing_id: ThingId, seq: u64, data: Payload) -> Self {
        Self {
            ts: Utc::now(),
            thing_id,
            kind: data.kind(),
            data,
            seq,
        }
    }

    /// Serializes the event as one log line, trailing newline included.
    pub fn to_line(&self) -> serde_json::Result<Vec<u8>> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

fn deserialize_kind<'de, D: serde::Deserializer<'de>>(d: D) -> Result<ThingKind, D::Error> {
    let name = String::deserialize(d)?;
    name.parse().map_err(serde::de::Error::custom)
}
