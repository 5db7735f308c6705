//! # thingvisor
//!
//! **Thingvisor** simulates a fleet of telemetry-producing devices ("things")
//! and funnels everything they emit into one append-only JSON-lines log.
//!
//! Each thing runs its own emission loop: wait a randomized delay, sample a
//! kind-specific payload, send it into one bounded channel. A single aggregator
//! drains that channel and writes the sink. A [`Supervisor`] creates and stops
//! things on command and tears the whole system down without losing or
//! duplicating events.
//!
//! ## Architecture
//! ```text
//!   console / signals
//!          │ commands
//!          ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                  │
//! │  - Registry   (id → thing handle, stop-then-join removal)    │
//! │  - Lifecycle  (barrier counting live emission tasks)         │
//! │  - Aggregator (single consumer, owns the sink)               │
//! └──────┬──────────────────┬──────────────────┬─────────────────┘
//!        ▼                  ▼                  ▼
//!  ┌────────────┐     ┌────────────┐     ┌────────────┐
//!  │ Thing #1   │     │ Thing #2   │     │ Thing #N   │
//!  │ BatteryPack│     │ Inverter   │     │ Light      │
//!  └─────┬──────┘     └─────┬──────┘     └─────┬──────┘
//!        │ ThingEvent       │                  │
//!        ▼                  ▼                  ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │            mpsc channel (Config::channel_capacity)           │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                ▼
//!                       aggregator task ──► events.txt (one JSON object per line)
//! ```
//!
//! ### Shutdown
//! ```text
//! stop_all(true)
//!   ├─► reject new things            (phase = ShuttingDown)
//!   ├─► stop + join every thing      (Registry::remove_all)
//!   ├─► wait for the barrier         (Lifecycle::wait_idle)
//!   ├─► drain, flush, close sink     (Aggregator::drain_and_stop)
//!   └─► phase = Terminated, terminated() resolves
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types                              |
//! |-------------------|----------------------------------------------------------|----------------------------------------|
//! | **Supervision**   | Create, stop and list things; orderly teardown.          | [`Supervisor`], [`StopReport`]         |
//! | **Things**        | Device kinds, payload sampling, the emission loop.       | [`ThingKind`], [`Telemetry`], [`Thing`]|
//! | **Events**        | Wire format of one log line and the log file itself.     | [`ThingEvent`], [`open_event_log`]     |
//! | **Errors**        | Typed command errors.                                    | [`SupervisorError`]                    |
//! | **Configuration** | Caps, channel size, delay ranges, autostart.             | [`Config`]                             |
//! | **Console**       | Line-oriented command grammar used by the binary.        | [`console::Command`]                   |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use thingvisor::{Config, Supervisor, ThingKind};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default().with_delays(Duration::from_millis(1), Duration::from_millis(5));
//!     let sup = Supervisor::new(cfg);
//!     sup.configure(Vec::<u8>::new()).await?;
//!
//!     sup.create(ThingKind::BatteryPack, 3).await?;
//!     sup.create_named("light", 1).await?;
//!     tokio::time::sleep(Duration::from_millis(20)).await;
//!
//!     let report = sup.stop_all(true).await?;
//!     let emitted: u64 = report.stopped.iter().map(|r| r.events).sum();
//!     assert_eq!(report.drain.map(|d| d.written), Some(emitted));
//!     Ok(())
//! }
//! ```

pub mod console;
mod core;
mod error;
mod events;
mod things;

pub use core::{
    Aggregator, Config, DrainReport, Lifecycle, Phase, Registry, ShutdownSignal, StopReport,
    Supervisor, wait_for_shutdown_signal,
};
pub use error::{CommandError, SupervisorError};
pub use events::{ThingEvent, open_event_log};
pub use things::{
    AmpMeter, BatteryPack, DelayRange, Inverter, Light, Payload, Telemetry, Thermistor, Thing,
    ThingExit, ThingId, ThingInfo, ThingKind,
};
