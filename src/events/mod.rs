//! Telemetry events and their durable destination.
//!
//! ## Contents
//! - [`ThingEvent`] the timestamped payload snapshot written once per line
//! - [`open_event_log`] append-only file used as the aggregator's sink
//!
//! ## Quick reference
//! - **Producers**: every running [`Thing`](crate::Thing) (one emission loop each).
//! - **Consumer**: the single [`Aggregator`](crate::Aggregator) task.
//!
//! See the crate root for the system-level wiring diagram.

mod event;
mod sink;

pub use event::ThingEvent;
pub use sink::open_event_log;
