//! Runtime core: orchestration and lifecycle.
//!
//! The entry point is [`Supervisor`], which owns everything below it.
//!
//! Internal modules:
//! - [`supervisor`]: state machine, id assignment, create and stop commands;
//! - [`registry`]: index of running things and the stop-then-join removal protocol;
//! - [`aggregator`]: single consumer of the event channel, writes the sink;
//! - [`lifecycle`]: barrier counting live emission tasks;
//! - [`config`]: runtime settings;
//! - [`shutdown`]: termination signal handling.

mod aggregator;
mod config;
mod lifecycle;
mod registry;
mod shutdown;
mod supervisor;

pub use aggregator::{Aggregator, DrainReport};
pub use config::Config;
pub use lifecycle::Lifecycle;
pub use registry::Registry;
pub use shutdown::{ShutdownSignal, wait_for_shutdown_signal};
pub use supervisor::{Phase, StopReport, Supervisor};
