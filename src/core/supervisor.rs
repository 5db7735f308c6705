//! # Supervisor: façade over the registry, the aggregator and the lifecycle barrier.
//!
//! The [`Supervisor`] is the explicit context object handed to every command handler.
//! It assigns ids, starts emission tasks, and implements the three stop modes.
//!
//! ## State machine
//! ```text
//! Unconfigured ──configure(sink)──► Configured ──stop_all(true)──► ShuttingDown ──► Terminated
//!                                    ▲      │
//!                                    └──────┘  create / stop_by_id / stop_by_kind / stop_all(false)
//! ```
//! No transition leaves `Terminated`.
//!
//! ## High-level architecture
//! ```text
//! create(kind, qty)
//!   ├─► id = next_id.fetch_add(1)
//!   ├─► Thing::new(id, kind, cfg.delays_for(kind))
//!   ├─► thing.start(aggregator.sender(), &lifecycle)   (spawned, counted by the barrier)
//!   └─► registry.insert(thing, join)
//!
//! Full teardown: stop_all(true)
//!   ├─► state = ShuttingDown                (new creates are rejected)
//!   ├─► registry.remove_all()               (stop + join every thing)
//!   ├─► lifecycle.wait_idle()               (every producer confirmed exit)
//!   ├─► aggregator.drain_and_stop()         (drain channel, flush, close sink)
//!   ├─► state = Terminated
//!   └─► terminated token cancelled          (host process may exit)
//! ```
//!
//! ## Example
//! ```rust
//! use thingvisor::{Config, Supervisor, ThingKind};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = Supervisor::new(Config::default());
//!     sup.configure(tokio::io::sink()).await?;
//!
//!     let ids = sup.create(ThingKind::Light, 2).await?;
//!     assert_eq!(ids.len(), 2);
//!     assert_eq!(sup.roster().await.len(), 2);
//!
//!     let report = sup.stop_all(true).await?;
//!     assert_eq!(report.stopped.len(), 2);
//!     assert!(sup.is_terminated());
//!     Ok(())
//! }
//! ```

use std::mem;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncWrite;
use tokio::sync::RwLock;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, info};

use super::aggregator::{Aggregator, DrainReport};
use super::config::Config;
use super::lifecycle::Lifecycle;
use super::registry::Registry;
use crate::error::SupervisorError;
use crate::events::open_event_log;
use crate::things::{Thing, ThingId, ThingInfo, ThingKind};

/// Externally visible supervisor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No sink yet; things cannot be created.
    Unconfigured,
    /// Steady operating state.
    Configured,
    /// Full teardown in progress.
    ShuttingDown,
    /// Aggregator closed; nothing runs anymore.
    Terminated,
}

/// Internal state; the aggregator lives exactly as long as `Configured`.
enum State {
    Unconfigured,
    Configured(Aggregator),
    ShuttingDown,
    Terminated,
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            State::Unconfigured => Phase::Unconfigured,
            State::Configured(_) => Phase::Configured,
            State::ShuttingDown => Phase::ShuttingDown,
            State::Terminated => Phase::Terminated,
        }
    }
}

/// Outcome of [`Supervisor::stop_all`].
#[derive(Debug, Clone, Default)]
pub struct StopReport {
    /// Final descriptors of every thing that was stopped, sorted by id.
    pub stopped: Vec<ThingInfo>,
    /// Aggregator counters; set only by a full teardown of a configured supervisor.
    pub drain: Option<DrainReport>,
}

/// Coordinates things, the registry, the aggregator and shutdown.
pub struct Supervisor {
    cfg: Config,
    state: RwLock<State>,
    registry: Registry,
    lifecycle: Lifecycle,
    next_id: AtomicU64,
    terminated: CancellationToken,
}

impl Supervisor {
    /// Creates an unconfigured supervisor.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            state: RwLock::new(State::Unconfigured),
            registry: Registry::new(),
            lifecycle: Lifecycle::new(),
            next_id: AtomicU64::new(1),
            terminated: CancellationToken::new(),
        }
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Current phase of the state machine.
    pub async fn phase(&self) -> Phase {
        self.state.read().await.phase()
    }

    /// Wires the aggregator to `sink`. One-time; a second call fails with `AlreadyConfigured`.
    pub async fn configure<W>(&self, sink: W) -> Result<(), SupervisorError>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let mut state = self.state.write().await;
        match &*state {
            State::Unconfigured => {
                *state = State::Configured(Aggregator::spawn(
                    sink,
                    self.cfg.channel_capacity_clamped(),
                ));
                debug!("event sink configured");
                Ok(())
            }
            State::Configured(_) => Err(SupervisorError::AlreadyConfigured),
            State::ShuttingDown | State::Terminated => Err(SupervisorError::ShuttingDown),
        }
    }

    /// Opens the append-only event log at `path` and configures it as the sink.
    pub async fn configure_path(&self, path: impl AsRef<Path>) -> Result<(), SupervisorError> {
        match self.phase().await {
            Phase::Unconfigured => {}
            Phase::Configured => return Err(SupervisorError::AlreadyConfigured),
            Phase::ShuttingDown | Phase::Terminated => return Err(SupervisorError::ShuttingDown),
        }
        let file = open_event_log(path).await?;
        self.configure(file).await
    }

    /// Creates one thing of each kind when `Config::autostart` is set.
    pub async fn autostart(&self) -> Result<Vec<ThingId>, SupervisorError> {
        let mut ids = Vec::new();
        if !self.cfg.autostart {
            return Ok(ids);
        }
        for kind in ThingKind::ALL {
            ids.extend(self.create(kind, 1).await?);
        }
        Ok(ids)
    }

    /// Creates and starts `qty` things of `kind`, returning their ids.
    ///
    /// `qty == 0` creates nothing. `qty` above `Config::max_quantity` fails and creates nothing.
    pub async fn create(
        &self,
        kind: ThingKind,
        qty: usize,
    ) -> Result<Vec<ThingId>, SupervisorError> {
        if qty > self.cfg.max_quantity {
            return Err(SupervisorError::QuantityExceeded {
                requested: qty,
                max: self.cfg.max_quantity,
            });
        }

        // Held for the whole creation so a full teardown cannot interleave.
        let state = self.state.read().await;
        let aggregator = match &*state {
            State::Configured(agg) => agg,
            State::Unconfigured => return Err(SupervisorError::NotConfigured),
            State::ShuttingDown | State::Terminated => return Err(SupervisorError::ShuttingDown),
        };

        let mut ids = Vec::with_capacity(qty);
        for _ in 0..qty {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let thing = Thing::new(id, kind, self.cfg.delays_for(kind));
            let join = thing.start(aggregator.sender(), &self.lifecycle);
            if self.registry.insert(thing, join).await {
                ids.push(id);
            }
        }
        if !ids.is_empty() {
            info!(%kind, qty = ids.len(), first_id = ids[0], "things created");
        }
        Ok(ids)
    }

    /// Same as [`Supervisor::create`], with the kind given by name (`"b"`, `"inverter"`, ...).
    pub async fn create_named(
        &self,
        kind: &str,
        qty: usize,
    ) -> Result<Vec<ThingId>, SupervisorError> {
        let kind: ThingKind = kind.parse()?;
        self.create(kind, qty).await
    }

    /// Stops the thing with `id` and removes it from the roster.
    pub async fn stop_by_id(&self, id: ThingId) -> Result<ThingInfo, SupervisorError> {
        let info = self.registry.remove_by_id(id).await?;
        info!(thing_id = id, events = info.events, "thing stopped");
        Ok(info)
    }

    /// Stops every thing of `kind`.
    pub async fn stop_by_kind(&self, kind: ThingKind) -> Result<Vec<ThingInfo>, SupervisorError> {
        let stopped = self.registry.remove_by_kind(kind).await?;
        info!(%kind, count = stopped.len(), "things stopped by type");
        Ok(stopped)
    }

    /// Stops every thing.
    ///
    /// - `exit = false`: the aggregator and the sink stay open for further `create` calls.
    /// - `exit = true`: full teardown; afterwards the supervisor is `Terminated`.
    ///
    /// A second full teardown fails with `ShuttingDown`.
    pub async fn stop_all(&self, exit: bool) -> Result<StopReport, SupervisorError> {
        if !exit {
            let stopped = self.registry.remove_all().await;
            info!(count = stopped.len(), "all things stopped");
            return Ok(StopReport {
                stopped,
                drain: None,
            });
        }

        let prev = {
            let mut state = self.state.write().await;
            if matches!(*state, State::ShuttingDown | State::Terminated) {
                return Err(SupervisorError::ShuttingDown);
            }
            mem::replace(&mut *state, State::ShuttingDown)
        };
        info!("shutting down: stopping all things");

        let stopped = self.registry.remove_all().await;
        self.lifecycle.wait_idle().await;
        debug!(count = stopped.len(), "all emission loops exited");

        let drain = match prev {
            State::Configured(aggregator) => Some(aggregator.drain_and_stop().await),
            _ => None,
        };

        *self.state.write().await = State::Terminated;
        self.terminated.cancel();
        info!(things = stopped.len(), "supervisor terminated");

        Ok(StopReport { stopped, drain })
    }

    /// Descriptors of all running things, sorted by id.
    pub async fn roster(&self) -> Vec<ThingInfo> {
        self.registry.list().await
    }

    /// Completes once a full teardown finished.
    pub fn terminated(&self) -> WaitForCancellationFuture<'_> {
        self.terminated.cancelled()
    }

    /// Returns true once a full teardown finished.
    pub fn is_terminated(&self) -> bool {
        self.terminated.is_cancelled()
    }
}
