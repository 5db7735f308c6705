//! # Thing: one simulated device and its emission loop.
//!
//! A [`Thing`] owns its identity, a stop signal and an emitted-events counter.
//! Its emission loop is a single generic driver parameterized by the kind's
//! [`Telemetry`] payload; the three kinds share the coordination logic.
//!
//! ## Emission loop
//! ```text
//! Thing::start() ──► lifecycle.spawn(run())          (registered before the first tick)
//!
//! loop {
//!   ├─► delay = random in kind's [min, max]
//!   ├─► select (biased) { stop.cancelled() → exit,  sleep(delay) → continue }
//!   ├─► payload = T::sample(); event = ThingEvent::now(id, seq, payload)
//!   ├─► select (biased) { stop.cancelled() → exit,  out.send(event) }
//!   │        └─ send error (channel closed by aggregator) → exit
//!   └─► emitted += 1
//! }
//! (future completes → lifecycle deregisters)
//! ```
//!
//! ## Rules
//! - The stop branch is polled **first** on every wait, so a ready timer can never starve it.
//! - Once the stop signal fired, no further event is sent.
//! - `stop()` is a one-shot broadcast: calling it again is a no-op and never blocks.
//! - The counter only moves after the channel accepted the event.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{select, sync::mpsc, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::kind::{DelayRange, ThingKind};
use super::random;
use super::telemetry::{BatteryPack, Inverter, Light, Telemetry};
use crate::core::Lifecycle;
use crate::events::ThingEvent;

/// Numeric thing identifier, unique for the lifetime of a supervisor.
pub type ThingId = u64;

/// Short descriptor of a running thing (one roster row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThingInfo {
    /// Thing id.
    pub id: ThingId,
    /// Thing kind.
    pub kind: ThingKind,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Events emitted so far.
    pub events: u64,
}

/// Why an emission loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThingExit {
    /// The stop signal fired.
    Stopped,
    /// The shared channel was closed by the aggregator.
    ChannelClosed,
}

/// A simulated device.
///
/// Shared as `Arc<Thing>` between the registry (which stops it and reads its
/// descriptor) and its own emission task.
#[derive(Debug)]
pub struct Thing {
    id: ThingId,
    kind: ThingKind,
    created_at: DateTime<Utc>,
    delays: DelayRange,
    emitted: AtomicU64,
    stop: CancellationToken,
}

impl Thing {
    /// Creates a thing that is not yet emitting.
    pub fn new(id: ThingId, kind: ThingKind, delays: DelayRange) -> Arc<Self> {
        Arc::new(Self {
            id,
            kind,
            created_at: Utc::now(),
            delays,
            emitted: AtomicU64::new(0),
            stop: CancellationToken::new(),
        })
    }

    /// Thing id.
    pub fn id(&self) -> ThingId {
        self.id
    }

    /// Thing kind.
    pub fn kind(&self) -> ThingKind {
        self.kind
    }

    /// Number of events accepted by the shared channel so far.
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Acquire)
    }

    /// Starts the emission loop as an independent task tracked by `lifecycle`.
    ///
    /// The task is counted by the lifecycle barrier from this call until the loop
    /// returns, whatever the exit reason.
    pub fn start(
        self: &Arc<Self>,
        out: mpsc::Sender<ThingEvent>,
        lifecycle: &Lifecycle,
    ) -> JoinHandle<ThingExit> {
        let me = Arc::clone(self);
        lifecycle.spawn(me.run(out))
    }

    /// Runs the emission loop until stopped or until the channel closes.
    ///
    /// Blocks the calling task for the thing's whole lifetime; prefer [`Thing::start`].
    pub async fn run(self: Arc<Self>, out: mpsc::Sender<ThingEvent>) -> ThingExit {
        debug!(thing_id = self.id, kind = %self.kind, "thing started");
        let exit = match self.kind {
            ThingKind::BatteryPack => self.emit_loop::<BatteryPack>(&out).await,
            ThingKind::Inverter => self.emit_loop::<Inverter>(&out).await,
            ThingKind::Light => self.emit_loop::<Light>(&out).await,
        };
        debug!(
            thing_id = self.id,
            kind = %self.kind,
            events = self.emitted(),
            ?exit,
            "thing exited"
        );
        exit
    }

    async fn emit_loop<T: Telemetry>(&self, out: &mpsc::Sender<ThingEvent>) -> ThingExit {
        debug_assert_eq!(T::KIND, self.kind);

        loop {
            let delay = random::delay(self.delays);
            select! {
                biased;
                _ = self.stop.cancelled() => return ThingExit::Stopped,
                _ = time::sleep(delay) => {}
            }

            let seq = self.emitted() + 1;
            let event = ThingEvent::now(self.id, seq, T::sample().into_payload());

            select! {
                biased;
                _ = self.stop.cancelled() => return ThingExit::Stopped,
                res = out.send(event) => {
                    if res.is_err() {
                        warn!(thing_id = self.id, "event channel closed; thing exiting");
                        return ThingExit::ChannelClosed;
                    }
                }
            }
            self.emitted.fetch_add(1, Ordering::AcqRel);
        }
    }

    /// Requests the emission loop to exit.
    ///
    /// Safe from any task, any number of times; only the first call has an effect.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Returns true once [`Thing::stop`] has been called.
    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Returns the current descriptor without synchronizing with the emission loop.
    pub fn describe(&self) -> ThingInfo {
        ThingInfo {
            id: self.id,
            kind: self.kind,
            created_at: self.created_at,
            events: self.emitted(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast() -> DelayRange {
        DelayRange::from_millis(1, 5)
    }

    #[tokio::test]
    async fn counter_tracks_accepted_events() {
        let lifecycle = Lifecycle::new();
        let (tx, mut rx) = mpsc::channel(16);
        let thing = Thing::new(1, ThingKind::Inverter, fast());
        let join = thing.start(tx, &lifecycle);

        let mut last_seq = 0;
        for _ in 0..10 {
            let ev = rx.recv().await.unwrap();
            assert_eq!(ev.thing_id, 1);
            assert_eq!(ev.kind, ThingKind::Inverter);
            assert_eq!(ev.seq, last_seq + 1);
            last_seq = ev.seq;
        }

        thing.stop();
        assert_eq!(join.await.unwrap(), ThingExit::Stopped);

        // Everything counted was delivered, and nothing is sent after stop.
        let mut received = 10;
        while let Ok(ev) = rx.try_recv() {
            assert_eq!(ev.seq, last_seq + 1);
            last_seq = ev.seq;
            received += 1;
        }
        assert_eq!(thing.emitted(), received);
        assert_eq!(thing.describe().events, received);
    }

    #[tokio::test]
    async fn per_thing_timestamps_are_ordered() {
        let lifecycle = Lifecycle::new();
        let (tx, mut rx) = mpsc::channel(16);
        let thing = Thing::new(5, ThingKind::BatteryPack, fast());
        let join = thing.start(tx, &lifecycle);

        let mut prev = rx.recv().await.unwrap();
        for _ in 0..5 {
            let ev = rx.recv().await.unwrap();
            assert!(ev.ts >= prev.ts);
            assert!(ev.seq > prev.seq);
            prev = ev;
        }
        thing.stop();
        join.await.unwrap();
    }

    #[tokio::test]
    async fn double_stop_is_harmless() {
        let lifecycle = Lifecycle::new();
        let (tx, _rx) = mpsc::channel(4);
        let thing = Thing::new(2, ThingKind::Light, ThingKind::Light.default_delays());
        let join = thing.start(tx, &lifecycle);

        thing.stop();
        thing.stop();
        assert!(thing.is_stopped());
        let exit = time::timeout(Duration::from_secs(1), join).await.unwrap().unwrap();
        assert_eq!(exit, ThingExit::Stopped);
        thing.stop();
    }

    #[tokio::test]
    async fn stop_unblocks_a_full_channel() {
        let lifecycle = Lifecycle::new();
        let (tx, _rx) = mpsc::channel(1);
        let thing = Thing::new(3, ThingKind::BatteryPack, fast());
        let join = thing.start(tx, &lifecycle);

        // Let it fill the single slot and block on the next send.
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(thing.emitted(), 1);

        thing.stop();
        let exit = time::timeout(Duration::from_secs(1), join).await.unwrap().unwrap();
        assert_eq!(exit, ThingExit::Stopped);
        assert_eq!(thing.emitted(), 1);
    }

    #[tokio::test]
    async fn closed_channel_ends_the_loop() {
        let lifecycle = Lifecycle::new();
        let (tx, mut rx) = mpsc::channel(4);
        rx.close();
        let thing = Thing::new(4, ThingKind::Inverter, fast());
        let join = thing.start(tx, &lifecycle);

        let exit = time::timeout(Duration::from_secs(1), join).await.unwrap().unwrap();
        assert_eq!(exit, ThingExit::ChannelClosed);
        assert_eq!(thing.emitted(), 0);
    }

    #[tokio::test]
    async fn describe_reports_identity() {
        let thing = Thing::new(42, ThingKind::Light, fast());
        let info = thing.describe();
        assert_eq!(info.id, 42);
        assert_eq!(info.kind, ThingKind::Light);
        assert_eq!(info.events, 0);
        assert!(info.created_at <= Utc::now());
    }

    #[tokio::test]
    async fn stop_wins_over_a_ready_timer() {
        let lifecycle = Lifecycle::new();
        let (tx, mut rx) = mpsc::channel(100_000);
        let things: Vec<_> = (1..=20)
            .map(|id| Thing::new(id, ThingKind::Light, DelayRange::from_millis(0, 0)))
            .collect();
        let joins: Vec<_> = things
            .iter()
            .map(|t| t.start(tx.clone(), &lifecycle))
            .collect();
        drop(tx);

        time::sleep(Duration::from_millis(30)).await;

        // Single-threaded runtime: no loop runs between these stops and the joins,
        // so any event after stop() would be a timer branch beating the stop branch.
        let at_stop: Vec<u64> = things
            .iter()
            .map(|t| {
                t.stop();
                t.emitted()
            })
            .collect();

        for join in joins {
            let exit = time::timeout(Duration::from_secs(1), join)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(exit, ThingExit::Stopped);
        }

        let mut received = std::collections::HashMap::<ThingId, u64>::new();
        while let Some(ev) = rx.recv().await {
            *received.entry(ev.thing_id).or_default() += 1;
        }
        for (thing, stopped_at) in things.iter().zip(at_stop) {
            assert_eq!(thing.emitted(), stopped_at);
            assert_eq!(received.get(&thing.id()).copied().unwrap_or(0), stopped_at);
        }
    }
}
