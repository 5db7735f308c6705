//! # Thing registry: concurrency-safe index of running things.
//!
//! The registry maps [`ThingId`] to a handle holding the shared [`Thing`] and the
//! join handle of its emission task. It is the only component allowed to add or
//! remove entries; a thing never removes itself.
//!
//! ## Removal protocol
//! ```text
//! remove_by_id / remove_by_kind / remove_all
//!   ├─► write lock: take matching handles out of the map   (snapshot, short)
//!   ├─► unlock
//!   ├─► thing.stop() for every taken handle                (one-shot, idempotent)
//!   └─► join all emission tasks                            (slow part, no lock held)
//! ```
//!
//! ## Rules
//! - All map mutations happen under the single `RwLock`; waiting for loops to exit never does.
//! - A handle is taken out of the map exactly once, so a thing is never "removed twice"
//!   even when removals race; the loser observes `NotFound`.
//! - `list()` reads one consistent snapshot (no half-inserted entries).

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::SupervisorError;
use crate::things::{Thing, ThingExit, ThingId, ThingInfo, ThingKind};

/// Handle to a running thing.
struct Handle {
    /// Shared thing (stop signal, descriptor).
    thing: Arc<Thing>,
    /// Join handle of the emission task.
    join: JoinHandle<ThingExit>,
}

/// Index of running things.
#[derive(Default)]
pub struct Registry {
    things: RwLock<HashMap<ThingId, Handle>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a started thing under its id.
    ///
    /// Returns `false` (and stops the newcomer) if the id is already taken.
    pub async fn insert(&self, thing: Arc<Thing>, join: JoinHandle<ThingExit>) -> bool {
        let id = thing.id();
        let mut things = self.things.write().await;
        if things.contains_key(&id) {
            drop(things);
            warn!(thing_id = id, "thing id already registered; stopping duplicate");
            thing.stop();
            return false;
        }
        things.insert(id, Handle { thing, join });
        true
    }

    /// Stops and removes the thing with `id`, waiting for its loop to exit.
    pub async fn remove_by_id(&self, id: ThingId) -> Result<ThingInfo, SupervisorError> {
        let handle = {
            let mut things = self.things.write().await;
            things.remove(&id)
        };
        let Some(handle) = handle else {
            return Err(SupervisorError::NotFound { id });
        };
        let mut stopped = stop_and_join(vec![handle]).await;
        Ok(stopped.remove(0))
    }

    /// Stops and removes every thing of `kind`.
    ///
    /// Things registered while this call runs may or may not be included.
    pub async fn remove_by_kind(&self, kind: ThingKind) -> Result<Vec<ThingInfo>, SupervisorError> {
        let handles: Vec<Handle> = {
            let mut things = self.things.write().await;
            let ids: Vec<ThingId> = things
                .iter()
                .filter(|(_, h)| h.thing.kind() == kind)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter().filter_map(|id| things.remove(&id)).collect()
        };
        if handles.is_empty() {
            return Err(SupervisorError::NoMatches {
                kind: kind.as_str(),
            });
        }
        Ok(stop_and_join(handles).await)
    }

    /// Stops and removes every thing, returning once all their loops have exited.
    pub async fn remove_all(&self) -> Vec<ThingInfo> {
        let handles: Vec<Handle> = {
            let mut things = self.things.write().await;
            things.drain().map(|(_, h)| h).collect()
        };
        stop_and_join(handles).await
    }

    /// Returns descriptors of all registered things, sorted by id.
    pub async fn list(&self) -> Vec<ThingInfo> {
        let things = self.things.read().await;
        let mut rows: Vec<ThingInfo> = things.values().map(|h| h.thing.describe()).collect();
        rows.sort_unstable_by_key(|r| r.id);
        rows
    }

    /// Number of registered things.
    pub async fn len(&self) -> usize {
        self.things.read().await.len()
    }

    /// Returns true if no thing is registered.
    pub async fn is_empty(&self) -> bool {
        self.things.read().await.is_empty()
    }
}

/// Signals every handle first, then joins them all; returns final descriptors sorted by id.
async fn stop_and_join(handles: Vec<Handle>) -> Vec<ThingInfo> {
    for h in &handles {
        h.thing.stop();
    }

    let joins = handles.into_iter().map(|h| async move {
        match h.join.await {
            Ok(exit) => debug!(thing_id = h.thing.id(), ?exit, "thing removed"),
            Err(err) => warn!(thing_id = h.thing.id(), error = %err, "thing task ended abnormally"),
        }
        h.thing.describe()
    });
    let mut rows = join_all(joins).await;
    rows.sort_unstable_by_key(|r| r.id);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Lifecycle;
    use crate::events::ThingEvent;
    use crate::things::DelayRange;
    use tokio::sync::mpsc;

    struct Fixture {
        registry: Registry,
        lifecycle: Lifecycle,
        tx: mpsc::Sender<ThingEvent>,
        _rx: mpsc::Receiver<ThingEvent>,
    }

    impl Fixture {
        fn new() -> Self {
            let (tx, rx) = mpsc::channel(1024);
            Self {
                registry: Registry::new(),
                lifecycle: Lifecycle::new(),
                tx,
                _rx: rx,
            }
        }

        async fn add(&self, id: ThingId, kind: ThingKind) -> Arc<Thing> {
            let thing = Thing::new(id, kind, DelayRange::from_millis(1, 5));
            let join = thing.start(self.tx.clone(), &self.lifecycle);
            assert!(self.registry.insert(thing.clone(), join).await);
            thing
        }
    }

    #[tokio::test]
    async fn list_is_sorted_snapshot() {
        let f = Fixture::new();
        f.add(3, ThingKind::Light).await;
        f.add(1, ThingKind::BatteryPack).await;
        f.add(2, ThingKind::Inverter).await;

        let ids: Vec<_> = f.registry.list().await.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(f.registry.len().await, 3);

        f.registry.remove_all().await;
    }

    #[tokio::test]
    async fn remove_by_id_stops_and_forgets() {
        let f = Fixture::new();
        let thing = f.add(1, ThingKind::Inverter).await;
        f.add(2, ThingKind::Inverter).await;

        let info = f.registry.remove_by_id(1).await.unwrap();
        assert_eq!(info.id, 1);
        assert!(thing.is_stopped());
        assert_eq!(f.registry.len().await, 1);

        let err = f.registry.remove_by_id(1).await.unwrap_err();
        assert!(matches!(err, SupervisorError::NotFound { id: 1 }));

        f.registry.remove_all().await;
    }

    #[tokio::test]
    async fn remove_missing_id_on_empty_registry() {
        let registry = Registry::new();
        let err = registry.remove_by_id(999).await.unwrap_err();
        assert!(matches!(err, SupervisorError::NotFound { id: 999 }));
    }

    #[tokio::test]
    async fn remove_by_kind_only_touches_that_kind() {
        let f = Fixture::new();
        f.add(1, ThingKind::Light).await;
        f.add(2, ThingKind::BatteryPack).await;
        f.add(3, ThingKind::Light).await;

        let removed = f.registry.remove_by_kind(ThingKind::Light).await.unwrap();
        let ids: Vec<_> = removed.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);

        let left = f.registry.list().await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].kind, ThingKind::BatteryPack);

        let err = f.registry.remove_by_kind(ThingKind::Light).await.unwrap_err();
        assert!(matches!(err, SupervisorError::NoMatches { kind: "Light" }));

        f.registry.remove_all().await;
    }

    #[tokio::test]
    async fn remove_all_waits_for_every_loop() {
        let f = Fixture::new();
        for id in 1..=10 {
            f.add(id, ThingKind::ALL[(id % 3) as usize]).await;
        }

        let removed = f.registry.remove_all().await;
        assert_eq!(removed.len(), 10);
        assert!(f.registry.is_empty().await);
        // Every emission task already returned.
        f.lifecycle.wait_idle().await;
        assert_eq!(f.lifecycle.active(), 0);
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let f = Fixture::new();
        f.add(1, ThingKind::Light).await;

        let dup = Thing::new(1, ThingKind::Inverter, DelayRange::from_millis(1, 5));
        let join = dup.start(f.tx.clone(), &f.lifecycle);
        assert!(!f.registry.insert(dup.clone(), join).await);
        assert!(dup.is_stopped());
        assert_eq!(f.registry.list().await[0].kind, ThingKind::Light);

        f.registry.remove_all().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_removals_remove_once() {
        let f = Arc::new(Fixture::new());
        f.add(1, ThingKind::BatteryPack).await;

        let a = {
            let f = f.clone();
            tokio::spawn(async move { f.registry.remove_by_id(1).await })
        };
        let b = {
            let f = f.clone();
            tokio::spawn(async move { f.registry.remove_by_id(1).await })
        };
        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert!(f.registry.is_empty().await);
    }
}
