//! # Lifecycle barrier for producer tasks.
//!
//! Counts every thing emission task from spawn to completion, so shutdown can wait
//! until all producers confirmed exit before the event channel is drained.
//!
//! ## Architecture
//! ```text
//! Thing::start() ──► Lifecycle::spawn(run) ──► TaskTracker (count += 1)
//!                                                   │
//!                    run() returns / panics ────────┘ (count -= 1, exactly once)
//!
//! Supervisor::stop_all(true)
//!   └─► Lifecycle::wait_idle(): close → wait until count == 0 → reopen
//! ```
//!
//! ## Rules
//! - Registration happens at spawn time, before the first tick of the loop.
//! - Deregistration is tied to the future being dropped, so it runs exactly once
//!   for every exit path (stop, closed channel, panic).
//! - `wait_idle` never holds a registry lock.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// Counting barrier shared by all emission tasks of one supervisor.
#[derive(Clone, Debug, Default)]
pub struct Lifecycle {
    tracker: TaskTracker,
}

impl Lifecycle {
    /// Creates an empty barrier.
    pub fn new() -> Self {
        Self {
            tracker: TaskTracker::new(),
        }
    }

    /// Spawns `fut` on the runtime and counts it until it completes.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(fut)
    }

    /// Number of tasks that have not exited yet.
    pub fn active(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until every tracked task has exited.
    ///
    /// The barrier is reopened afterwards so it can be reused.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
