//! # Aggregator: single consumer of the shared event channel.
//!
//! The aggregator owns the receiving end of the event channel and the event sink.
//! It writes one JSON line per event, in the order events are received.
//!
//! ## Architecture
//! ```text
//! Thing 1 ──┐
//! Thing 2 ──┼──► mpsc (bounded) ──► aggregator task ──► BufWriter ──► sink
//! Thing N ──┘                            ▲
//!                                        └── stop token (drain_and_stop)
//! ```
//!
//! ## Teardown
//! ```text
//! drain_and_stop()
//!   ├─► stop.cancel()
//!   └─► aggregator task:
//!         ├─► rx.close()                 (only place the channel is ever closed)
//!         ├─► write every event still buffered in the channel
//!         ├─► flush, shutdown sink       (errors logged, counted)
//!         └─► return DrainReport          (join handle = completion handshake)
//! ```
//!
//! ## Rules
//! - Exactly one consumer: a single receiver imposes a total order on the sink.
//! - Serialization and write failures are logged and counted; the loop keeps consuming.
//! - Buffered output is flushed whenever the channel runs empty, and at teardown.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::select;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::events::ThingEvent;

/// Counters reported by the aggregator once it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Events written to the sink.
    pub written: u64,
    /// Events dropped because they could not be serialized.
    pub dropped: u64,
    /// Sink I/O failures (writes, flushes, close).
    pub failed: u64,
}

/// Handle to the running aggregator task.
pub struct Aggregator {
    tx: mpsc::Sender<ThingEvent>,
    stop: CancellationToken,
    worker: JoinHandle<DrainReport>,
}

impl Aggregator {
    /// Spawns the aggregator loop writing into `sink`.
    pub fn spawn<W>(sink: W, capacity: usize) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let stop = CancellationToken::new();
        let worker = tokio::spawn(run(rx, sink, stop.clone()));
        Self { tx, stop, worker }
    }

    /// Returns a producer handle for the shared channel.
    pub fn sender(&self) -> mpsc::Sender<ThingEvent> {
        self.tx.clone()
    }

    /// Stops the loop after everything already in the channel was written,
    /// then flushes and closes the sink.
    ///
    /// Callers must stop producers first; events sent after this returns are rejected
    /// by the closed channel.
    pub async fn drain_and_stop(self) -> DrainReport {
        self.stop.cancel();
        drop(self.tx);
        match self.worker.await {
            Ok(report) => report,
            Err(err) => {
                error!(error = %err, "aggregator task ended abnormally");
                DrainReport::default()
            }
        }
    }
}

async fn run<W>(mut rx: mpsc::Receiver<ThingEvent>, sink: W, stop: CancellationToken) -> DrainReport
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    let mut out = LineSink::new(sink);

    loop {
        select! {
            biased;
            _ = stop.cancelled() => break,
            ev = rx.recv() => match ev {
                Some(ev) => {
                    out.write_event(&ev).await;
                    if rx.is_empty() {
                        out.flush().await;
                    }
                }
                None => break,
            },
        }
    }

    rx.close();
    let mut drained = 0u64;
    while let Some(ev) = rx.recv().await {
        out.write_event(&ev).await;
        drained += 1;
    }
    debug!(drained, "event channel drained");

    let report = out.close().await;
    info!(
        written = report.written,
        dropped = report.dropped,
        failed = report.failed,
        "event sink closed"
    );
    report
}

/// Sink wrapper counting the bytes the inner writer accepted.
struct Counted<W> {
    inner: W,
    accepted: u64,
}

impl<W: AsyncWrite + Unpin> AsyncWrite for Counted<W> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let res = Pin::new(&mut self.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = res {
            self.accepted += n as u64;
        }
        res
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Buffered line writer that keeps every event on a line of its own.
///
/// A write that fails after part of the line reached the sink leaves a torn
/// fragment; the next event is prefixed with a newline to terminate it.
struct LineSink<W> {
    out: BufWriter<Counted<W>>,
    torn: bool,
    report: DrainReport,
}

impl<W: AsyncWrite + Unpin> LineSink<W> {
    fn new(sink: W) -> Self {
        Self::from_writer(BufWriter::new(Counted {
            inner: sink,
            accepted: 0,
        }))
    }

    fn from_writer(out: BufWriter<Counted<W>>) -> Self {
        Self {
            out,
            torn: false,
            report: DrainReport::default(),
        }
    }

    /// Bytes handed to the sink or sitting in the buffer.
    fn committed(&self) -> u64 {
        self.out.get_ref().accepted + self.out.buffer().len() as u64
    }

    async fn write_event(&mut self, ev: &ThingEvent) {
        let line = match ev.to_line() {
            Ok(line) => line,
            Err(err) => {
                error!(thing_id = ev.thing_id, error = %err, "encoding event as json; dropped");
                self.report.dropped += 1;
                return;
            }
        };

        if self.torn {
            if let Err(err) = self.out.write_all(b"\n").await {
                error!(thing_id = ev.thing_id, error = %err, "terminating torn line");
                self.report.failed += 1;
                return;
            }
            self.torn = false;
        }

        let before = self.committed();
        match self.out.write_all(&line).await {
            Ok(()) => self.report.written += 1,
            Err(err) => {
                self.torn = self.committed() != before;
                error!(
                    thing_id = ev.thing_id,
                    torn = self.torn,
                    error = %err,
                    "writing event to sink"
                );
                self.report.failed += 1;
            }
        }
    }

    async fn flush(&mut self) {
        if let Err(err) = self.out.flush().await {
            error!(error = %err, "error flushing event sink");
            self.report.failed += 1;
        }
    }

    async fn close(mut self) -> DrainReport {
        self.flush().await;
        if let Err(err) = self.out.shutdown().await {
            error!(error = %err, "error closing event sink");
            self.report.failed += 1;
        }
        self.report
    }
}
