//! Session handles: the two output streams and the lifecycle monitor.

use futures::Stream;
use linecodec_core::{PipelineError, SessionMetrics};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, watch};

/// Lifecycle of one decode session.
///
/// `Created → Running → Draining → Closed`. `Closed` is terminal: both
/// output streams have ended and nothing more will be emitted. States are
/// ordered, so `state >= SessionState::Draining` means input has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SessionState {
    /// Queues built, tasks not yet started
    Created,
    /// Splitter and workers active
    Running,
    /// Input finished, workers still draining the queue
    Draining,
    /// All tasks done, output streams closed
    Closed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        self == Self::Closed
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Live counters shared by the splitter, workers and supervisor.
#[derive(Debug, Default)]
pub(crate) struct SessionCounters {
    pub records_read: AtomicU64,
    pub bytes_read: AtomicU64,
    pub values_decoded: AtomicU64,
    pub decode_errors: AtomicU64,
    pub read_errors: AtomicU64,
    pub workers_finished: AtomicU64,
}

impl SessionCounters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SessionMetrics {
        SessionMetrics {
            records_read: self.records_read.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            values_decoded: self.values_decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            workers_finished: self.workers_finished.load(Ordering::Relaxed),
        }
    }
}

/// Observes a session's state and counters without consuming its streams.
#[derive(Debug, Clone)]
pub struct SessionMonitor {
    state: watch::Receiver<SessionState>,
    counters: Arc<SessionCounters>,
}

impl SessionMonitor {
    pub(crate) fn new(state: watch::Receiver<SessionState>, counters: Arc<SessionCounters>) -> Self {
        Self { state, counters }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Returns a snapshot of current metrics.
    pub fn metrics(&self) -> SessionMetrics {
        self.counters.snapshot()
    }

    /// Wait until the session reaches `target` or any later state, and
    /// return the state observed.
    ///
    /// Also returns if the supervisor went away first; the output streams
    /// are closed in that case too.
    pub async fn wait_until(&self, target: SessionState) -> SessionState {
        let mut rx = self.state.clone();
        let reached = rx.wait_for(|s| *s >= target).await.map(|s| *s);
        reached.unwrap_or_else(|_| *rx.borrow())
    }

    /// Wait until the session is `Closed`.
    pub async fn wait_closed(&self) -> SessionState {
        self.wait_until(SessionState::Closed).await
    }
}

/// Decoded values, in completion order. Ends when the session closes.
#[derive(Debug)]
pub struct ValueStream<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> ValueStream<T> {
    pub(crate) fn new(rx: mpsc::Receiver<T>) -> Self {
        Self { rx }
    }

    /// Receive the next value, or `None` once the session is closed and drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

impl<T> Stream for ValueStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

/// Read and decode failures. Ends when the session closes.
#[derive(Debug)]
pub struct ErrorStream {
    rx: mpsc::Receiver<PipelineError>,
}

impl ErrorStream {
    pub(crate) fn new(rx: mpsc::Receiver<PipelineError>) -> Self {
        Self { rx }
    }

    pub async fn recv(&mut self) -> Option<PipelineError> {
        self.rx.recv().await
    }
}

impl Stream for ErrorStream {
    type Item = PipelineError;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

/// Everything a session produced, gathered by [`Session::collect`].
#[derive(Debug)]
pub struct SessionOutput<T> {
    pub values: Vec<T>,
    pub errors: Vec<PipelineError>,
    pub metrics: SessionMetrics,
}

/// One running decode: the value stream, the error stream and a monitor.
///
/// Both streams must be drained (or dropped) for the session to finish;
/// a consumer that stops reading while keeping a stream alive stalls the
/// pipeline once the bounded queues fill up.
#[derive(Debug)]
pub struct Session<T> {
    values: ValueStream<T>,
    errors: ErrorStream,
    monitor: SessionMonitor,
}

impl<T> Session<T> {
    pub(crate) fn new(values: ValueStream<T>, errors: ErrorStream, monitor: SessionMonitor) -> Self {
        Self {
            values,
            errors,
            monitor,
        }
    }

    pub fn monitor(&self) -> SessionMonitor {
        self.monitor.clone()
    }

    /// Hand out the two streams separately.
    pub fn split(self) -> (ValueStream<T>, ErrorStream) {
        (self.values, self.errors)
    }

    /// Drain both streams concurrently and wait for the session to close.
    pub async fn collect(self) -> SessionOutput<T> {
        let Session {
            mut values,
            mut errors,
            monitor,
        } = self;

        let (values, errors) = tokio::join!(
            async {
                let mut out = Vec::new();
                while let Some(v) = values.recv().await {
                    out.push(v);
                }
                out
            },
            async {
                let mut out = Vec::new();
                while let Some(e) = errors.recv().await {
                    out.push(e);
                }
                out
            }
        );

        monitor.wait_closed().await;
        SessionOutput {
            values,
            errors,
            metrics: monitor.metrics(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_is_the_only_terminal_state() {
        assert!(SessionState::Closed.is_terminal());
        assert!(!SessionState::Draining.is_terminal());
        assert_eq!(SessionState::Draining.to_string(), "draining");
    }

    #[tokio::test]
    async fn wait_closed_returns_when_supervisor_disappears() {
        let (tx, rx) = watch::channel(SessionState::Running);
        let monitor = SessionMonitor::new(rx, Arc::new(SessionCounters::default()));
        drop(tx);
        assert_eq!(monitor.wait_closed().await, SessionState::Running);
    }

    #[tokio::test]
    async fn wait_until_accepts_later_states() {
        let (tx, rx) = watch::channel(SessionState::Created);
        let monitor = SessionMonitor::new(rx, Arc::new(SessionCounters::default()));
        tx.send_replace(SessionState::Closed);
        assert_eq!(monitor.wait_until(SessionState::Draining).await, SessionState::Closed);
        assert!(SessionState::Running < SessionState::Draining);
    }

    #[tokio::test]
    async fn value_stream_ends_when_sender_dropped() {
        use futures::StreamExt;

        let (tx, rx) = mpsc::channel(4);
        let mut stream = ValueStream::new(rx);
        tx.send(1u32).await.unwrap();
        tx.send(2u32).await.unwrap();
        drop(tx);
        let got: Vec<u32> = (&mut stream).collect().await;
        assert_eq!(got, vec![1, 2]);
        assert!(stream.recv().await.is_none());
    }
}
