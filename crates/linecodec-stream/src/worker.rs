//! Decoder workers.
//!
//! Every worker pulls from the same work queue, so the receiver sits behind
//! an async mutex. The lock is held only while waiting for the next record,
//! never while decoding.

use crate::session::SessionCounters;
use linecodec_core::{DiagnosticLog, PipelineError, Record, RecordDecoder};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

/// The shared, multi-consumer end of the work queue.
pub(crate) type WorkQueue = Arc<Mutex<mpsc::Receiver<Record>>>;

/// Produces a fresh, empty value for each record.
pub type ValueFactory<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Why a worker stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerExit {
    /// Work queue closed and empty
    Drained,
    /// Decode failure reported on the error stream
    Failed,
    /// The value stream was dropped by the consumer
    Abandoned,
}

pub(crate) struct Worker<T> {
    pub id: usize,
    pub work: WorkQueue,
    pub decoder: Arc<dyn RecordDecoder<T>>,
    pub factory: ValueFactory<T>,
    pub values: mpsc::Sender<T>,
    pub errors: mpsc::Sender<PipelineError>,
    pub counters: Arc<SessionCounters>,
    pub diag: DiagnosticLog,
}

impl<T: Send + 'static> Worker<T> {
    async fn next_record(&self) -> Option<Record> {
        let mut rx = self.work.lock().await;
        rx.recv().await
    }

    /// Decode until the queue drains, the consumer goes away, or the first
    /// decode failure. A failing worker reports exactly one error.
    pub async fn run(self) -> WorkerExit {
        let exit = self.decode_loop().await;
        SessionCounters::incr(&self.counters.workers_finished);
        debug!("decoder {}: exiting ({:?})", self.id, exit);
        exit
    }

    async fn decode_loop(&self) -> WorkerExit {
        while let Some(record) = self.next_record().await {
            let mut value = (self.factory)();

            if let Err(source) = self.decoder.decode(record.as_bytes(), &mut value) {
                let err = PipelineError::Decode {
                    worker: self.id,
                    record: record.index(),
                    source,
                };
                error!("{} decoder failed: {err}", self.decoder.name());
                self.diag.log(format_args!("{err}"));
                SessionCounters::incr(&self.counters.decode_errors);
                // One slot per worker is reserved on the error queue.
                let _ = self.errors.send(err).await;
                return WorkerExit::Failed;
            }

            if self.values.send(value).await.is_err() {
                return WorkerExit::Abandoned;
            }
            SessionCounters::incr(&self.counters.values_decoded);
        }
        WorkerExit::Drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linecodec_core::{DecodeError, JsonDecoder, SharedBuffer};

    struct Harness {
        work_tx: mpsc::Sender<Record>,
        values_rx: mpsc::Receiver<serde_json::Value>,
        errors_rx: mpsc::Receiver<PipelineError>,
        counters: Arc<SessionCounters>,
        diag: SharedBuffer,
    }

    fn worker(
        id: usize,
        decoder: Arc<dyn RecordDecoder<serde_json::Value>>,
    ) -> (Worker<serde_json::Value>, Harness) {
        let (work_tx, work_rx) = mpsc::channel(16);
        let (values, values_rx) = mpsc::channel(16);
        let (errors, errors_rx) = mpsc::channel(2);
        let counters = Arc::new(SessionCounters::default());
        let diag = SharedBuffer::new();
        let w = Worker {
            id,
            work: Arc::new(Mutex::new(work_rx)),
            decoder,
            factory: Arc::new(|| serde_json::Value::Null),
            values,
            errors,
            counters: Arc::clone(&counters),
            diag: DiagnosticLog::new("[w] ", diag.clone()),
        };
        let h = Harness {
            work_tx,
            values_rx,
            errors_rx,
            counters,
            diag,
        };
        (w, h)
    }

    #[tokio::test]
    async fn drains_queue_in_dequeue_order() {
        let (w, mut h) = worker(0, Arc::new(JsonDecoder::<serde_json::Value>::new()));
        for (i, line) in ["{\"a\":1}\n", "{\"a\":2}\n"].iter().enumerate() {
            h.work_tx
                .send(Record::new(i as u64 + 1, line.as_bytes().to_vec()))
                .await
                .unwrap();
        }
        drop(h.work_tx);

        assert_eq!(w.run().await, WorkerExit::Drained);
        assert_eq!(h.values_rx.recv().await.unwrap()["a"], 1);
        assert_eq!(h.values_rx.recv().await.unwrap()["a"], 2);
        assert!(h.errors_rx.recv().await.is_none());
        assert_eq!(h.counters.snapshot().values_decoded, 2);
    }

    #[tokio::test]
    async fn stops_after_first_failure() {
        let (w, mut h) = worker(5, Arc::new(JsonDecoder::<serde_json::Value>::new()));
        for (i, line) in ["{\"a\":1}\n", "{bad\n", "{\"a\":3}\n"].iter().enumerate() {
            h.work_tx
                .send(Record::new(i as u64 + 1, line.as_bytes().to_vec()))
                .await
                .unwrap();
        }

        assert_eq!(w.run().await, WorkerExit::Failed);
        let err = h.errors_rx.recv().await.unwrap();
        assert_eq!(err.worker(), Some(5));
        assert_eq!(err.record_index(), Some(2));
        assert!(h.errors_rx.recv().await.is_none());

        // only the record before the bad one produced a value
        assert_eq!(h.values_rx.recv().await.unwrap()["a"], 1);
        assert!(h.values_rx.recv().await.is_none());
        assert!(h.diag.contents().starts_with("[w] decoder 5: record 2:"));

        let m = h.counters.snapshot();
        assert_eq!(m.decode_errors, 1);
        assert_eq!(m.workers_finished, 1);
    }

    #[tokio::test]
    async fn fresh_value_per_record() {
        let appending: Arc<dyn RecordDecoder<serde_json::Value>> = Arc::new(
            |raw: &[u8], v: &mut serde_json::Value| -> Result<(), DecodeError> {
                if !v.is_null() {
                    return Err(DecodeError::invalid("value was reused"));
                }
                *v = serde_json::Value::from(raw.len());
                Ok(())
            },
        );
        let (w, mut h) = worker(0, appending);
        for i in 1..=3u64 {
            h.work_tx.send(Record::new(i, b"xx\n".to_vec())).await.unwrap();
        }
        drop(h.work_tx);

        assert_eq!(w.run().await, WorkerExit::Drained);
        assert!(h.errors_rx.recv().await.is_none());
        let mut n = 0;
        while let Some(v) = h.values_rx.recv().await {
            assert_eq!(v, 3);
            n += 1;
        }
        assert_eq!(n, 3);
    }

    #[tokio::test]
    async fn dropped_value_stream_abandons() {
        let (w, h) = worker(0, Arc::new(JsonDecoder::<serde_json::Value>::new()));
        drop(h.values_rx);
        h.work_tx.send(Record::new(1, b"{}\n".to_vec())).await.unwrap();
        assert_eq!(w.run().await, WorkerExit::Abandoned);
    }
}
