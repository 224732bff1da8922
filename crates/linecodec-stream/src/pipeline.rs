//! `Pipeline`: configuration object and session coordinator.

use crate::session::{
    ErrorStream, Session, SessionCounters, SessionMonitor, SessionState, ValueStream,
};
use crate::splitter::run_splitter;
use crate::worker::{ValueFactory, Worker, WorkerExit};
use linecodec_core::{
    ConfigError, DiagnosticLog, JsonDecoder, PipelineConfig, PipelineError, Record,
    RecordDecoder,
};
use serde::de::DeserializeOwned;
use std::io::Write;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A reusable decode pipeline.
///
/// Holds the decoder and the diagnostic sink. Each call to
/// [`Pipeline::decode`] snapshots both, so `set_decoder` / `set_log_output`
/// only affect sessions started afterwards.
///
/// # Usage
/// ```no_run
/// # async fn example() {
/// use linecodec_core::PipelineConfig;
/// use linecodec_stream::Pipeline;
///
/// let pipeline = Pipeline::<serde_json::Value>::new(PipelineConfig::with_workers(4)).unwrap();
/// let input: &'static [u8] = b"{\"a\":1}\n{\"a\":2}\n";
/// let out = pipeline.decode(input, || serde_json::Value::Null).collect().await;
/// assert_eq!(out.values.len(), 2);
/// # }
/// ```
pub struct Pipeline<T> {
    config: PipelineConfig,
    decoder: Arc<dyn RecordDecoder<T>>,
    diag: DiagnosticLog,
}

impl<T> Pipeline<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Create a pipeline using the default JSON decoder.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        Self::with_decoder(config, JsonDecoder::<T>::new())
    }
}

impl<T: Send + 'static> Pipeline<T> {
    /// Create a pipeline with a custom decoder.
    pub fn with_decoder<D>(config: PipelineConfig, decoder: D) -> Result<Self, ConfigError>
    where
        D: RecordDecoder<T> + 'static,
    {
        config.validate()?;
        let diag = DiagnosticLog::discard(&config.log_prefix);
        Ok(Self {
            config,
            decoder: Arc::new(decoder),
            diag,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Name of the decoder future sessions will use.
    pub fn decoder_name(&self) -> &str {
        self.decoder.name()
    }

    /// Replace the decode strategy for future sessions.
    pub fn set_decoder<D>(&mut self, decoder: D)
    where
        D: RecordDecoder<T> + 'static,
    {
        self.decoder = Arc::new(decoder);
    }

    /// Send diagnostics of future sessions to `out`. The default discards them.
    pub fn set_log_output<W>(&mut self, out: W)
    where
        W: Write + Send + 'static,
    {
        self.diag = DiagnosticLog::new(&self.config.log_prefix, out);
    }

    /// Start a session over `input`. Returns immediately.
    ///
    /// `factory` is called once per record to produce the value the decoder
    /// fills in. Must be called from within a Tokio runtime; on a
    /// multi-thread runtime the workers decode in parallel.
    pub fn decode<R, F>(&self, input: R, factory: F) -> Session<T>
    where
        R: AsyncRead + Send + Unpin + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let workers = self.config.workers;
        let (work_tx, work_rx) = mpsc::channel(self.config.work_capacity());
        let (values_tx, values_rx) = mpsc::channel(self.config.result_capacity());
        let (errors_tx, errors_rx) = mpsc::channel(self.config.error_capacity());
        let (state_tx, state_rx) = watch::channel(SessionState::Created);
        let counters = Arc::new(SessionCounters::default());

        let work = Arc::new(Mutex::new(work_rx));
        let factory: ValueFactory<T> = Arc::new(factory);
        let pool: Vec<Worker<T>> = (0..workers)
            .map(|id| Worker {
                id,
                work: Arc::clone(&work),
                decoder: Arc::clone(&self.decoder),
                factory: Arc::clone(&factory),
                values: values_tx.clone(),
                errors: errors_tx.clone(),
                counters: Arc::clone(&counters),
                diag: self.diag.clone(),
            })
            .collect();
        drop(work);

        let supervisor = Supervisor {
            values: values_tx,
            errors: errors_tx,
            state: state_tx,
            counters: Arc::clone(&counters),
            diag: self.diag.clone(),
        };
        tokio::spawn(supervisor.run(input, work_tx, pool));

        Session::new(
            ValueStream::new(values_rx),
            ErrorStream::new(errors_rx),
            SessionMonitor::new(state_rx, counters),
        )
    }
}

impl<T> std::fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("decoder", &self.decoder.name())
            .field("diag", &self.diag)
            .finish()
    }
}

/// Owns the primary output senders and closes them once every task is done.
struct Supervisor<T> {
    values: mpsc::Sender<T>,
    errors: mpsc::Sender<PipelineError>,
    state: watch::Sender<SessionState>,
    counters: Arc<SessionCounters>,
    diag: DiagnosticLog,
}

impl<T: Send + 'static> Supervisor<T> {
    async fn run<R>(self, input: R, work: mpsc::Sender<Record>, pool: Vec<Worker<T>>)
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let workers = pool.len();
        self.set_state(SessionState::Running);
        info!("session starting with {} workers", workers);

        let handles: Vec<(usize, JoinHandle<WorkerExit>)> = pool
            .into_iter()
            .map(|w| (w.id, tokio::spawn(w.run())))
            .collect();

        let splitter = tokio::spawn(run_splitter(
            input,
            work,
            self.errors.clone(),
            Arc::clone(&self.counters),
            self.diag.clone(),
        ));
        if let Err(e) = splitter.await {
            // A panicking reader never got to report; surface it as a read failure.
            let err = PipelineError::Read {
                source: std::io::Error::other(format!("splitter task failed: {e}")),
            };
            error!("{err}");
            self.diag.log(format_args!("{err}"));
            SessionCounters::incr(&self.counters.read_errors);
            let _ = self.errors.send(err).await;
        }
        self.set_state(SessionState::Draining);

        for (id, handle) in handles {
            match handle.await {
                Ok(exit) => debug!("decoder {id}: joined ({exit:?})"),
                Err(e) if e.is_panic() => {
                    let err = PipelineError::WorkerPanicked { worker: id };
                    error!("{err}");
                    self.diag.log(format_args!("{err}"));
                    SessionCounters::incr(&self.counters.decode_errors);
                    SessionCounters::incr(&self.counters.workers_finished);
                    let _ = self.errors.send(err).await;
                }
                Err(e) => warn!("decoder {id}: join failed: {e}"),
            }
        }

        let Supervisor {
            values,
            errors,
            state,
            counters,
            ..
        } = self;
        drop(values);
        drop(errors);

        let m = counters.snapshot();
        info!(
            "session closed: {} records, {} decoded, {} decode errors, {} read errors",
            m.records_read, m.values_decoded, m.decode_errors, m.read_errors
        );
        state.send_replace(SessionState::Closed);
    }

    fn set_state(&self, next: SessionState) {
        let prev = self.state.send_replace(next);
        debug!("session state {prev} -> {next}");
    }
}

/// Decode newline-delimited JSON from `input` with `workers` concurrent
/// decoders, using a default-configured pipeline.
///
/// A `workers` of 0 is treated as 1.
pub fn decode<T, R, F>(input: R, workers: usize, factory: F) -> Session<T>
where
    T: DeserializeOwned + Send + 'static,
    R: AsyncRead + Send + Unpin + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    if workers == 0 {
        warn!("decode called with 0 workers, using 1");
    }
    let config = PipelineConfig::with_workers(workers.max(1));
    let pipeline = Pipeline {
        decoder: Arc::new(JsonDecoder::<T>::new()),
        diag: DiagnosticLog::discard(&config.log_prefix),
        config,
    };
    pipeline.decode(input, factory)
}
