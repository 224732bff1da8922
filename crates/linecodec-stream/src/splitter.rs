//! Splitter: turns the input byte stream into `Record`s on the work queue.

use crate::session::SessionCounters;
use linecodec_core::{DiagnosticLog, PipelineError, Record, DELIMITER};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// How the splitter stopped without a read error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SplitEnd {
    /// Reached end of input
    Eof,
    /// Every worker exited before the input was exhausted
    NoWorkers,
}

/// Read `\n`-terminated records from `reader` and push them onto `work`.
///
/// A trailing fragment with no delimiter is counted in `bytes_read` but
/// never queued. Records are numbered from 1 in input order.
pub(crate) async fn split_records<R>(
    reader: R,
    work: &mpsc::Sender<Record>,
    counters: &SessionCounters,
) -> std::io::Result<SplitEnd>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut index = 0u64;

    loop {
        let mut line = Vec::new();
        let n = reader.read_until(DELIMITER, &mut line).await?;
        if n == 0 {
            return Ok(SplitEnd::Eof);
        }
        SessionCounters::add(&counters.bytes_read, n as u64);

        if line.last() != Some(&DELIMITER) {
            debug!("dropping {} byte trailing fragment without delimiter", n);
            return Ok(SplitEnd::Eof);
        }

        index += 1;
        if work.send(Record::new(index, line)).await.is_err() {
            return Ok(SplitEnd::NoWorkers);
        }
        SessionCounters::incr(&counters.records_read);
    }
}

/// Splitter task body: split, report a read failure once, then close the
/// work queue by dropping its sender.
pub(crate) async fn run_splitter<R>(
    reader: R,
    work: mpsc::Sender<Record>,
    errors: mpsc::Sender<PipelineError>,
    counters: Arc<SessionCounters>,
    diag: DiagnosticLog,
) where
    R: AsyncRead + Unpin,
{
    match split_records(reader, &work, &counters).await {
        Ok(SplitEnd::Eof) => {
            debug!(
                "splitter: end of input after {} records",
                counters.snapshot().records_read
            );
        }
        Ok(SplitEnd::NoWorkers) => {
            warn!("splitter: all workers exited, stopping before end of input");
        }
        Err(source) => {
            let err = PipelineError::Read { source };
            error!("splitter: {err}");
            diag.log(format_args!("{err}"));
            SessionCounters::incr(&counters.read_errors);
            // The error queue has a slot reserved for the reader.
            let _ = errors.send(err).await;
        }
    }
    drop(work);
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn split_all(input: &'static [u8], capacity: usize) -> (Vec<Record>, SplitEnd, u64) {
        let (tx, mut rx) = mpsc::channel(capacity);
        let counters = SessionCounters::default();
        let end = split_records(input, &tx, &counters).await.unwrap();
        drop(tx);
        let mut records = Vec::new();
        while let Some(r) = rx.recv().await {
            records.push(r);
        }
        (records, end, counters.snapshot().bytes_read)
    }

    #[tokio::test]
    async fn splits_on_newline_keeping_delimiter() {
        let (records, end, bytes) = split_all(b"{\"a\":1}\n{\"a\":2}\n", 8).await;
        assert_eq!(end, SplitEnd::Eof);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].as_bytes(), b"{\"a\":1}\n");
        assert_eq!(records[0].index(), 1);
        assert_eq!(records[1].index(), 2);
        assert_eq!(bytes, 16);
    }

    #[tokio::test]
    async fn empty_input_yields_nothing() {
        let (records, end, bytes) = split_all(b"", 1).await;
        assert!(records.is_empty());
        assert_eq!(end, SplitEnd::Eof);
        assert_eq!(bytes, 0);
    }

    #[tokio::test]
    async fn trailing_fragment_is_dropped() {
        let (records, _, bytes) = split_all(b"one\ntwo\nthr", 8).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].as_bytes(), b"two\n");
        // the fragment was read, just not queued
        assert_eq!(bytes, 11);
    }

    #[tokio::test]
    async fn empty_lines_are_records() {
        let (records, _, _) = split_all(b"\n\nx\n", 8).await;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].as_bytes(), b"\n");
        assert_eq!(records[2].index(), 3);
    }

    #[tokio::test]
    async fn stops_when_queue_has_no_consumer() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let counters = SessionCounters::default();
        let end = split_records(&b"a\nb\n"[..], &tx, &counters).await.unwrap();
        assert_eq!(end, SplitEnd::NoWorkers);
        assert_eq!(counters.snapshot().records_read, 0);
    }
}
