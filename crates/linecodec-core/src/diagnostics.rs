//! Caller-facing diagnostic sink.
//!
//! Separate from `tracing`: a pipeline writes short prefixed lines such as
//! `[linecodec] decoder 2: ...` to whatever writer the caller configured.
//! The default sink discards everything.

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Cheaply cloneable handle to a diagnostic writer.
#[derive(Clone)]
pub struct DiagnosticLog {
    prefix: Arc<str>,
    out: SharedWriter,
}

impl DiagnosticLog {
    pub fn new<W: Write + Send + 'static>(prefix: impl AsRef<str>, out: W) -> Self {
        Self {
            prefix: Arc::from(prefix.as_ref()),
            out: Arc::new(Mutex::new(Box::new(out))),
        }
    }

    /// A sink that drops every line.
    pub fn discard(prefix: impl AsRef<str>) -> Self {
        Self::new(prefix, std::io::sink())
    }

    /// Write one line. Write failures are ignored; diagnostics never fail a session.
    pub fn log(&self, args: fmt::Arguments<'_>) {
        let Ok(mut out) = self.out.lock() else {
            return;
        };
        let _ = writeln!(out, "{}{}", self.prefix, args);
        let _ = out.flush();
    }
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::discard("[linecodec] ")
    }
}

impl fmt::Debug for DiagnosticLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticLog")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// An in-memory writer that can be shared with a `DiagnosticLog` and read back.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        match self.0.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => String::new(),
        }
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.0.lock() {
            Ok(mut inner) => {
                inner.extend_from_slice(buf);
                Ok(buf.len())
            }
            Err(_) => Err(std::io::Error::other("diagnostic buffer poisoned")),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_prefixed() {
        let buf = SharedBuffer::new();
        let log = DiagnosticLog::new("[test] ", buf.clone());
        log.log(format_args!("decoder {}: {}", 1, "boom"));
        log.log(format_args!("readlines: eof"));
        assert_eq!(buf.contents(), "[test] decoder 1: boom\n[test] readlines: eof\n");
    }

    #[test]
    fn clones_share_one_writer() {
        let buf = SharedBuffer::new();
        let log = DiagnosticLog::new("[w] ", buf.clone());
        log.clone().log(format_args!("first"));
        log.log(format_args!("second"));
        assert_eq!(buf.contents(), "[w] first\n[w] second\n");
    }

    #[test]
    fn discard_sink_accepts_writes() {
        let log = DiagnosticLog::default();
        log.log(format_args!("nobody hears this"));
        assert!(format!("{log:?}").contains("[linecodec] "));
    }
}
