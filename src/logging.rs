use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriter;

use crate::error::VsqlError;

/// Where formatted log lines go: usually the host's console print function.
pub type HostSink = Arc<dyn Fn(&str) + Send + Sync>;

/// `MakeWriter` that hands each formatted event to a [`HostSink`] as one line.
#[derive(Clone)]
pub struct HostConsoleWriter {
    sink: HostSink,
}

impl HostConsoleWriter {
    pub fn new(sink: HostSink) -> Self {
        Self { sink }
    }
}

impl fmt::Debug for HostConsoleWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostConsoleWriter").finish_non_exhaustive()
    }
}

/// Buffers one event and emits it when dropped.
pub struct HostLineGuard {
    sink: HostSink,
    buf: Vec<u8>,
}

impl HostLineGuard {
    fn emit(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.buf);
        for line in text.lines().filter(|l| !l.is_empty()) {
            (self.sink)(line);
        }
        self.buf.clear();
    }
}

impl<'a> MakeWriter<'a> for HostConsoleWriter {
    type Writer = HostLineGuard;

    fn make_writer(&'a self) -> Self::Writer {
        HostLineGuard {
            sink: Arc::clone(&self.sink),
            buf: Vec::new(),
        }
    }
}

impl Write for HostLineGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit();
        Ok(())
    }
}

impl Drop for HostLineGuard {
    fn drop(&mut self) {
        self.emit();
    }
}

/// Plain-text fmt subscriber (timestamp, level, message and fields) writing
/// to `sink`.
pub fn host_subscriber(
    sink: HostSink,
    max_level: Level,
) -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .with_writer(HostConsoleWriter::new(sink))
        .with_ansi(false)
        .with_target(false)
        .with_max_level(max_level)
        .finish()
}

/// Install [`host_subscriber`] as the process-wide default.
///
/// # Errors
/// Returns `VsqlError::ConfigError` if a global subscriber is already set.
pub fn init_host_logging(sink: HostSink, max_level: Level) -> Result<(), VsqlError> {
    tracing::subscriber::set_global_default(host_subscriber(sink, max_level))
        .map_err(|e| VsqlError::ConfigError(format!("logging already initialised: {e}")))
}
