use crate::config::DEFAULT_LOG_FILTER;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// In-memory log sink. Holds formatted records while the terminal is in the
/// alternate screen so they can be written out after it is restored.
#[derive(Clone, Debug, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Writes everything buffered so far to `out` and empties the buffer.
    pub fn drain_into(&self, out: &mut impl Write) -> io::Result<()> {
        let bytes = match self.0.lock() {
            Ok(mut buf) => std::mem::take(&mut *buf),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        out.write_all(&bytes)?;
        out.flush()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().map(|buf| buf.is_empty()).unwrap_or(true)
    }
}

impl Write for LogBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self
            .0
            .lock()
            .map_err(|_| io::Error::other("log buffer lock poisoned"))?;
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs the global subscriber. With `buffered` set, records are held in
/// the returned [`LogBuffer`] instead of going straight to stderr.
pub fn init(buffered: bool) -> Option<LogBuffer> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());
    if buffered {
        let buffer = LogBuffer::default();
        builder.with_writer(buffer.clone()).init();
        Some(buffer)
    } else {
        builder.with_writer(io::stderr).init();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::info;

    #[test]
    fn test_buffer_holds_records_until_drained() {
        let buffer = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buffer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            info!("slider moved to {}", 41);
        });
        assert!(!buffer.is_empty());

        let mut out = Vec::new();
        buffer.drain_into(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("slider moved to 41"));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_of_empty_buffer_writes_nothing() {
        let mut out = Vec::new();
        LogBuffer::default().drain_into(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
