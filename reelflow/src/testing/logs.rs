//! In-memory log capture.

use parking_lot::Mutex;
use serde_json::Value;
use std::io;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

/// A log writer that keeps everything in memory.
///
/// Pass it to [`crate::observability::subscriber`] and install the result
/// with `tracing::subscriber::set_default` to inspect what a test logged.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Creates an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything written so far.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Parses every line as JSON, skipping lines that are not.
    #[must_use]
    pub fn json_lines(&self) -> Vec<Value> {
        self.contents()
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_capture_shares_buffer() {
        let capture = LogCapture::new();
        let mut writer = capture.make_writer();
        writer.write_all(b"{\"a\":1}\nplain text\n").unwrap();

        assert!(capture.contents().contains("plain text"));
        assert_eq!(capture.json_lines(), vec![serde_json::json!({"a": 1})]);
    }
}
