use std::io::Write;

use crate::error::PublishError;

pub mod kafka;

/// Handle to the message backend, shared by every line worker.
pub trait Publisher: Send + Sync {
    /// Hands one keyed message to the backend without waiting for it to be acknowledged.
    fn publish(&self, topic: &str, key: &str, value: &str) -> Result<(), PublishError>;

    /// Drains anything still buffered and releases the connection.
    fn close(&self) -> Result<(), PublishError>;
}

/// Writes every message to stdout as `topic\tkey\tvalue` instead of producing it.
pub struct PrintSink;

impl Publisher for PrintSink {
    fn publish(&self, topic: &str, key: &str, value: &str) -> Result<(), PublishError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{topic}\t{key}\t{value}")?;
        Ok(())
    }

    fn close(&self) -> Result<(), PublishError> {
        std::io::stdout().lock().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_sink_accepts_messages() {
        let sink = PrintSink;
        sink.publish("file_lines", "abc", "\u{1}abc\u{2}rest")
            .expect("failed to print message");
        sink.close().expect("failed to flush stdout");
    }
}
