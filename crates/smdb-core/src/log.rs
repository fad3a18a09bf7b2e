use std::sync::{Arc, Mutex};

/// Single-method capability for the store's human-readable status lines
/// (cipher selection attempts and fallbacks). Delivery is best-effort; a
/// sink must never fail the caller.
pub trait LogSink: Send + Sync {
    fn log(&self, line: &str);
}

/// Default sink: forwards each line to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn log(&self, line: &str) {
        tracing::info!(target: "smdb", "{line}");
    }
}

/// Sink that drops every line.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl LogSink for NullLog {
    fn log(&self, _line: &str) {}
}

/// Buffering sink for tests and diagnostics: records every line in order.
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl LogSink for MemoryLog {
    fn log(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_log_records_lines_in_order() {
        let log = MemoryLog::new();
        log.log("first");
        log.log("second");
        assert_eq!(log.lines(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn clones_share_the_buffer() {
        let log = MemoryLog::new();
        let clone = log.clone();
        clone.log("shared");
        assert_eq!(log.lines(), vec!["shared".to_string()]);
    }
}
