//! Human-readable progress reporting.

/// Receives progress lines during a run.
pub trait ProgressSink {
    fn log(&mut self, message: &str);
}

/// Forwards progress to the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn log(&mut self, message: &str) {
        tracing::info!("{message}");
    }
}

impl<F: FnMut(&str)> ProgressSink for F {
    fn log(&mut self, message: &str) {
        self(message)
    }
}
