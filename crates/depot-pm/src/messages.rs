//! User-facing progress reporting.

/// Sink for progress and problem reports.
///
/// The resolver only ever hands over text; formatting and destination are
/// up to the implementation.
pub trait MessageHandler: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards every message to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMessageHandler;

impl MessageHandler for LogMessageHandler {
    fn info(&self, message: &str) {
        log::info!("{}", message);
    }

    fn warn(&self, message: &str) {
        log::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        log::error!("{}", message);
    }
}
