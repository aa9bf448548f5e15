//! Status sinks

use tracing::info;

use crate::core::events::{AppEvent, EventSender};

/// Write-only sink for the loop's human-readable status line.
///
/// Injected once at loop construction; sink failures never reach the loop.
pub trait StatusSink: Send {
    fn publish(&self, message: &str);
}

/// Headless deployment: status goes to the log
pub struct LogSink;

impl StatusSink for LogSink {
    fn publish(&self, message: &str) {
        info!("{}", message);
    }
}

/// Tray deployment: status is forwarded to the UI event loop
pub struct EventSink {
    tx: EventSender,
}

impl EventSink {
    pub fn new(tx: EventSender) -> Self {
        Self { tx }
    }
}

impl StatusSink for EventSink {
    fn publish(&self, message: &str) {
        // A closed channel means the UI is gone; the loop must not care
        let _ = self.tx.send(AppEvent::Status(message.to_string()));
    }
}
