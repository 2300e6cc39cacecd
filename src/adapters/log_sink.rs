//! Log-based notification and telemetry sink.
//!
//! Implements [`NotifyPort`] and [`TelemetryPort`] by writing to the
//! ESP-IDF logger (UART / USB-CDC in production).  An MQTT or messenger
//! adapter would implement the same traits.

use log::{info, warn};

use crate::app::events::{Notification, NotifyCategory};
use crate::app::ports::{NotifyError, NotifyPort, TelemetryError, TelemetryPort};

/// Adapter that logs every notification and telemetry topic.
#[derive(Debug, Default)]
pub struct LogSink {
    published: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Telemetry payloads written so far.
    pub fn published(&self) -> u64 {
        self.published
    }
}

impl NotifyPort for LogSink {
    fn notify(&mut self, n: &Notification) -> Result<(), NotifyError> {
        let tag = match n.category {
            NotifyCategory::Watering => "WATER",
            NotifyCategory::Leak => "LEAK ",
            NotifyCategory::Level => "LEVEL",
        };
        if n.sound {
            warn!("{} | {}", tag, n.message);
        } else {
            info!("{} | {}", tag, n.message);
        }
        Ok(())
    }
}

impl TelemetryPort for LogSink {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), TelemetryError> {
        info!("TELEM | {} | {}", topic, payload);
        self.published += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::events::Message;
    use crate::config::NotifyMode;

    #[test]
    fn accepts_everything() {
        let mut sink = LogSink::new();
        let n = Message::level_low().with_mode(NotifyMode::Sound).unwrap();
        assert!(sink.notify(&n).is_ok());
        assert!(sink.publish("water_level", r#"{"status":0}"#).is_ok());
        assert_eq!(sink.published(), 1);
    }
}
