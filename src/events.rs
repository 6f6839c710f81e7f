//! Events pushed to the presentation layer.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use uuid::Uuid;

use crate::models::HistoryEntry;
use crate::monitor::SessionSnapshot;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertBanner {
    pub alert_id: Uuid,
    pub message: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(
    tag = "event",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum MonitorEvent {
    SessionStateChanged(SessionSnapshot),
    SampleRecorded(HistoryEntry),
    AlertBannerShown(AlertBanner),
    AlertBannerDismissed { alert_id: Uuid },
    FeedbackRequested { alert_id: Uuid },
    FeedbackClosed { alert_id: Option<Uuid>, rating: Option<u8> },
    ErrorSurfaced { message: String },
    ErrorDismissed,
}

impl MonitorEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MonitorEvent::SessionStateChanged(_) => "session-state-changed",
            MonitorEvent::SampleRecorded(_) => "sample-recorded",
            MonitorEvent::AlertBannerShown(_) => "alert-banner-shown",
            MonitorEvent::AlertBannerDismissed { .. } => "alert-banner-dismissed",
            MonitorEvent::FeedbackRequested { .. } => "feedback-requested",
            MonitorEvent::FeedbackClosed { .. } => "feedback-closed",
            MonitorEvent::ErrorSurfaced { .. } => "error-surfaced",
            MonitorEvent::ErrorDismissed => "error-dismissed",
        }
    }
}

/// Receives events for rendering. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: MonitorEvent);
}

/// Default sink: writes each event to the log at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, event: MonitorEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => log::debug!("event {}: {}", event.name(), json),
            Err(err) => log::warn!("failed to serialize event {}: {err}", event.name()),
        }
    }
}

/// Buffers events in memory, for embedding in a polling UI.
#[derive(Debug, Default, Clone)]
pub struct BufferedEventSink {
    events: Arc<Mutex<Vec<MonitorEvent>>>,
}

impl BufferedEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<MonitorEvent> {
        let mut guard = self.events.lock().unwrap_or_else(|p| p.into_inner());
        std::mem::take(&mut *guard)
    }

    pub fn snapshot(&self) -> Vec<MonitorEvent> {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl EventSink for BufferedEventSink {
    fn emit(&self, event: MonitorEvent) {
        self.events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_kebab_case_tag() {
        let event = MonitorEvent::ErrorSurfaced {
            message: "Camera access denied".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "error-surfaced");
        assert_eq!(json["payload"]["message"], "Camera access denied");
        assert_eq!(event.name(), "error-surfaced");
    }

    #[test]
    fn buffered_sink_drains_in_order() {
        let sink = BufferedEventSink::new();
        sink.emit(MonitorEvent::ErrorDismissed);
        sink.emit(MonitorEvent::FeedbackClosed {
            alert_id: None,
            rating: Some(3),
        });
        let drained = sink.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0], MonitorEvent::ErrorDismissed);
        assert!(sink.drain().is_empty());
    }
}
