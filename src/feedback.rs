use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{MonitorError, MonitorResult},
    events::{EventSink, MonitorEvent},
    models::{FeedbackRating, FeedbackRecord},
};

#[derive(Debug, Clone)]
struct PendingPrompt {
    alert_id: Uuid,
    session_id: Option<String>,
}

#[derive(Debug, Default)]
struct FeedbackState {
    prompt: Option<PendingPrompt>,
    latest: Option<FeedbackRecord>,
}

/// Feedback prompt plus the most recent rating.
#[derive(Clone)]
pub struct FeedbackCapture {
    state: Arc<Mutex<FeedbackState>>,
    events: Arc<dyn EventSink>,
}

impl FeedbackCapture {
    pub fn new(events: Arc<dyn EventSink>) -> Self {
        Self {
            state: Arc::new(Mutex::new(FeedbackState::default())),
            events,
        }
    }

    /// Opens the prompt for a new alert, discarding the previous rating.
    pub fn request(&self, alert_id: Uuid, session_id: Option<&str>) {
        {
            let mut state = self.lock();
            state.latest = None;
            state.prompt = Some(PendingPrompt {
                alert_id,
                session_id: session_id.map(str::to_owned),
            });
        }
        self.events.emit(MonitorEvent::FeedbackRequested { alert_id });
    }

    /// Records a rating for the open prompt and closes it.
    ///
    /// The range is validated before anything else, so an invalid value never
    /// touches the prompt or the stored rating.
    pub fn submit(&self, value: i64) -> MonitorResult<FeedbackRecord> {
        let rating = FeedbackRating::new(value)?;

        let record = {
            let mut state = self.lock();
            let prompt = state.prompt.take().ok_or(MonitorError::NoFeedbackRequested)?;
            let record = FeedbackRecord {
                alert_id: prompt.alert_id,
                session_id: prompt.session_id,
                rating,
                submitted_at: Utc::now(),
            };
            state.latest = Some(record.clone());
            record
        };

        self.events.emit(MonitorEvent::FeedbackClosed {
            alert_id: Some(record.alert_id),
            rating: Some(rating.value()),
        });
        Ok(record)
    }

    /// Closes the prompt without a rating and clears the stored rating.
    pub fn dismiss(&self) {
        let prompt = {
            let mut state = self.lock();
            state.latest = None;
            state.prompt.take()
        };
        self.events.emit(MonitorEvent::FeedbackClosed {
            alert_id: prompt.map(|p| p.alert_id),
            rating: None,
        });
    }

    /// Seeds the latest rating from storage. Ignored once a prompt or rating exists.
    pub fn restore(&self, record: FeedbackRecord) -> bool {
        let mut state = self.lock();
        if state.prompt.is_some() || state.latest.is_some() {
            return false;
        }
        state.latest = Some(record);
        true
    }

    pub fn is_prompt_open(&self) -> bool {
        self.lock().prompt.is_some()
    }

    pub fn pending_alert(&self) -> Option<Uuid> {
        self.lock().prompt.as_ref().map(|p| p.alert_id)
    }

    pub fn latest(&self) -> Option<FeedbackRecord> {
        self.lock().latest.clone()
    }

    pub fn latest_rating(&self) -> Option<FeedbackRating> {
        self.lock().latest.as_ref().map(|r| r.rating)
    }

    fn lock(&self) -> MutexGuard<'_, FeedbackState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
