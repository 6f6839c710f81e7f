use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    events::{AlertBanner, EventSink, MonitorEvent},
    feedback::FeedbackCapture,
    models::{PermissionState, Sample},
    settings::MonitorConfig,
};

use super::os::OsNotifier;

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "alerts";

use crate::{log_debug, log_info, log_warn};

pub const OS_NOTIFICATION_TITLE: &str = "Stress Alert";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    pub banner: String,
    pub os_notified: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Calm sample; nothing to do.
    Ignored,
    /// Stressed sample inside the cooldown window. It is still in history.
    Suppressed { remaining: Duration },
    Dispatched(Alert),
}

#[derive(Debug, Default)]
struct DispatchState {
    last_alert_at: Option<Instant>,
    active_banner: Option<Uuid>,
}

struct DispatcherShared {
    notifier: Arc<dyn OsNotifier>,
    events: Arc<dyn EventSink>,
    feedback: FeedbackCapture,
    banner_duration: Duration,
    cooldown: Option<Duration>,
    state: Mutex<DispatchState>,
}

/// Turns stressed samples into banners, OS notifications and feedback prompts.
#[derive(Clone)]
pub struct NotificationDispatcher {
    shared: Arc<DispatcherShared>,
}

impl NotificationDispatcher {
    pub fn new(
        config: &MonitorConfig,
        notifier: Arc<dyn OsNotifier>,
        events: Arc<dyn EventSink>,
        feedback: FeedbackCapture,
    ) -> Self {
        Self {
            shared: Arc::new(DispatcherShared {
                notifier,
                events,
                feedback,
                banner_duration: config.banner_duration(),
                cooldown: config.alert_cooldown(),
                state: Mutex::new(DispatchState::default()),
            }),
        }
    }

    pub fn notify(&self, session_id: Option<&str>, sample: &Sample) -> DispatchOutcome {
        if !sample.is_stressed() {
            return DispatchOutcome::Ignored;
        }

        let now = Instant::now();
        let alert_id = Uuid::new_v4();
        {
            let mut state = self.lock();
            if let (Some(cooldown), Some(last)) = (self.shared.cooldown, state.last_alert_at) {
                let elapsed = now.saturating_duration_since(last);
                if elapsed < cooldown {
                    let remaining = cooldown - elapsed;
                    log_debug!("alert suppressed; cooldown has {}ms left", remaining.as_millis());
                    return DispatchOutcome::Suppressed { remaining };
                }
            }
            state.last_alert_at = Some(now);
            state.active_banner = Some(alert_id);
        }

        let banner = banner_message(sample);
        self.shared.events.emit(MonitorEvent::AlertBannerShown(AlertBanner {
            alert_id,
            message: banner.clone(),
            duration_ms: self.shared.banner_duration.as_millis() as u64,
        }));
        self.schedule_banner_expiry(alert_id);

        let os_notified = match self.shared.notifier.permission_state() {
            PermissionState::Granted => {
                self.shared
                    .notifier
                    .show(OS_NOTIFICATION_TITLE, &os_notification_body(sample));
                true
            }
            other => {
                log_debug!("OS notification skipped; permission is {other:?}");
                false
            }
        };

        self.shared.feedback.request(alert_id, session_id);

        log_info!("stress alert {alert_id} dispatched (os_notified={os_notified})");
        DispatchOutcome::Dispatched(Alert {
            id: alert_id,
            banner,
            os_notified,
        })
    }

    /// Hides the current banner early. Returns the dismissed alert id.
    pub fn dismiss_banner(&self) -> Option<Uuid> {
        let dismissed = self.lock().active_banner.take();
        if let Some(alert_id) = dismissed {
            self.shared
                .events
                .emit(MonitorEvent::AlertBannerDismissed { alert_id });
        }
        dismissed
    }

    pub fn active_banner(&self) -> Option<Uuid> {
        self.lock().active_banner
    }

    /// Asks the OS for notification permission unless it was already decided.
    pub async fn ensure_os_permission(&self) -> PermissionState {
        match self.shared.notifier.permission_state() {
            PermissionState::Unrequested => self.shared.notifier.request_permission().await,
            decided => decided,
        }
    }

    fn expire_banner(&self, alert_id: Uuid) {
        let expired = {
            let mut state = self.lock();
            if state.active_banner == Some(alert_id) {
                state.active_banner = None;
                true
            } else {
                false
            }
        };
        if expired {
            self.shared
                .events
                .emit(MonitorEvent::AlertBannerDismissed { alert_id });
        }
    }

    fn schedule_banner_expiry(&self, alert_id: Uuid) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log_warn!("no runtime available; banner {alert_id} will not auto-dismiss");
            return;
        };
        let dispatcher = self.clone();
        let duration = self.shared.banner_duration;
        runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            dispatcher.expire_banner(alert_id);
        });
    }

    fn lock(&self) -> MutexGuard<'_, DispatchState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn banner_message(sample: &Sample) -> String {
    match sample.intensity {
        Some(level) => format!("You seem stressed! Current level: {level}%"),
        None => "You seem stressed! Consider taking a break.".to_string(),
    }
}

fn os_notification_body(sample: &Sample) -> String {
    match sample.intensity {
        Some(level) => format!("You seem stressed ({level}%). Consider taking a break."),
        None => "You seem stressed. Consider taking a break.".to_string(),
    }
}
