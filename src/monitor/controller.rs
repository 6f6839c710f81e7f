use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::{
    db::Database,
    error::{MonitorError, MonitorResult},
    events::{EventSink, LogEventSink, MonitorEvent},
    feedback::FeedbackCapture,
    history::{ChartPoint, HistoryLog, MonitorSummary},
    models::{FeedbackRecord, PermissionState, ResourceKind, SessionRecord, SessionStatus},
    notifications::{DispatchOutcome, NoopNotifier, NotificationDispatcher, OsNotifier},
    permissions::{AcquireError, MediaProvider, PermissionGateway},
    sampling::{RandomSampleSource, SampleSource, TickCallback},
    settings::MonitorConfig,
};

use super::state::{SessionCore, SessionSnapshot, SessionState};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "monitor";

use crate::{log_debug, log_info, log_warn};

/// What `restore_history` brought back from storage.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub interrupted_sessions: Vec<String>,
    pub samples: usize,
    pub feedback_restored: bool,
}

struct SessionShared {
    core: Mutex<SessionCore>,
    gateway: PermissionGateway,
    source: Arc<dyn SampleSource>,
    history: HistoryLog,
    dispatcher: NotificationDispatcher,
    feedback: FeedbackCapture,
    events: Arc<dyn EventSink>,
    db: Option<Database>,
    config: MonitorConfig,
}

/// Drives the Idle -> Starting -> Active -> Stopping -> Idle lifecycle.
#[derive(Clone)]
pub struct MonitoringSession {
    shared: Arc<SessionShared>,
}

pub struct MonitoringSessionBuilder {
    provider: Arc<dyn MediaProvider>,
    config: MonitorConfig,
    source: Option<Arc<dyn SampleSource>>,
    notifier: Option<Arc<dyn OsNotifier>>,
    events: Option<Arc<dyn EventSink>>,
    database: Option<Database>,
    history: Option<HistoryLog>,
}

impl MonitoringSessionBuilder {
    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sample_source(mut self, source: Arc<dyn SampleSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn OsNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    /// Shares an existing log instead of starting from an empty one.
    pub fn history(mut self, history: HistoryLog) -> Self {
        self.history = Some(history);
        self
    }

    pub fn build(self) -> MonitorResult<MonitoringSession> {
        self.config.validate()?;

        let events = self
            .events
            .unwrap_or_else(|| Arc::new(LogEventSink) as Arc<dyn EventSink>);
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(NoopNotifier) as Arc<dyn OsNotifier>);
        let source = self
            .source
            .unwrap_or_else(|| Arc::new(RandomSampleSource::intensity()) as Arc<dyn SampleSource>);

        let feedback = FeedbackCapture::new(events.clone());
        let dispatcher =
            NotificationDispatcher::new(&self.config, notifier, events.clone(), feedback.clone());

        Ok(MonitoringSession {
            shared: Arc::new(SessionShared {
                core: Mutex::new(SessionCore::new()),
                gateway: PermissionGateway::new(self.provider),
                source,
                history: self.history.unwrap_or_default(),
                dispatcher,
                feedback,
                events,
                db: self.database,
                config: self.config,
            }),
        })
    }
}

impl MonitoringSession {
    pub fn builder(provider: Arc<dyn MediaProvider>) -> MonitoringSessionBuilder {
        MonitoringSessionBuilder {
            provider,
            config: MonitorConfig::default(),
            source: None,
            notifier: None,
            events: None,
            database: None,
            history: None,
        }
    }

    /// Acquires video then audio and begins periodic sampling.
    ///
    /// If `stop` runs while a device prompt is pending, the attempt is
    /// abandoned: any handle granted afterwards is released and an Idle
    /// snapshot with no session id is returned. A later session's state is
    /// never reported to the abandoned caller.
    pub async fn start(&self) -> MonitorResult<SessionSnapshot> {
        let session_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();

        let attempt = {
            let mut core = self.lock().await;
            if core.state != SessionState::Idle {
                log_warn!("start ignored; session is {:?}", core.state);
                return Err(MonitorError::SchedulerAlreadyActive);
            }
            self.shared.gateway.reset();
            let attempt = core.begin_start(session_id.clone(), started_at);
            self.emit_state(&core);
            attempt
        };

        for kind in [ResourceKind::Video, ResourceKind::Audio] {
            let outcome = match kind {
                ResourceKind::Video => self.shared.gateway.request_video().await,
                ResourceKind::Audio => self.shared.gateway.request_audio().await,
            };

            let mut core = self.lock().await;
            if !core.is_current(attempt) {
                if let Ok(handle) = &outcome {
                    self.shared.gateway.release(handle);
                }
                log_info!("start attempt {attempt} superseded; acquisition abandoned");
                return Ok(SessionSnapshot::default());
            }
            match outcome {
                Ok(handle) => core.hold(handle),
                Err(AcquireError::Denied(resource)) => {
                    return Err(
                        self.fail_start(&mut core, MonitorError::PermissionDenied { resource })
                    )
                }
                Err(AcquireError::Superseded(resource)) => {
                    // Only a reset orphans a prompt, and both callers of reset
                    // also end this attempt. Unwind rather than stay Starting.
                    log_warn!("{resource} prompt orphaned while attempt {attempt} was current");
                    for handle in core.take_resources() {
                        self.shared.gateway.release(&handle);
                    }
                    core.reset();
                    self.emit_state(&core);
                    return Ok(SessionSnapshot::default());
                }
            }
        }

        let mut core = self.lock().await;
        if !core.is_current(attempt) {
            return Ok(SessionSnapshot::default());
        }

        let config = &self.shared.config;
        // Queued ahead of any sample row that references it.
        if let Some(db) = &self.shared.db {
            let now = Utc::now();
            db.record_session_started(&SessionRecord {
                id: session_id.clone(),
                started_at,
                stopped_at: None,
                status: SessionStatus::Running,
                interval_ms: config.interval_ms,
                created_at: now,
                updated_at: now,
            });
        }

        let on_tick = self.tick_callback(session_id.clone());
        let token = match core.scheduler.start(
            config.interval(),
            config.threshold(),
            self.shared.source.clone(),
            on_tick,
        ) {
            Ok(token) => token,
            Err(err) => {
                if let Some(db) = &self.shared.db {
                    let now = Utc::now();
                    db.record_session_status(
                        &session_id,
                        SessionStatus::Interrupted,
                        Some(now),
                        now,
                    );
                }
                return Err(self.fail_start(&mut core, err));
            }
        };

        core.activate(token);
        log_info!(
            "session {session_id} active; sampling every {}ms",
            config.interval_ms
        );
        self.emit_state(&core);
        Ok(self.snapshot_of(&core))
    }

    /// Cancels sampling and releases every held resource. A no-op when idle.
    pub async fn stop(&self) -> SessionSnapshot {
        let mut core = self.lock().await;
        if matches!(core.state, SessionState::Idle | SessionState::Stopping) {
            log_debug!("stop ignored; session is {:?}", core.state);
            return self.snapshot_of(&core);
        }

        let was_active = core.state == SessionState::Active;
        core.state = SessionState::Stopping;
        self.emit_state(&core);

        core.cancel_sampling();
        for handle in core.take_resources() {
            self.shared.gateway.release(&handle);
        }
        self.shared.gateway.release_all();
        self.shared.gateway.reset();

        if was_active {
            if let (Some(db), Some(session_id)) = (&self.shared.db, core.session_id.as_deref()) {
                let now = Utc::now();
                db.record_session_status(session_id, SessionStatus::Completed, Some(now), now);
            }
        }

        if let Some(session_id) = core.session_id.as_deref() {
            log_info!("session {session_id} stopped");
        }
        core.reset();
        self.emit_state(&core);
        self.snapshot_of(&core)
    }

    /// Rates the alert behind the open feedback prompt.
    pub fn submit_feedback(&self, value: i64) -> MonitorResult<FeedbackRecord> {
        let record = self.shared.feedback.submit(value)?;
        if let Some(db) = &self.shared.db {
            db.record_feedback(&record);
        }
        log_info!(
            "feedback {}/5 recorded for alert {}",
            record.rating.value(),
            record.alert_id
        );
        Ok(record)
    }

    pub fn dismiss_feedback(&self) {
        self.shared.feedback.dismiss();
    }

    /// Clears the error banner. The session state is left as is.
    pub async fn dismiss_error(&self) {
        self.lock().await.last_error = None;
        self.shared.events.emit(MonitorEvent::ErrorDismissed);
    }

    pub fn dismiss_banner(&self) -> Option<Uuid> {
        self.shared.dispatcher.dismiss_banner()
    }

    pub async fn request_notification_permission(&self) -> PermissionState {
        self.shared.dispatcher.ensure_os_permission().await
    }

    /// Loads samples and the latest rating persisted by earlier runs.
    ///
    /// Sessions still marked running are recorded as interrupted first. Only
    /// allowed while idle.
    pub async fn restore_history(&self) -> MonitorResult<RestoreReport> {
        let Some(db) = &self.shared.db else {
            return Ok(RestoreReport::default());
        };

        let core = self.lock().await;
        if core.state != SessionState::Idle {
            return Err(MonitorError::SchedulerAlreadyActive);
        }

        let interrupted_sessions = db.recover_interrupted_sessions(Utc::now()).await?;
        if !interrupted_sessions.is_empty() {
            log_warn!(
                "{} session(s) were not stopped cleanly",
                interrupted_sessions.len()
            );
        }

        let samples = self.shared.history.restore(db.load_samples().await?);
        let feedback_restored = match db.latest_feedback().await? {
            Some(record) => self.shared.feedback.restore(record),
            None => false,
        };
        drop(core);

        log_info!("restored {samples} sample(s) from {}", db.path().display());
        Ok(RestoreReport {
            interrupted_sessions,
            samples,
            feedback_restored,
        })
    }

    pub fn summary(&self) -> MonitorSummary {
        self.shared
            .history
            .summary(self.shared.feedback.latest_rating())
    }

    pub fn history(&self) -> HistoryLog {
        self.shared.history.clone()
    }

    pub fn chart_series(&self) -> Vec<ChartPoint> {
        self.shared.history.chart_series()
    }

    pub fn latest_feedback(&self) -> Option<FeedbackRecord> {
        self.shared.feedback.latest()
    }

    pub fn is_feedback_pending(&self) -> bool {
        self.shared.feedback.is_prompt_open()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.shared.config
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let core = self.lock().await;
        self.snapshot_of(&core)
    }

    pub async fn is_active(&self) -> bool {
        self.lock().await.state == SessionState::Active
    }

    /// The callback owns clones of the collaborators, never the session
    /// itself, so the scheduler task does not keep the session alive.
    fn tick_callback(&self, session_id: String) -> TickCallback {
        let history = self.shared.history.clone();
        let dispatcher = self.shared.dispatcher.clone();
        let events = self.shared.events.clone();
        let db = self.shared.db.clone();

        Arc::new(move |sample| {
            let entry = history.append(Some(session_id.as_str()), sample);
            if let Some(db) = &db {
                db.record_sample(Some(session_id.as_str()), &entry.sample);
            }
            events.emit(MonitorEvent::SampleRecorded(entry.clone()));

            if let DispatchOutcome::Suppressed { remaining } =
                dispatcher.notify(Some(session_id.as_str()), &entry.sample)
            {
                log_debug!(
                    "sample {} stressed but alert suppressed for {}ms",
                    entry.seq,
                    remaining.as_millis()
                );
            }
        })
    }

    fn fail_start(&self, core: &mut SessionCore, err: MonitorError) -> MonitorError {
        for handle in core.take_resources() {
            self.shared.gateway.release(&handle);
        }
        core.reset();

        let message = err.user_message();
        log_warn!("start failed: {err}");
        core.last_error = Some(message.clone());
        self.shared
            .events
            .emit(MonitorEvent::ErrorSurfaced { message });
        self.emit_state(core);
        err
    }

    fn snapshot_of(&self, core: &SessionCore) -> SessionSnapshot {
        core.snapshot(
            self.shared.gateway.permission(ResourceKind::Video),
            self.shared.gateway.permission(ResourceKind::Audio),
        )
    }

    fn emit_state(&self, core: &SessionCore) {
        self.shared
            .events
            .emit(MonitorEvent::SessionStateChanged(self.snapshot_of(core)));
    }

    async fn lock(&self) -> MutexGuard<'_, SessionCore> {
        self.shared.core.lock().await
    }
}
