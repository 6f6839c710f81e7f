use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    models::{PermissionState, ResourceHandle, ResourceKind},
    sampling::{LivenessToken, SampleScheduler},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    #[default]
    Idle,
    Starting,
    Active,
    Stopping,
}

/// The default is the bare Idle view handed to an abandoned `start`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub video: PermissionState,
    pub audio: PermissionState,
    pub last_error: Option<String>,
}

/// Mutable core of the monitoring session, guarded by the controller's lock.
pub(crate) struct SessionCore {
    pub state: SessionState,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    /// Bumped by every `start`; an acquisition only proceeds while its
    /// attempt is current and the state is still `Starting`.
    pub attempt: u64,
    pub video: Option<ResourceHandle>,
    pub audio: Option<ResourceHandle>,
    pub last_error: Option<String>,
    pub liveness: Option<LivenessToken>,
    pub scheduler: SampleScheduler,
}

impl SessionCore {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            session_id: None,
            started_at: None,
            attempt: 0,
            video: None,
            audio: None,
            last_error: None,
            liveness: None,
            scheduler: SampleScheduler::new(),
        }
    }

    pub fn begin_start(&mut self, session_id: String, started_at: DateTime<Utc>) -> u64 {
        self.attempt = self.attempt.wrapping_add(1);
        self.state = SessionState::Starting;
        self.session_id = Some(session_id);
        self.started_at = Some(started_at);
        self.last_error = None;
        self.attempt
    }

    pub fn is_current(&self, attempt: u64) -> bool {
        self.attempt == attempt && self.state == SessionState::Starting
    }

    pub fn hold(&mut self, handle: ResourceHandle) {
        match handle.kind() {
            ResourceKind::Video => self.video = Some(handle),
            ResourceKind::Audio => self.audio = Some(handle),
        }
    }

    pub fn take_resources(&mut self) -> Vec<ResourceHandle> {
        self.video.take().into_iter().chain(self.audio.take()).collect()
    }

    pub fn activate(&mut self, token: LivenessToken) {
        self.state = SessionState::Active;
        self.liveness = Some(token);
    }

    /// Cancels the scheduler run, if any. Returns once no tick can fire.
    pub fn cancel_sampling(&mut self) {
        if let Some(token) = self.liveness.take() {
            self.scheduler.cancel(&token);
        }
    }

    /// Returns to `Idle`. `attempt` and `last_error` survive.
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.session_id = None;
        self.started_at = None;
        self.video = None;
        self.audio = None;
        self.liveness = None;
    }

    pub fn snapshot(&self, video: PermissionState, audio: PermissionState) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            session_id: self.session_id.clone(),
            started_at: self.started_at,
            video,
            audio,
            last_error: self.last_error.clone(),
        }
    }
}
