#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use stresswatch::{
    models::{Denied, PermissionState, ResourceKind, StreamHandle},
    BufferedEventSink, Database, MediaProvider, MonitorConfig, MonitorEvent, MonitoringSession,
    OsNotifier, SampleSource,
};
use tokio::sync::Notify;

/// How the fake answers one `request_stream` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Grant,
    Deny,
    /// Stays open until `release_prompt`, then grants.
    HeldGrant,
    /// Stays open until `release_prompt`, then denies.
    HeldDeny,
}

/// Media provider answering from a per-call script. Calls past the end of
/// the script grant everything except `deny`, holding video prompts open
/// when `hold_video` is set.
pub struct FakeProvider {
    deny: Option<ResourceKind>,
    hold_video: bool,
    script: Mutex<VecDeque<Prompt>>,
    requests: Mutex<Vec<ResourceKind>>,
    stopped: AtomicUsize,
    entered: Notify,
    open_prompts: Mutex<VecDeque<Arc<Notify>>>,
}

impl FakeProvider {
    pub fn granting() -> Arc<Self> {
        Self::build(None, false, [])
    }

    pub fn denying(kind: ResourceKind) -> Arc<Self> {
        Self::build(Some(kind), false, [])
    }

    pub fn holding_video_prompt() -> Arc<Self> {
        Self::build(None, true, [])
    }

    pub fn scripted(prompts: impl IntoIterator<Item = Prompt>) -> Arc<Self> {
        Self::build(None, false, prompts)
    }

    fn build(
        deny: Option<ResourceKind>,
        hold_video: bool,
        prompts: impl IntoIterator<Item = Prompt>,
    ) -> Arc<Self> {
        Arc::new(Self {
            deny,
            hold_video,
            script: Mutex::new(prompts.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            stopped: AtomicUsize::new(0),
            entered: Notify::new(),
            open_prompts: Mutex::new(VecDeque::new()),
        })
    }

    pub fn requests(&self) -> Vec<ResourceKind> {
        self.requests.lock().unwrap().clone()
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Resolves once a held prompt has been shown.
    pub async fn prompt_shown(&self) {
        self.entered.notified().await
    }

    /// Answers the oldest held prompt.
    pub fn release_prompt(&self) {
        let prompt = self.open_prompts.lock().unwrap().pop_front();
        prompt.expect("no held prompt to release").notify_one();
    }

    fn next_prompt(&self, kind: ResourceKind) -> Prompt {
        if let Some(prompt) = self.script.lock().unwrap().pop_front() {
            return prompt;
        }
        let hold = self.hold_video && kind == ResourceKind::Video;
        match (hold, self.deny == Some(kind)) {
            (false, false) => Prompt::Grant,
            (false, true) => Prompt::Deny,
            (true, false) => Prompt::HeldGrant,
            (true, true) => Prompt::HeldDeny,
        }
    }
}

#[async_trait]
impl MediaProvider for FakeProvider {
    async fn request_stream(&self, kind: ResourceKind) -> Result<StreamHandle, Denied> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(kind);
            requests.len()
        };

        let prompt = self.next_prompt(kind);
        if matches!(prompt, Prompt::HeldGrant | Prompt::HeldDeny) {
            let gate = Arc::new(Notify::new());
            self.open_prompts.lock().unwrap().push_back(gate.clone());
            self.entered.notify_one();
            gate.notified().await;
        }

        match prompt {
            Prompt::Grant | Prompt::HeldGrant => Ok(StreamHandle::new(kind, format!("{kind}-{n}"))),
            Prompt::Deny | Prompt::HeldDeny => Err(Denied { kind }),
        }
    }

    fn stop_tracks(&self, _handle: &StreamHandle) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct RecordingNotifier {
    permission: Mutex<PermissionState>,
    shown: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new(permission: PermissionState) -> Arc<Self> {
        Arc::new(Self {
            permission: Mutex::new(permission),
            shown: Mutex::new(Vec::new()),
        })
    }

    pub fn shown(&self) -> Vec<(String, String)> {
        self.shown.lock().unwrap().clone()
    }
}

#[async_trait]
impl OsNotifier for RecordingNotifier {
    fn permission_state(&self) -> PermissionState {
        *self.permission.lock().unwrap()
    }

    async fn request_permission(&self) -> PermissionState {
        *self.permission.lock().unwrap() = PermissionState::Granted;
        PermissionState::Granted
    }

    fn show(&self, title: &str, body: &str) {
        self.shown
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }
}

pub struct Harness {
    pub session: MonitoringSession,
    pub provider: Arc<FakeProvider>,
    pub notifier: Arc<RecordingNotifier>,
    pub events: BufferedEventSink,
}

pub fn harness(
    provider: Arc<FakeProvider>,
    source: impl SampleSource + 'static,
    interval_ms: u64,
    database: Option<Database>,
) -> Harness {
    let notifier = RecordingNotifier::new(PermissionState::Granted);
    let events = BufferedEventSink::new();
    let mut builder = MonitoringSession::builder(provider.clone())
        .config(MonitorConfig::default().with_interval_ms(interval_ms))
        .sample_source(Arc::new(source))
        .notifier(notifier.clone())
        .event_sink(Arc::new(events.clone()));
    if let Some(db) = database {
        builder = builder.database(db);
    }

    Harness {
        session: builder.build().unwrap(),
        provider,
        notifier,
        events,
    }
}

pub fn event_names(events: &[MonitorEvent]) -> Vec<&'static str> {
    events.iter().map(MonitorEvent::name).collect()
}
