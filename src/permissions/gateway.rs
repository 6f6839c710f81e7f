use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use thiserror::Error;
use uuid::Uuid;

use crate::models::{PermissionState, ResourceHandle, ResourceKind};

use super::media::MediaProvider;

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "permissions";

use crate::{log_debug, log_info, log_warn};

/// Why a request produced no handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AcquireError {
    #[error("{0} access denied")]
    Denied(ResourceKind),
    /// The gateway was reset while the prompt was open. The answer was
    /// discarded and a granted stream already stopped.
    #[error("{0} request superseded by a reset")]
    Superseded(ResourceKind),
}

impl AcquireError {
    pub fn kind(&self) -> ResourceKind {
        match self {
            AcquireError::Denied(kind) | AcquireError::Superseded(kind) => *kind,
        }
    }
}

#[derive(Default)]
struct GatewayState {
    video: PermissionState,
    audio: PermissionState,
    held: HashMap<Uuid, ResourceHandle>,
    /// Advanced by every `reset`. A provider answer is only applied when the
    /// generation it was requested under is still current.
    generation: u64,
}

impl GatewayState {
    fn slot(&mut self, kind: ResourceKind) -> &mut PermissionState {
        match kind {
            ResourceKind::Video => &mut self.video,
            ResourceKind::Audio => &mut self.audio,
        }
    }
}

/// Grants and releases the session's media resources.
///
/// Bookkeeping is never locked across a provider prompt, so a concurrent
/// `release` or `reset` is not blocked by a pending request.
pub struct PermissionGateway {
    provider: Arc<dyn MediaProvider>,
    state: Mutex<GatewayState>,
}

impl PermissionGateway {
    pub fn new(provider: Arc<dyn MediaProvider>) -> Self {
        Self {
            provider,
            state: Mutex::new(GatewayState::default()),
        }
    }

    pub async fn request_video(&self) -> Result<ResourceHandle, AcquireError> {
        self.request(ResourceKind::Video).await
    }

    pub async fn request_audio(&self) -> Result<ResourceHandle, AcquireError> {
        self.request(ResourceKind::Audio).await
    }

    async fn request(&self, kind: ResourceKind) -> Result<ResourceHandle, AcquireError> {
        let generation = {
            let mut state = self.lock();
            if *state.slot(kind) == PermissionState::Denied {
                log_debug!("{kind} previously denied; not prompting again");
                return Err(AcquireError::Denied(kind));
            }
            state.generation
        };

        let outcome = self.provider.request_stream(kind).await;

        let mut state = self.lock();
        if state.generation != generation {
            drop(state);
            if let Ok(stream) = &outcome {
                self.provider.stop_tracks(stream);
            }
            log_info!("late {kind} answer discarded; gateway was reset while prompting");
            return Err(AcquireError::Superseded(kind));
        }

        match outcome {
            Ok(stream) => {
                let handle = ResourceHandle {
                    id: Uuid::new_v4(),
                    stream,
                };
                *state.slot(kind) = PermissionState::Granted;
                state.held.insert(handle.id, handle.clone());
                log_info!("{kind} granted (handle {})", handle.id);
                Ok(handle)
            }
            Err(_) => {
                *state.slot(kind) = PermissionState::Denied;
                log_warn!("{kind} denied");
                Err(AcquireError::Denied(kind))
            }
        }
    }

    /// Stops the handle's tracks. Unknown or already released handles are ignored.
    pub fn release(&self, handle: &ResourceHandle) {
        let removed = self.lock().held.remove(&handle.id);
        match removed {
            Some(owned) => {
                self.provider.stop_tracks(&owned.stream);
                log_info!("{} released (handle {})", owned.kind(), owned.id);
            }
            None => log_debug!("release of inactive handle {} ignored", handle.id),
        }
    }

    pub fn release_all(&self) {
        let drained: Vec<ResourceHandle> = self.lock().held.drain().map(|(_, h)| h).collect();
        for handle in drained {
            self.provider.stop_tracks(&handle.stream);
            log_info!("{} released (handle {})", handle.kind(), handle.id);
        }
    }

    /// Forgets grant/deny outcomes and orphans any prompt still open. Called
    /// when a new user-initiated start begins and when a session stops.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.video = PermissionState::Unrequested;
        state.audio = PermissionState::Unrequested;
        state.generation = state.generation.wrapping_add(1);
    }

    pub fn permission(&self, kind: ResourceKind) -> PermissionState {
        *self.lock().slot(kind)
    }

    pub fn held_count(&self) -> usize {
        self.lock().held.len()
    }

    pub fn is_held(&self, handle: &ResourceHandle) -> bool {
        self.lock().held.contains_key(&handle.id)
    }

    fn lock(&self) -> MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Denied, StreamHandle};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct FakeProvider {
        deny: Option<ResourceKind>,
        requests: AtomicUsize,
        stopped: Mutex<Vec<StreamHandle>>,
    }

    impl FakeProvider {
        fn new(deny: Option<ResourceKind>) -> Arc<Self> {
            Arc::new(Self {
                deny,
                requests: AtomicUsize::new(0),
                stopped: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl MediaProvider for FakeProvider {
        async fn request_stream(&self, kind: ResourceKind) -> Result<StreamHandle, Denied> {
            let n = self.requests.fetch_add(1, Ordering::SeqCst);
            if self.deny == Some(kind) {
                Err(Denied { kind })
            } else {
                Ok(StreamHandle::new(kind, format!("{kind}-{n}")))
            }
        }

        fn stop_tracks(&self, handle: &StreamHandle) {
            self.stopped.lock().unwrap().push(handle.clone());
        }
    }

    #[tokio::test]
    async fn grant_marks_state_and_holds_handle() {
        let provider = FakeProvider::new(None);
        let gateway = PermissionGateway::new(provider.clone());

        let video = gateway.request_video().await.unwrap();
        assert_eq!(video.kind(), ResourceKind::Video);
        assert_eq!(gateway.permission(ResourceKind::Video), PermissionState::Granted);
        assert_eq!(gateway.permission(ResourceKind::Audio), PermissionState::Unrequested);
        assert!(gateway.is_held(&video));
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let provider = FakeProvider::new(None);
        let gateway = PermissionGateway::new(provider.clone());

        let audio = gateway.request_audio().await.unwrap();
        gateway.release(&audio);
        gateway.release(&audio);

        assert_eq!(gateway.held_count(), 0);
        assert_eq!(provider.stopped.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn releasing_a_foreign_handle_is_a_no_op() {
        let provider = FakeProvider::new(None);
        let gateway = PermissionGateway::new(provider.clone());
        let stranger = ResourceHandle {
            id: Uuid::new_v4(),
            stream: StreamHandle::new(ResourceKind::Video, "elsewhere"),
        };
        gateway.release(&stranger);
        assert!(provider.stopped.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn denial_is_sticky_until_reset() {
        let provider = FakeProvider::new(Some(ResourceKind::Audio));
        let gateway = PermissionGateway::new(provider.clone());

        assert!(gateway.request_audio().await.is_err());
        assert!(gateway.request_audio().await.is_err());
        assert_eq!(provider.requests.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.permission(ResourceKind::Audio), PermissionState::Denied);

        gateway.reset();
        assert_eq!(gateway.permission(ResourceKind::Audio), PermissionState::Unrequested);
        assert!(gateway.request_audio().await.is_err());
        assert_eq!(provider.requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn release_all_stops_every_held_stream() {
        let provider = FakeProvider::new(None);
        let gateway = PermissionGateway::new(provider.clone());
        gateway.request_video().await.unwrap();
        gateway.request_audio().await.unwrap();

        gateway.release_all();
        assert_eq!(gateway.held_count(), 0);
        assert_eq!(provider.stopped.lock().unwrap().len(), 2);
    }

    /// Answers only after `answer` is notified, with the configured verdict.
    struct HeldProvider {
        grant: bool,
        entered: Notify,
        answer: Notify,
        stopped: AtomicUsize,
    }

    impl HeldProvider {
        fn new(grant: bool) -> Arc<Self> {
            Arc::new(Self {
                grant,
                entered: Notify::new(),
                answer: Notify::new(),
                stopped: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MediaProvider for HeldProvider {
        async fn request_stream(&self, kind: ResourceKind) -> Result<StreamHandle, Denied> {
            self.entered.notify_one();
            self.answer.notified().await;
            if self.grant {
                Ok(StreamHandle::new(kind, "late"))
            } else {
                Err(Denied { kind })
            }
        }

        fn stop_tracks(&self, _handle: &StreamHandle) {
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn answer_after_reset(
        grant: bool,
    ) -> (
        Arc<HeldProvider>,
        Arc<PermissionGateway>,
        Result<ResourceHandle, AcquireError>,
    ) {
        let provider = HeldProvider::new(grant);
        let gateway = Arc::new(PermissionGateway::new(provider.clone()));

        let pending = {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.request_audio().await })
        };
        provider.entered.notified().await;
        gateway.reset();
        provider.answer.notify_one();

        let outcome = pending.await.unwrap();
        (provider, gateway, outcome)
    }

    #[tokio::test]
    async fn denial_after_reset_does_not_stick() {
        let (_, gateway, outcome) = answer_after_reset(false).await;
        assert_eq!(outcome, Err(AcquireError::Superseded(ResourceKind::Audio)));
        assert_eq!(gateway.permission(ResourceKind::Audio), PermissionState::Unrequested);
    }

    #[tokio::test]
    async fn grant_after_reset_is_stopped_not_held() {
        let (provider, gateway, outcome) = answer_after_reset(true).await;
        assert_eq!(outcome, Err(AcquireError::Superseded(ResourceKind::Audio)));
        assert_eq!(gateway.permission(ResourceKind::Audio), PermissionState::Unrequested);
        assert_eq!(gateway.held_count(), 0);
        assert_eq!(provider.stopped.load(Ordering::SeqCst), 1);
    }
}
