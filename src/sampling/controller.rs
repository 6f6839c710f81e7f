use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;

use crate::error::{MonitorError, MonitorResult};

use super::{liveness::LivenessToken, loop_worker::sampling_loop, source::SampleSource, TickCallback};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "scheduler";

use crate::log_info;

/// Owns the periodic sampling task of the active session.
pub struct SampleScheduler {
    handle: Option<JoinHandle<()>>,
    token: Option<LivenessToken>,
}

impl SampleScheduler {
    pub fn new() -> Self {
        Self {
            handle: None,
            token: None,
        }
    }

    /// Spawns the sampling loop. The first tick fires one `interval` after
    /// this call. Must be called from within a Tokio runtime.
    pub fn start(
        &mut self,
        interval: Duration,
        threshold: u8,
        source: Arc<dyn SampleSource>,
        on_tick: TickCallback,
    ) -> MonitorResult<LivenessToken> {
        if self.is_running() {
            return Err(MonitorError::SchedulerAlreadyActive);
        }
        if interval.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "sampling interval must be greater than zero".into(),
            ));
        }

        let token = LivenessToken::new();
        let handle = tokio::spawn(sampling_loop(
            interval,
            threshold,
            source,
            on_tick,
            token.clone(),
        ));

        log_info!(
            "sampling started every {}ms (token {})",
            interval.as_millis(),
            token.id()
        );

        self.handle = Some(handle);
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Cancels `token`. When it returns, no further tick callback runs for it.
    pub fn cancel(&mut self, token: &LivenessToken) {
        token.cancel();

        let owned = self
            .token
            .as_ref()
            .map(|current| current.id() == token.id())
            .unwrap_or(false);
        if owned {
            self.token = None;
            if let Some(handle) = self.handle.take() {
                handle.abort();
            }
            log_info!("sampling cancelled (token {})", token.id());
        }
    }

    /// Cancels whatever run is active, if any.
    pub fn cancel_active(&mut self) {
        if let Some(token) = self.token.clone() {
            self.cancel(&token);
        }
    }

    pub fn is_running(&self) -> bool {
        self.token.as_ref().map(LivenessToken::is_live).unwrap_or(false)
    }
}

impl Default for SampleScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SampleScheduler {
    fn drop(&mut self) {
        self.cancel_active();
    }
}
