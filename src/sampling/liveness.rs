use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Explicit liveness signal for one scheduler run.
///
/// Every tick callback runs while holding `gate` and re-checks the token
/// first, so once `cancel` returns no callback for this token can run.
#[derive(Debug, Clone)]
pub struct LivenessToken {
    id: Uuid,
    cancel: CancellationToken,
    gate: Arc<Mutex<()>>,
}

impl LivenessToken {
    pub(crate) fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
            gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_live(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Marks the token dead and waits for any in-flight callback to finish.
    /// Must not be called from inside a tick callback of the same token.
    ///
    /// The gate is a blocking lock. The wait is bounded by one callback run:
    /// callbacks are synchronous, never await while holding the gate and
    /// never take the session lock, so a caller holding that lock cannot
    /// deadlock here.
    pub fn cancel(&self) {
        self.cancel.cancel();
        drop(self.gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner()));
    }

    pub(crate) async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Runs `f` under the gate if the token is still live. Returns whether it ran.
    pub(crate) fn run_if_live<F: FnOnce()>(&self, f: F) -> bool {
        let _guard = self.gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.cancel.is_cancelled() {
            return false;
        }
        f();
        true
    }
}
