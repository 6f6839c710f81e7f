use async_trait::async_trait;

use crate::models::PermissionState;

/// Desktop notification capability.
#[async_trait]
pub trait OsNotifier: Send + Sync {
    fn permission_state(&self) -> PermissionState;

    /// Prompts the user. Resolves to `Granted` or `Denied`.
    async fn request_permission(&self) -> PermissionState;

    /// Fire-and-forget. Failures stay inside the implementation.
    fn show(&self, title: &str, body: &str);
}

/// Notifier for hosts without a desktop notification facility.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl OsNotifier for NoopNotifier {
    fn permission_state(&self) -> PermissionState {
        PermissionState::Denied
    }

    async fn request_permission(&self) -> PermissionState {
        PermissionState::Denied
    }

    fn show(&self, _title: &str, _body: &str) {}
}
