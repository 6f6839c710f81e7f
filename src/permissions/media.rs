use async_trait::async_trait;

use crate::models::{Denied, ResourceKind, StreamHandle};

/// Source of camera and microphone streams.
///
/// `request_stream` may suspend while the user answers a permission prompt.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    async fn request_stream(&self, kind: ResourceKind) -> Result<StreamHandle, Denied>;

    /// Stops every track of the stream. Must tolerate repeated calls.
    fn stop_tracks(&self, handle: &StreamHandle);
}
