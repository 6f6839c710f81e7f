use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Video,
    Audio,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Video => "video",
            ResourceKind::Audio => "audio",
        }
    }

    /// Name shown to the user when access fails.
    pub fn device_name(&self) -> &'static str {
        match self {
            ResourceKind::Video => "Camera",
            ResourceKind::Audio => "Microphone",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum PermissionState {
    #[default]
    Unrequested,
    Granted,
    Denied,
}

/// Opaque stream reference handed out by a media provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamHandle {
    pub kind: ResourceKind,
    pub stream_id: String,
}

impl StreamHandle {
    pub fn new(kind: ResourceKind, stream_id: impl Into<String>) -> Self {
        Self {
            kind,
            stream_id: stream_id.into(),
        }
    }
}

/// A granted media resource owned by the session until released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    pub id: Uuid,
    pub stream: StreamHandle,
}

impl ResourceHandle {
    pub fn kind(&self) -> ResourceKind {
        self.stream.kind
    }
}

/// Signal from a media provider that the user or OS refused access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Denied {
    pub kind: ResourceKind,
}
