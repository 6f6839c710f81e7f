use thiserror::Error;

use crate::models::ResourceKind;

pub type MonitorResult<T> = Result<T, MonitorError>;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("{resource} access denied")]
    PermissionDenied { resource: ResourceKind },

    #[error("feedback rating {value} is outside 1..=5")]
    InvalidRating { value: i64 },

    #[error("monitoring is already active")]
    SchedulerAlreadyActive,

    #[error("no feedback has been requested")]
    NoFeedbackRequested,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl MonitorError {
    /// Short message suitable for the dismissible error banner.
    pub fn user_message(&self) -> String {
        match self {
            MonitorError::PermissionDenied { resource } => {
                format!("{} access denied", resource.device_name())
            }
            other => other.to_string(),
        }
    }
}
