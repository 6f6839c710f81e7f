//! Stress monitoring session: device permissions, periodic sampling,
//! alerting and feedback capture behind a small async API.

pub mod db;
pub mod error;
pub mod events;
pub mod feedback;
pub mod history;
pub mod models;
pub mod monitor;
pub mod notifications;
pub mod permissions;
pub mod sampling;
pub mod settings;
pub mod utils;

pub use db::Database;
pub use error::{MonitorError, MonitorResult};
pub use events::{BufferedEventSink, EventSink, LogEventSink, MonitorEvent};
pub use feedback::FeedbackCapture;
pub use history::{ChartPoint, HistoryLog, MonitorSummary};
pub use monitor::{MonitoringSession, MonitoringSessionBuilder, RestoreReport, SessionSnapshot, SessionState};
pub use notifications::{DispatchOutcome, NoopNotifier, NotificationDispatcher, OsNotifier};
pub use permissions::{AcquireError, MediaProvider, PermissionGateway};
pub use sampling::{LivenessToken, RandomSampleSource, SampleScheduler, SampleSource, ScriptedSampleSource};
pub use settings::{MonitorConfig, SettingsStore};
pub use utils::init_logging;
