pub mod controller;
pub mod state;

pub use controller::{MonitoringSession, MonitoringSessionBuilder, RestoreReport};
pub use state::{SessionSnapshot, SessionState};
