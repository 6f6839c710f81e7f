pub mod dispatcher;
pub mod os;

pub use dispatcher::{Alert, DispatchOutcome, NotificationDispatcher};
pub use os::{NoopNotifier, OsNotifier};
