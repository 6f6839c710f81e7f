pub mod feedback;
pub mod permission;
pub mod sample;
pub mod session;

pub use feedback::{FeedbackRating, FeedbackRecord};
pub use permission::{Denied, PermissionState, ResourceHandle, ResourceKind, StreamHandle};
pub use sample::{day_bucket, Detection, HistoryEntry, Sample, StressLabel};
pub use session::{SessionRecord, SessionStatus};
