pub mod controller;
pub mod liveness;
mod loop_worker;
pub mod source;

use std::sync::Arc;

use crate::models::Sample;

/// Invoked synchronously once per tick with the freshly produced sample.
pub type TickCallback = Arc<dyn Fn(Sample) + Send + Sync>;

pub use controller::SampleScheduler;
pub use liveness::LivenessToken;
pub use source::{RandomSampleSource, SampleSource, ScriptedSampleSource};
