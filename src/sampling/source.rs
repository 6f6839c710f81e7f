use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard},
};

use rand::Rng;

use crate::models::Detection;

/// Produces one detection per scheduler tick.
pub trait SampleSource: Send + Sync {
    fn detect(&self) -> Detection;
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RandomMode {
    Intensity,
    Binary { probability: f64 },
}

/// Placeholder detector drawing random values.
#[derive(Debug, Clone, Copy)]
pub struct RandomSampleSource {
    mode: RandomMode,
}

impl RandomSampleSource {
    /// Uniform intensity in 0..100.
    pub fn intensity() -> Self {
        Self {
            mode: RandomMode::Intensity,
        }
    }

    /// Stressed with the given probability, clamped to 0.0..=1.0.
    pub fn binary(probability: f64) -> Self {
        Self {
            mode: RandomMode::Binary {
                probability: probability.clamp(0.0, 1.0),
            },
        }
    }
}

impl Default for RandomSampleSource {
    fn default() -> Self {
        Self::intensity()
    }
}

impl SampleSource for RandomSampleSource {
    fn detect(&self) -> Detection {
        let mut rng = rand::thread_rng();
        match self.mode {
            RandomMode::Intensity => Detection::Intensity(rng.gen_range(0..100)),
            RandomMode::Binary { probability } => Detection::Binary(rng.gen_bool(probability)),
        }
    }
}

/// Replays a fixed sequence, then repeats `fallback` once it runs dry.
pub struct ScriptedSampleSource {
    queue: Mutex<VecDeque<Detection>>,
    fallback: Detection,
}

impl ScriptedSampleSource {
    pub fn new(script: impl IntoIterator<Item = Detection>) -> Self {
        Self {
            queue: Mutex::new(script.into_iter().collect()),
            fallback: Detection::Binary(false),
        }
    }

    pub fn with_fallback(mut self, fallback: Detection) -> Self {
        self.fallback = fallback;
        self
    }

    /// Alternating calm/stressed binary detections, starting calm.
    pub fn alternating(count: usize) -> Self {
        Self::new((0..count).map(|i| Detection::Binary(i % 2 == 1)))
    }

    pub fn remaining(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Detection>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SampleSource for ScriptedSampleSource {
    fn detect(&self) -> Detection {
        self.lock().pop_front().unwrap_or(self.fallback)
    }
}
