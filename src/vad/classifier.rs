//! Per-frame voice classification.
//!
//! The state machine consumes any [`FrameClassifier`]; the bundled
//! [`EnergyClassifier`] is an adaptive-energy detector that tracks the
//! noise floor over a short window of past frames.

use crate::config::VadMode;
use crate::constants::{ENERGY_CLASSIFIER_MIN_ENERGY, ENERGY_CLASSIFIER_WINDOW};

/// Verdict for a single 10 ms frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDecision {
    Speech,
    NonSpeech,
}

/// A per-frame voice/non-voice classifier over 10 ms of 16-bit PCM.
///
/// Implementations may keep internal state across frames; `reset` is
/// called whenever the surrounding engine re-arms for a new utterance.
pub trait FrameClassifier {
    /// Classify one frame at the given sample rate.
    fn classify(&mut self, frame: &[i16], sample_rate: u32) -> FrameDecision;

    /// Drop any state accumulated across frames.
    fn reset(&mut self) {}
}

/// Adaptive-energy classifier.
///
/// Keeps a ring buffer of recent frame energies and treats the window
/// minimum as the noise floor. A frame is speech when its mean-square
/// energy clears both an absolute floor and the noise floor scaled by
/// the aggression factor.
pub struct EnergyClassifier {
    factor: f32,
    window: Vec<f32>,
    index: usize,
}

impl EnergyClassifier {
    /// Build a classifier for the given aggression level.
    pub fn new(mode: VadMode) -> Self {
        Self {
            factor: mode.threshold_factor(),
            window: vec![f32::NAN; ENERGY_CLASSIFIER_WINDOW],
            index: 0,
        }
    }
}

impl FrameClassifier for EnergyClassifier {
    fn classify(&mut self, frame: &[i16], _sample_rate: u32) -> FrameDecision {
        if frame.is_empty() {
            return FrameDecision::NonSpeech;
        }

        let energy = frame
            .iter()
            .map(|&s| {
                let v = s as f32;
                v * v
            })
            .sum::<f32>()
            / frame.len() as f32;

        self.window[self.index] = energy;
        self.index = (self.index + 1) % self.window.len();

        let noise_floor = self
            .window
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(f32::INFINITY, f32::min);

        let threshold = ENERGY_CLASSIFIER_MIN_ENERGY.max(noise_floor * self.factor);
        if energy > threshold {
            FrameDecision::Speech
        } else {
            FrameDecision::NonSpeech
        }
    }

    fn reset(&mut self) {
        self.window.fill(f32::NAN);
        self.index = 0;
    }
}
