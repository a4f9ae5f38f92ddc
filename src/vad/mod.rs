//! Voice activity detection: the per-frame classifier interface and the
//! six-state segment detector built on top of it.

mod classifier;
mod engine;

pub use classifier::{EnergyClassifier, FrameClassifier, FrameDecision};
pub use engine::{VadEngine, VadError, VadState};
