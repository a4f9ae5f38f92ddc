//! MFCC front-end: precomputed tables, per-frame extraction, utterance
//! standardisation and the quantised feature container.

mod engine;
mod feature;
mod tables;

pub use engine::{normalize, MfccEngine, MfccError};
pub use feature::{FeatureIoError, MfccFeature, SoundFeature};
