//! voxmatch – keyword-style voice matching
//! ========================================
//! Decide whether a short utterance matches a previously enrolled
//! reference, on 16-bit PCM at 8 or 16 kHz. Three cooperating pieces:
//!
//! * a [`VadEngine`] that segments the stream into speech regions and
//!   captures the segment audio,
//! * an [`MfccEngine`] that turns a segment into a compact, standardised
//!   cepstral feature matrix ([`MfccFeature`], persistable as a small
//!   versioned binary file),
//! * a [`dtw`] distance that scores two feature matrices.
//!
//! [`KeywordMatcher`] wires the three together for the common
//! enroll-then-compare flow:
//!
//! ```no_run
//! use voxmatch::{KeywordMatcher, MfccConfig, VadConfig};
//!
//! let mut matcher = KeywordMatcher::new(VadConfig::default(), MfccConfig::default())?;
//! # let frames: Vec<Vec<i16>> = Vec::new();
//! for frame in &frames {
//!     if let Some(samples) = matcher.push(frame) {
//!         let outcome = matcher.compare_segment(samples)?;
//!         println!("distance {} matched {}", outcome.distance, outcome.matched);
//!         matcher.reset();
//!     }
//! }
//! # Ok::<(), voxmatch::MatcherError>(())
//! ```
//!
//! Everything is synchronous and single-threaded; engines operate on
//! caller-owned buffers and distinct instances are independent.
#![deny(unsafe_code)]

pub mod config;
pub mod constants;
pub mod dtw;
pub mod matcher;
pub mod mfcc;
pub mod vad;

pub use config::{ConfigError, MfccConfig, VadConfig, VadMode};
pub use constants::{DEFAULT_DISTANCE_THRESHOLD, DEFAULT_MAX_UTTERANCE_MS, FEATURE_FILE_VERSION};
pub use matcher::{KeywordMatcher, MatchOutcome, MatcherError};
pub use mfcc::{FeatureIoError, MfccEngine, MfccError, MfccFeature, SoundFeature};
pub use vad::{EnergyClassifier, FrameClassifier, FrameDecision, VadEngine, VadError, VadState};
