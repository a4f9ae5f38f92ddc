//! One-stop keyword matcher: VAD capture feeding the MFCC front-end,
//! compared against an enrolled reference by DTW distance.

use thiserror::Error;

use crate::config::{MfccConfig, VadConfig};
use crate::constants::{DEFAULT_DISTANCE_THRESHOLD, DEFAULT_MAX_UTTERANCE_MS};
use crate::dtw;
use crate::mfcc::{MfccEngine, MfccError, MfccFeature};
use crate::vad::{VadEngine, VadError};

/// Failure while building or driving a [`KeywordMatcher`].
#[derive(Debug, Error)]
pub enum MatcherError {
    #[error(transparent)]
    Mfcc(#[from] MfccError),
    #[error(transparent)]
    Vad(#[from] VadError),
    /// Both engines must agree on the input sample rate.
    #[error("vad sample rate ({vad}) differs from mfcc sample rate ({mfcc})")]
    SampleRateMismatch { vad: u32, mfcc: u32 },
    /// A comparison was requested with no reference enrolled.
    #[error("no reference keyword enrolled")]
    NoReference,
    /// The captured segment was too short to produce features.
    #[error("captured segment too short for feature extraction")]
    SegmentTooShort,
}

/// Result of comparing a captured utterance against the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Length-normalised DTW distance ([`dtw::INVALID_DISTANCE`] when the
    /// utterances are incomparable).
    pub distance: u32,
    /// Whether the distance cleared the configured threshold.
    pub matched: bool,
}

/// Keyword matcher wiring the detection pipeline together.
///
/// Feed 10 ms frames through [`push`](Self::push); once a segment
/// completes, turn it into the enrolled reference with
/// [`enroll_segment`](Self::enroll_segment) or score it with
/// [`compare_segment`](Self::compare_segment), then
/// [`reset`](Self::reset) for the next utterance.
pub struct KeywordMatcher {
    vad: VadEngine,
    mfcc: MfccEngine,
    capture: Vec<i16>,
    reference: Option<MfccFeature>,
    threshold: u32,
}

impl KeywordMatcher {
    /// Build a matcher with the default capture budget and threshold.
    pub fn new(vad_config: VadConfig, mfcc_config: MfccConfig) -> Result<Self, MatcherError> {
        Self::with_limits(
            vad_config,
            mfcc_config,
            DEFAULT_MAX_UTTERANCE_MS,
            DEFAULT_DISTANCE_THRESHOLD,
        )
    }

    /// Build a matcher with an explicit utterance budget and match threshold.
    pub fn with_limits(
        vad_config: VadConfig,
        mfcc_config: MfccConfig,
        max_utterance_ms: u32,
        threshold: u32,
    ) -> Result<Self, MatcherError> {
        if vad_config.sample_rate != mfcc_config.sample_rate {
            return Err(MatcherError::SampleRateMismatch {
                vad: vad_config.sample_rate,
                mfcc: mfcc_config.sample_rate,
            });
        }
        let capture_samples = (max_utterance_ms * vad_config.sample_rate / 1000) as usize;
        Ok(Self {
            vad: VadEngine::new(vad_config)?,
            mfcc: MfccEngine::new(mfcc_config)?,
            capture: vec![0i16; capture_samples],
            reference: None,
            threshold,
        })
    }

    /// Classifier frame length in samples, the unit [`push`](Self::push) expects.
    pub fn frame_length(&self) -> usize {
        self.vad.config().frame_length()
    }

    /// The enrolled reference, if any.
    pub fn reference(&self) -> Option<&MfccFeature> {
        self.reference.as_ref()
    }

    /// Enroll a previously computed reference feature.
    pub fn set_reference(&mut self, feature: MfccFeature) {
        self.reference = Some(feature);
    }

    /// Advance the detector by one 10 ms frame.
    ///
    /// Returns the captured segment length in samples once an utterance
    /// is complete, `None` while detection is still in progress.
    pub fn push(&mut self, frame: &[i16]) -> Option<usize> {
        self.vad.detect(&mut self.capture, frame)
    }

    /// Feed a whole buffer frame by frame; stops at the first completed
    /// segment. Trailing samples short of a frame are dropped.
    pub fn push_audio(&mut self, audio: &[i16]) -> Option<usize> {
        let frame_length = self.frame_length();
        for frame in audio.chunks_exact(frame_length) {
            if let Some(samples) = self.push(frame) {
                return Some(samples);
            }
        }
        None
    }

    /// Turn the completed segment of `samples` into the enrolled reference.
    pub fn enroll_segment(&mut self, samples: usize) -> Result<&MfccFeature, MatcherError> {
        let feature = self
            .mfcc
            .create_from_audio(&self.capture[..samples])
            .ok_or(MatcherError::SegmentTooShort)?;
        log::info!(
            "enrolled keyword: {} frames of {} coefficients",
            feature.frames(),
            feature.dim()
        );
        Ok(self.reference.insert(feature))
    }

    /// Score the completed segment of `samples` against the reference.
    pub fn compare_segment(&mut self, samples: usize) -> Result<MatchOutcome, MatcherError> {
        let reference = self.reference.as_ref().ok_or(MatcherError::NoReference)?;
        let candidate = self
            .mfcc
            .create_from_audio(&self.capture[..samples])
            .ok_or(MatcherError::SegmentTooShort)?;
        let distance = dtw::distance(reference, &candidate);
        let matched = distance < self.threshold;
        log::info!("keyword distance {distance} (threshold {})", self.threshold);
        Ok(MatchOutcome { distance, matched })
    }

    /// Re-arm the detector for the next utterance. The enrolled
    /// reference survives.
    pub fn reset(&mut self) {
        self.vad.reset();
    }
}
