/// FEATURE_FILE_VERSION is the on-disk feature container version tag.
pub const FEATURE_FILE_VERSION: u8 = 1;

/// PRE_EMPHASIS_SCALE converts the integer pre-emphasis percentage into a coefficient.
pub(crate) const PRE_EMPHASIS_SCALE: i32 = 100;

/// WINDOW_SCALE is the fixed-point scale of the precomputed Hamming window.
pub(crate) const WINDOW_SCALE: f32 = 10_000.0;

/// DCT_SCALE is the fixed-point scale of the precomputed DCT-II table.
pub(crate) const DCT_SCALE: f32 = 10_000.0;

/// NORMALIZE_SCALE is the gain applied when quantising standardised features to i16.
pub(crate) const NORMALIZE_SCALE: f32 = 1_000.0;

/// DISTANCE_SCALE maps the [0, 2] cosine distance onto the [0, 2000] integer range.
pub(crate) const DISTANCE_SCALE: f32 = 1_000.0;

/// DEFAULT_DISTANCE_THRESHOLD is the DTW distance below which two utterances
/// are considered the same keyword. Empirical; tune per deployment.
pub const DEFAULT_DISTANCE_THRESHOLD: u32 = 180;

/// DEFAULT_MAX_UTTERANCE_MS bounds the capture buffer of a [`crate::KeywordMatcher`].
pub const DEFAULT_MAX_UTTERANCE_MS: u32 = 3_000;

/// ENERGY_CLASSIFIER_WINDOW is the number of past frame energies the default
/// classifier tracks when estimating the noise floor.
pub(crate) const ENERGY_CLASSIFIER_WINDOW: usize = 50;

/// ENERGY_CLASSIFIER_MIN_ENERGY is the absolute mean-square energy below which
/// a frame is never classified as speech.
pub(crate) const ENERGY_CLASSIFIER_MIN_ENERGY: f32 = 1.0e4;
