//! Engine configuration.
//!
//! Both engines validate their configuration once, at construction; an
//! out-of-range value is rejected there and never repaired later.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when an engine is handed an out-of-range configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// FFT length must be a non-zero power of two.
    #[error("fft_num ({0}) must be a non-zero power of two")]
    FftNotPowerOfTwo(usize),
    /// Only 8 kHz and 16 kHz input is supported.
    #[error("unsupported sample rate {0} (expected 8000 or 16000)")]
    UnsupportedSampleRate(u32),
    /// An analysis frame has to fit into the FFT buffer.
    #[error("frame length ({frame_length}) exceeds fft_num ({fft_num})")]
    FrameExceedsFft {
        /// Derived frame length in samples.
        frame_length: usize,
        /// Configured FFT length.
        fft_num: usize,
    },
    /// At least one Mel channel is required.
    #[error("mel_channel must be at least 1")]
    NoMelChannels,
    /// Cepstral coefficient count must stay within the Mel channel count.
    #[error("coef_num ({coef_num}) must be in 1..={mel_channel}")]
    BadCoefficientCount {
        /// Requested coefficient count.
        coef_num: usize,
        /// Configured Mel channel count.
        mel_channel: usize,
    },
    /// A zero-length analysis frame is meaningless.
    #[error("frame_time_ms must be at least 1")]
    EmptyFrame,
}

/// MFCC front-end configuration.
///
/// The defaults mirror the values the feature format was tuned with:
/// a 32 ms frame is 512 samples at 16 kHz, a round number for the FFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MfccConfig {
    /// FFT length in samples (power of two).
    pub fft_num: usize,
    /// Number of triangular Mel filters.
    pub mel_channel: usize,
    /// Number of cepstral coefficients kept (the DC coefficient is dropped).
    pub coef_num: usize,
    /// Pre-emphasis coefficient in percent (97 means 0.97).
    pub pre_emphasis: u32,
    /// Input sample rate, 8000 or 16000 Hz.
    pub sample_rate: u32,
    /// Analysis frame length in milliseconds.
    pub frame_time_ms: u32,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            fft_num: 512,
            mel_channel: 24,
            coef_num: 12,
            pre_emphasis: 97,
            sample_rate: 16_000,
            frame_time_ms: 32,
        }
    }
}

impl MfccConfig {
    /// Analysis frame length in samples.
    pub fn frame_length(&self) -> usize {
        (self.frame_time_ms * self.sample_rate / 1000) as usize
    }

    /// Stride between successive frames, half a frame.
    pub fn hop_length(&self) -> usize {
        self.frame_length() / 2
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.fft_num == 0 || !self.fft_num.is_power_of_two() {
            return Err(ConfigError::FftNotPowerOfTwo(self.fft_num));
        }
        if self.sample_rate != 8_000 && self.sample_rate != 16_000 {
            return Err(ConfigError::UnsupportedSampleRate(self.sample_rate));
        }
        if self.mel_channel == 0 {
            return Err(ConfigError::NoMelChannels);
        }
        if self.coef_num == 0 || self.coef_num > self.mel_channel {
            return Err(ConfigError::BadCoefficientCount {
                coef_num: self.coef_num,
                mel_channel: self.mel_channel,
            });
        }
        if self.frame_time_ms == 0 {
            return Err(ConfigError::EmptyFrame);
        }
        if self.frame_length() > self.fft_num {
            return Err(ConfigError::FrameExceedsFft {
                frame_length: self.frame_length(),
                fft_num: self.fft_num,
            });
        }
        Ok(())
    }
}

/// Aggression level of the per-frame voice classifier.
///
/// Higher levels demand more energy above the noise floor before a frame
/// is called speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VadMode {
    /// Most permissive.
    #[default]
    Level0,
    Level1,
    Level2,
    Level3,
    /// Most aggressive.
    Level4,
}

impl VadMode {
    /// Multiplier applied to the estimated noise floor.
    pub(crate) fn threshold_factor(self) -> f32 {
        match self {
            VadMode::Level0 => 1.5,
            VadMode::Level1 => 2.0,
            VadMode::Level2 => 2.5,
            VadMode::Level3 => 3.0,
            VadMode::Level4 => 3.5,
        }
    }
}

/// Voice activity detector configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VadConfig {
    /// Time the microphone hardware needs before frames are trustworthy.
    pub warmup_time_ms: u32,
    /// Audio retained ahead of speech onset.
    pub hangbefore_ms: u32,
    /// How long speech must persist before a segment is committed to.
    pub decision_time_ms: u32,
    /// Audio retained after speech ends; also the gap that terminates a segment.
    pub hangover_ms: u32,
    /// Input sample rate, 8000 or 16000 Hz.
    pub sample_rate: u32,
    /// Classifier aggression.
    pub mode: VadMode,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            warmup_time_ms: 0,
            hangbefore_ms: 100,
            decision_time_ms: 200,
            hangover_ms: 200,
            sample_rate: 16_000,
            mode: VadMode::default(),
        }
    }
}

impl VadConfig {
    /// Classifier frame duration. Fixed; the classifier contract is a 10 ms frame.
    pub const FRAME_TIME_MS: u32 = 10;

    /// Classifier frame length in samples.
    pub fn frame_length(&self) -> usize {
        (Self::FRAME_TIME_MS * self.sample_rate / 1000) as usize
    }

    /// Warmup duration in samples.
    pub fn warmup_length(&self) -> usize {
        (self.warmup_time_ms * self.sample_rate / 1000) as usize
    }

    /// Hangbefore duration in samples.
    pub fn before_length(&self) -> usize {
        (self.hangbefore_ms * self.sample_rate / 1000) as usize
    }

    /// Decision duration in samples.
    pub fn decision_length(&self) -> usize {
        (self.decision_time_ms * self.sample_rate / 1000) as usize
    }

    /// Hangover duration in samples.
    pub fn over_length(&self) -> usize {
        (self.hangover_ms * self.sample_rate / 1000) as usize
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate != 8_000 && self.sample_rate != 16_000 {
            return Err(ConfigError::UnsupportedSampleRate(self.sample_rate));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mfcc_config_is_valid() {
        let cfg = MfccConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.frame_length(), 512);
        assert_eq!(cfg.hop_length(), 256);
    }

    #[test]
    fn mfcc_config_rejects_bad_values() {
        let mut cfg = MfccConfig {
            fft_num: 500,
            ..MfccConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::FftNotPowerOfTwo(500))
        ));

        cfg = MfccConfig {
            sample_rate: 44_100,
            ..MfccConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::UnsupportedSampleRate(44_100))
        ));

        cfg = MfccConfig {
            coef_num: 25,
            ..MfccConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::BadCoefficientCount { .. })
        ));

        // 64 ms at 16 kHz is 1024 samples, more than the 512-point FFT.
        cfg = MfccConfig {
            frame_time_ms: 64,
            ..MfccConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::FrameExceedsFft { .. })
        ));
    }

    #[test]
    fn vad_config_lengths_are_sample_counts() {
        let cfg = VadConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.frame_length(), 160);
        assert_eq!(cfg.before_length(), 1600);
        assert_eq!(cfg.decision_length(), 3200);
        assert_eq!(cfg.over_length(), 3200);
    }

    #[test]
    fn vad_config_rejects_bad_rate() {
        let cfg = VadConfig {
            sample_rate: 48_000,
            ..VadConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
