//! MFCC front-end.
//!
//! Per frame: integer pre-emphasis, Hamming window, real FFT, power
//! spectrum, Mel filter bank, log compression, DCT-II. Per utterance:
//! frame partitioning followed by whole-matrix mean/variance
//! standardisation quantised into i16.

use std::sync::Arc;

use rustfft::{num_complex::Complex32, Fft, FftPlanner};
use thiserror::Error;

use super::feature::MfccFeature;
use super::tables;
use crate::config::{ConfigError, MfccConfig};
use crate::constants::{DCT_SCALE, NORMALIZE_SCALE, PRE_EMPHASIS_SCALE, WINDOW_SCALE};

/// Returned whenever the MFCC engine is mis-used or mis-configured.
#[derive(Debug, Error)]
pub enum MfccError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// Frame length does not match the configured frame size.
    #[error("frame length ({given}) must equal configured frame size ({expected})")]
    BadFrame {
        /// The provided frame length.
        given: usize,
        /// The expected frame length.
        expected: usize,
    },
    /// Output slice is too small for the extracted coefficients.
    #[error("output slice too small (need {need}, got {got})")]
    OutTooSmall {
        /// Required output slice size.
        need: usize,
        /// Actual output slice size.
        got: usize,
    },
}

/// MFCC extraction engine.
///
/// All tables and scratch buffers are allocated in [`new`](Self::new);
/// extraction itself never touches the heap. Construction is
/// all-or-nothing: a failed `new` leaves nothing behind.
///
/// ```no_run
/// use voxmatch::{MfccConfig, MfccEngine};
///
/// let mut engine = MfccEngine::new(MfccConfig::default())?;
/// let pcm = vec![0i16; 16_000];
/// if let Some(feature) = engine.create_from_audio(&pcm) {
///     println!("{} frames of {} coefficients", feature.frames(), feature.dim());
/// }
/// # Ok::<(), voxmatch::MfccError>(())
/// ```
pub struct MfccEngine {
    config: MfccConfig,

    // precomputed tables
    window: Vec<i16>,
    mel_position: Vec<i16>,
    dct_table: Vec<i16>,

    // cached DSP bits
    fft: Arc<dyn Fft<f32>>,
    fft_buf: Vec<Complex32>,

    // scratch, reused between calls
    power: Vec<f32>,
    mel: Vec<f32>,
}

impl MfccEngine {
    /// Build an engine for `config`, rejecting any out-of-range value.
    pub fn new(config: MfccConfig) -> Result<Self, MfccError> {
        config.validate()?;

        let frame_length = config.frame_length();
        let window = tables::hamming_window(frame_length);
        let mel_position = tables::mel_positions(config.sample_rate, config.fft_num, config.mel_channel);
        let dct_table = tables::dct_table(config.coef_num, config.mel_channel);

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(config.fft_num);

        log::debug!(
            "mfcc engine ready: fft={} mel={} coef={} frame={}samp hop={}samp",
            config.fft_num,
            config.mel_channel,
            config.coef_num,
            frame_length,
            config.hop_length()
        );

        Ok(Self {
            window,
            mel_position,
            dct_table,
            fft,
            fft_buf: vec![Complex32::ZERO; config.fft_num],
            power: vec![0.0; config.fft_num / 2],
            mel: vec![0.0; config.mel_channel],
            config,
        })
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &MfccConfig {
        &self.config
    }

    /// Compute `coef_num` cepstral coefficients for one PCM frame.
    ///
    /// `frame` must hold exactly [`MfccConfig::frame_length`] samples;
    /// `mfcc` receives the unstandardised float coefficients.
    pub fn calculate(&mut self, frame: &[i16], mfcc: &mut [f32]) -> Result<(), MfccError> {
        let frame_length = self.config.frame_length();
        if frame.len() != frame_length {
            return Err(MfccError::BadFrame {
                given: frame.len(),
                expected: frame_length,
            });
        }
        let coef_num = self.config.coef_num;
        if mfcc.len() < coef_num {
            return Err(MfccError::OutTooSmall {
                need: coef_num,
                got: mfcc.len(),
            });
        }

        // 1) Pre-emphasis + window. The integer division mirrors the
        //    quantised coefficient; `prev` tracks the unemphasised sample.
        let pre_emphasis = self.config.pre_emphasis as i32;
        let mut prev = 0i32;
        for (slot, (&sample, &w)) in self
            .fft_buf
            .iter_mut()
            .zip(frame.iter().zip(&self.window))
        {
            let current = sample as i32;
            let emphasised = current - pre_emphasis * prev / PRE_EMPHASIS_SCALE;
            *slot = Complex32::new(emphasised as f32 * w as f32 / WINDOW_SCALE, 0.0);
            prev = current;
        }
        for slot in &mut self.fft_buf[frame_length..] {
            *slot = Complex32::ZERO;
        }

        // 2) Real spectrum via the planned FFT.
        self.fft.process(&mut self.fft_buf);

        // 3) Power spectrum over bins 0..fft_num/2.
        for (p, c) in self.power.iter_mut().zip(&self.fft_buf) {
            *p = c.re * c.re + c.im * c.im;
        }

        // 4) Mel filter bank. The rising arm adds its increment before each
        //    bin, the falling arm subtracts first, so coincident positions
        //    contribute nothing (the range is empty and the infinite slope
        //    is never applied).
        let mel_channel = self.config.mel_channel;
        for i in 1..=mel_channel {
            let lo = self.mel_position[i - 1] as usize;
            let mid = self.mel_position[i] as usize;
            let hi = self.mel_position[i + 1] as usize;

            let increment = 1.0 / (mid - lo) as f32;
            let mut coef = 0.0f32;
            let mut acc = 0.0f32;
            for &p in &self.power[lo..mid] {
                coef += increment;
                acc += coef * p;
            }
            let decrement = 1.0 / (hi - mid) as f32;
            for &p in &self.power[mid..hi] {
                coef -= decrement;
                acc += coef * p;
            }
            self.mel[i - 1] = acc;
        }

        // 5) Log compression, floored so an empty band stays finite.
        for m in &mut self.mel {
            *m = 10.0 * (*m + f32::MIN_POSITIVE).log10();
        }

        // 6) DCT-II, DC dropped by table construction.
        for (i, out) in mfcc.iter_mut().enumerate().take(coef_num) {
            let basis = &self.dct_table[i * mel_channel..(i + 1) * mel_channel];
            let mut acc = 0.0f32;
            for (&b, &m) in basis.iter().zip(&self.mel) {
                acc += m * b as f32 / DCT_SCALE;
            }
            *out = acc;
        }
        Ok(())
    }

    /// Build a standardised feature from a whole utterance.
    ///
    /// Frames are taken every [`MfccConfig::hop_length`] samples; trailing
    /// audio that does not fill a frame is dropped. Returns `None` when
    /// the audio is too short for a single frame.
    pub fn create_from_audio(&mut self, audio: &[i16]) -> Option<MfccFeature> {
        let frame_length = self.config.frame_length();
        let hop_length = self.config.hop_length();
        let coef_num = self.config.coef_num;

        let frame_num =
            (audio.len() as isize - (frame_length - hop_length) as isize) / hop_length as isize;
        if frame_num <= 0 {
            log::debug!("audio too short for a frame: {} samples", audio.len());
            return None;
        }
        let frame_num = frame_num as usize;

        let mut coeffs = vec![0.0f32; frame_num * coef_num];
        for f in 0..frame_num {
            let start = f * hop_length;
            let frame = &audio[start..start + frame_length];
            self.calculate(frame, &mut coeffs[f * coef_num..(f + 1) * coef_num])
                .ok()?;
        }

        let mut values = vec![0i16; frame_num * coef_num];
        normalize(&coeffs, &mut values);
        MfccFeature::new(frame_num, coef_num, values)
    }

    /// Build a standardised feature from precomputed float coefficients.
    ///
    /// Returns `None` when the matrix is empty or `coeffs` does not hold
    /// `frame_num * coef_num` values.
    pub fn create_from_frames(
        coeffs: &[f32],
        frame_num: usize,
        coef_num: usize,
    ) -> Option<MfccFeature> {
        if frame_num == 0 || coef_num == 0 || coeffs.len() != frame_num * coef_num {
            return None;
        }
        let mut values = vec![0i16; coeffs.len()];
        normalize(coeffs, &mut values);
        MfccFeature::new(frame_num, coef_num, values)
    }
}

/// Standardise `src` to zero mean and unit variance, then quantise with a
/// gain of 1000 into `dest`, saturating at the i16 range.
///
/// An all-equal input would make the variance vanish; it is treated as
/// unit variance so every output becomes zero.
pub fn normalize(src: &[f32], dest: &mut [i16]) {
    if src.is_empty() {
        return;
    }
    let n = src.len() as f32;
    let mean = src.iter().sum::<f32>() / n;
    let sum_sq = src
        .iter()
        .map(|&v| {
            let d = v - mean;
            d * d
        })
        .sum::<f32>();
    let stddev = if sum_sq.abs() < f32::EPSILON {
        1.0
    } else {
        (sum_sq / n).sqrt()
    };

    for (d, &v) in dest.iter_mut().zip(src) {
        let scaled = NORMALIZE_SCALE * (v - mean) / stddev;
        *d = scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
    }
}
