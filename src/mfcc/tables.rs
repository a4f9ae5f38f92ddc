//! Integer-scaled tables precomputed at engine construction.
//!
//! Window and DCT coefficients are stored as `i16` scaled by 10 000, Mel
//! filter triangles as FFT-bin indices. Keeping the fixed-point scales
//! exact matters: quantised features written by one build must compare
//! byte-for-byte against features written by another.

use std::f32::consts::PI;

use crate::constants::{DCT_SCALE, WINDOW_SCALE};

/// Hamming window, scaled by 10 000.
pub(crate) fn hamming_window(length: usize) -> Vec<i16> {
    (0..length)
        .map(|i| {
            let w = 0.54 - 0.46 * (2.0 * PI * i as f32 / (length - 1) as f32).cos();
            (WINDOW_SCALE * w).round() as i16
        })
        .collect()
}

fn hz_to_mel(freq: f32) -> f32 {
    2595.0 * (freq / 700.0 + 1.0).ln()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * ((mel / 2595.0).exp() - 1.0)
}

/// FFT-bin positions of the Mel triangle endpoints.
///
/// The triangles share edges: the falling arm of filter `i` spans the same
/// bins as the rising arm of filter `i + 1`, so the centre positions fully
/// determine the bank. Index 0 is pinned to bin 0 and index
/// `mel_channel + 1` to `fft_num / 2` (Nyquist).
pub(crate) fn mel_positions(sample_rate: u32, fft_num: usize, mel_channel: usize) -> Vec<i16> {
    let nyquist = (sample_rate / 2) as f32;
    let mel_nyquist = hz_to_mel(nyquist);
    let delta_mel = mel_nyquist / (mel_channel + 1) as f32;
    let delta_freq = sample_rate as f32 / fft_num as f32;

    let mut position = vec![0i16; mel_channel + 2];
    for (i, slot) in position.iter_mut().enumerate().take(mel_channel + 1).skip(1) {
        let center_freq = mel_to_hz(i as f32 * delta_mel);
        *slot = (center_freq / delta_freq).round() as i16;
    }
    position[0] = 0;
    position[mel_channel + 1] = (fft_num / 2) as i16;
    position
}

/// DCT-II table, scaled by 10 000. Row `i` holds the basis for cepstral
/// coefficient `i + 1`; the DC basis is skipped outright.
pub(crate) fn dct_table(coef_num: usize, mel_channel: usize) -> Vec<i16> {
    let mut table = vec![0i16; coef_num * mel_channel];
    for i in 0..coef_num {
        for j in 0..mel_channel {
            let basis = (PI / mel_channel as f32 * (j as f32 + 0.5) * (i + 1) as f32).cos();
            table[i * mel_channel + j] = (DCT_SCALE * basis).round() as i16;
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hamming_window_is_symmetric() {
        for length in [256usize, 512] {
            let window = hamming_window(length);
            for i in 0..length {
                let diff = (window[i] as i32 - window[length - 1 - i] as i32).abs();
                assert!(diff <= 1, "asymmetry at {i}: {diff}");
            }
        }
    }

    #[test]
    fn hamming_window_endpoints() {
        let window = hamming_window(512);
        // 0.54 - 0.46 = 0.08 at both ends, 10 000 * 0.08 = 800.
        assert_eq!(window[0], 800);
        assert_eq!(window[511], 800);
        // Peak near the middle approaches 1.0.
        assert!(window[255] >= 9990);
    }

    #[test]
    fn mel_positions_are_monotone_with_pinned_endpoints() {
        for (rate, fft_num) in [(16_000u32, 512usize), (8_000, 256), (16_000, 1024)] {
            let positions = mel_positions(rate, fft_num, 24);
            assert_eq!(positions.len(), 26);
            assert_eq!(positions[0], 0);
            assert_eq!(positions[25], (fft_num / 2) as i16);
            for pair in positions.windows(2) {
                assert!(pair[0] <= pair[1], "positions not monotone: {positions:?}");
            }
        }
    }

    #[test]
    fn dct_table_drops_dc_row() {
        let table = dct_table(12, 24);
        assert_eq!(table.len(), 12 * 24);
        // Row 0 is the first non-DC basis: cos(pi * 0.5 / 24) ~ 0.99786.
        assert_eq!(table[0], 9979);
        // A DC row would be all 10 000; no row may be constant.
        for i in 0..12 {
            let row = &table[i * 24..(i + 1) * 24];
            assert!(row.iter().any(|&v| v != row[0]));
        }
    }
}
