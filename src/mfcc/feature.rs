//! Quantised feature container and its on-disk codec.
//!
//! The file layout is fixed and little-endian:
//!
//! | offset | size | field |
//! |--------|------|-------|
//! | 0      | 1    | version tag (currently 1) |
//! | 1      | 4    | frame count, i32 |
//! | 5      | 4    | coefficient count, i32 |
//! | 9      | 2·frames·coefs | row-major i16 matrix |
//!
//! Readers refuse tags they do not know; a future format revision must
//! bump the tag rather than reinterpret the payload.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use thiserror::Error;

use crate::constants::FEATURE_FILE_VERSION;

/// Failure while reading or writing a feature file.
#[derive(Debug, Error)]
pub enum FeatureIoError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    /// The file carries a version this build does not understand.
    #[error("unsupported feature file version {0}")]
    UnsupportedVersion(u8),
    /// Header dimensions were zero or negative.
    #[error("invalid feature dimensions {frame_num}x{coef_num}")]
    BadDimensions { frame_num: i32, coef_num: i32 },
}

/// Capability the DTW distance needs from a feature sequence: a length,
/// a dimension and per-frame access to a quantised row.
pub trait SoundFeature {
    /// Number of frames in the sequence.
    fn frames(&self) -> usize;
    /// Values per frame.
    fn dim(&self) -> usize;
    /// One frame of quantised coefficients.
    fn row(&self, index: usize) -> &[i16];
}

/// A standardised, quantised MFCC matrix. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfccFeature {
    frame_num: usize,
    coef_num: usize,
    values: Vec<i16>,
}

impl MfccFeature {
    /// Build a feature from raw quantised values.
    ///
    /// Returns `None` when the dimensions are zero or do not match the
    /// value count.
    pub fn new(frame_num: usize, coef_num: usize, values: Vec<i16>) -> Option<Self> {
        if frame_num == 0 || coef_num == 0 || values.len() != frame_num * coef_num {
            return None;
        }
        Some(Self {
            frame_num,
            coef_num,
            values,
        })
    }

    /// Number of frames in the matrix.
    pub fn frames(&self) -> usize {
        self.frame_num
    }

    /// Coefficients per frame.
    pub fn dim(&self) -> usize {
        self.coef_num
    }

    /// One frame of quantised coefficients.
    pub fn row(&self, index: usize) -> &[i16] {
        &self.values[index * self.coef_num..(index + 1) * self.coef_num]
    }

    /// The full row-major matrix.
    pub fn values(&self) -> &[i16] {
        &self.values
    }

    /// Atomically write the feature to `path` (temp file, then rename).
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), FeatureIoError> {
        let path = path.as_ref();
        let tmp = path.with_extension("tmp");
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            self.write_to(&mut writer)?;
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Load a feature previously written by [`save_to_file`](Self::save_to_file).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, FeatureIoError> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file))
    }

    /// Serialise into an in-memory buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FeatureIoError> {
        let mut buf = Vec::with_capacity(9 + 2 * self.values.len());
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Deserialise from a buffer produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(buf: &[u8]) -> Result<Self, FeatureIoError> {
        Self::read_from(buf)
    }

    fn write_to<W: Write>(&self, mut writer: W) -> Result<(), FeatureIoError> {
        writer.write_all(&[FEATURE_FILE_VERSION])?;
        writer.write_all(&(self.frame_num as i32).to_le_bytes())?;
        writer.write_all(&(self.coef_num as i32).to_le_bytes())?;
        for value in &self.values {
            writer.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }

    fn read_from<R: Read>(mut reader: R) -> Result<Self, FeatureIoError> {
        let mut tag = [0u8; 1];
        reader.read_exact(&mut tag)?;
        if tag[0] != FEATURE_FILE_VERSION {
            return Err(FeatureIoError::UnsupportedVersion(tag[0]));
        }

        let mut word = [0u8; 4];
        reader.read_exact(&mut word)?;
        let frame_num = i32::from_le_bytes(word);
        reader.read_exact(&mut word)?;
        let coef_num = i32::from_le_bytes(word);
        if frame_num <= 0 || coef_num <= 0 {
            return Err(FeatureIoError::BadDimensions {
                frame_num,
                coef_num,
            });
        }

        let count = frame_num as usize * coef_num as usize;
        let mut raw = vec![0u8; 2 * count];
        reader.read_exact(&mut raw)?;
        let values = raw
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Ok(Self {
            frame_num: frame_num as usize,
            coef_num: coef_num as usize,
            values,
        })
    }
}

impl SoundFeature for MfccFeature {
    fn frames(&self) -> usize {
        MfccFeature::frames(self)
    }

    fn dim(&self) -> usize {
        MfccFeature::dim(self)
    }

    fn row(&self, index: usize) -> &[i16] {
        MfccFeature::row(self, index)
    }
}
