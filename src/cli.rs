//! Command line interface for the voxmatch tool.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Keyword voice matching over WAV files.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Segment a WAV file, extract the keyword and save its feature file
    Enroll(EnrollCommand),

    /// Compare a WAV file against a saved keyword feature
    Compare(CompareCommand),

    /// Print the voice segment detected in a WAV file
    Segment(SegmentCommand),
}

/// Shared detection knobs.
#[derive(Args, Debug)]
pub struct DetectionArgs {
    /// Classifier aggression level (0 = permissive .. 4 = strict)
    #[arg(long, default_value_t = 0)]
    pub aggression: u8,

    /// Audio retained ahead of speech onset, in milliseconds
    #[arg(long, default_value_t = 100)]
    pub hangbefore_ms: u32,

    /// Speech required before a segment is committed, in milliseconds
    #[arg(long, default_value_t = 200)]
    pub decision_ms: u32,

    /// Silence that terminates a segment, in milliseconds
    #[arg(long, default_value_t = 200)]
    pub hangover_ms: u32,

    /// Capture budget per utterance, in milliseconds
    #[arg(long, default_value_t = 3000)]
    pub max_utterance_ms: u32,
}

#[derive(Parser, Debug)]
pub struct EnrollCommand {
    /// WAV file holding the keyword utterance (mono, 16-bit, 8/16 kHz)
    pub wav: PathBuf,

    /// Output path for the keyword feature file
    pub feature: PathBuf,

    #[command(flatten)]
    pub detection: DetectionArgs,
}

#[derive(Parser, Debug)]
pub struct CompareCommand {
    /// Keyword feature file written by `enroll`
    pub feature: PathBuf,

    /// WAV file holding the utterance to score
    pub wav: PathBuf,

    /// DTW distance below which the utterance counts as a match
    #[arg(short, long, default_value_t = 180)]
    pub threshold: u32,

    #[command(flatten)]
    pub detection: DetectionArgs,
}

#[derive(Parser, Debug)]
pub struct SegmentCommand {
    /// WAV file to segment (mono, 16-bit, 8/16 kHz)
    pub wav: PathBuf,

    #[command(flatten)]
    pub detection: DetectionArgs,
}
