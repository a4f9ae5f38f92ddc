//! voxmatch CLI binary: enroll, compare and segment keyword utterances
//! in WAV files.

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

mod cli;
use cli::{Cli, Commands, DetectionArgs};

use voxmatch::{
    KeywordMatcher, MfccConfig, MfccFeature, VadConfig, VadEngine, VadMode, VadState,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Enroll(cmd) => enroll(cmd),
        Commands::Compare(cmd) => compare(cmd),
        Commands::Segment(cmd) => segment(cmd),
    }
}

fn enroll(cmd: cli::EnrollCommand) -> Result<()> {
    let (samples, sample_rate) = read_wav(&cmd.wav)?;
    let mut matcher = build_matcher(
        &cmd.detection,
        sample_rate,
        voxmatch::DEFAULT_DISTANCE_THRESHOLD,
    )?;

    let captured = matcher
        .push_audio(&samples)
        .context("no voice segment detected in the recording")?;
    info!("captured {captured} samples");

    let feature = matcher.enroll_segment(captured)?;
    feature
        .save_to_file(&cmd.feature)
        .with_context(|| format!("writing feature file {:?}", cmd.feature))?;
    info!(
        "saved {:?}: {} frames of {} coefficients",
        cmd.feature,
        feature.frames(),
        feature.dim()
    );
    Ok(())
}

fn compare(cmd: cli::CompareCommand) -> Result<()> {
    let reference = MfccFeature::load_from_file(&cmd.feature)
        .with_context(|| format!("reading feature file {:?}", cmd.feature))?;
    let (samples, sample_rate) = read_wav(&cmd.wav)?;

    let mut matcher = build_matcher(&cmd.detection, sample_rate, cmd.threshold)?;
    matcher.set_reference(reference);

    let captured = matcher
        .push_audio(&samples)
        .context("no voice segment detected in the recording")?;
    let outcome = matcher.compare_segment(captured)?;

    println!(
        "distance: {} -> {}",
        outcome.distance,
        if outcome.matched { "MATCH" } else { "no match" }
    );
    Ok(())
}

fn segment(cmd: cli::SegmentCommand) -> Result<()> {
    let (samples, sample_rate) = read_wav(&cmd.wav)?;
    let vad_config = vad_config(&cmd.detection, sample_rate)?;
    let frame_length = vad_config.frame_length();
    let mut engine = VadEngine::new(vad_config)?;

    for (index, frame) in samples.chunks_exact(frame_length).enumerate() {
        if engine.process(frame) == VadState::Detected {
            let end_ms = (index + 1) as u32 * VadConfig::FRAME_TIME_MS;
            let length_ms =
                (engine.segment_length() / frame_length) as u32 * VadConfig::FRAME_TIME_MS;
            println!("segment: {length_ms} ms, {} ms .. {end_ms} ms", end_ms - length_ms);
            return Ok(());
        }
    }
    bail!("no voice segment detected in the recording");
}

fn aggression_mode(level: u8) -> Result<VadMode> {
    Ok(match level {
        0 => VadMode::Level0,
        1 => VadMode::Level1,
        2 => VadMode::Level2,
        3 => VadMode::Level3,
        4 => VadMode::Level4,
        other => bail!("aggression level {other} out of range (0..=4)"),
    })
}

fn vad_config(detection: &DetectionArgs, sample_rate: u32) -> Result<VadConfig> {
    Ok(VadConfig {
        warmup_time_ms: 0,
        hangbefore_ms: detection.hangbefore_ms,
        decision_time_ms: detection.decision_ms,
        hangover_ms: detection.hangover_ms,
        sample_rate,
        mode: aggression_mode(detection.aggression)?,
    })
}

fn build_matcher(
    detection: &DetectionArgs,
    sample_rate: u32,
    threshold: u32,
) -> Result<KeywordMatcher> {
    let vad = vad_config(detection, sample_rate)?;
    let mfcc = MfccConfig {
        sample_rate,
        ..MfccConfig::default()
    };
    KeywordMatcher::with_limits(vad, mfcc, detection.max_utterance_ms, threshold)
        .context("building keyword matcher")
}

/// Read a mono 16-bit PCM WAV file at 8 or 16 kHz.
fn read_wav(path: &std::path::Path) -> Result<(Vec<i16>, u32)> {
    let reader =
        hound::WavReader::open(path).with_context(|| format!("opening WAV file {path:?}"))?;
    let spec = reader.spec();

    if spec.channels != 1 {
        bail!("{path:?}: expected mono audio, got {} channels", spec.channels);
    }
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        bail!("{path:?}: expected 16-bit integer PCM");
    }
    if spec.sample_rate != 8_000 && spec.sample_rate != 16_000 {
        bail!(
            "{path:?}: expected 8 or 16 kHz audio, got {} Hz",
            spec.sample_rate
        );
    }

    let samples = reader
        .into_samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("decoding WAV file {path:?}"))?;
    info!(
        "read {:?}: {} samples at {} Hz",
        path,
        samples.len(),
        spec.sample_rate
    );
    Ok((samples, spec.sample_rate))
}
