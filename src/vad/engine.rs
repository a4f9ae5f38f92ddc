//! Voice activity detection state machine and segment capture.

use thiserror::Error;

use super::classifier::{EnergyClassifier, FrameClassifier, FrameDecision};
use crate::config::{ConfigError, VadConfig};

/// Failure while building a VAD engine.
#[derive(Debug, Error)]
pub enum VadError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Detection phase. The order is meaningful: clients test
/// `state >= VadState::Speech` to ask "is a segment committed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VadState {
    /// Hardware settling; frames are discarded.
    Warmup,
    /// One-tick transition into detection.
    Setup,
    /// No speech at the moment.
    Silence,
    /// Speech heard, deciding whether it is more than a transient noise.
    PreDetection,
    /// Committed speech segment.
    Speech,
    /// Speech paused, deciding whether the segment has ended.
    PostDetection,
    /// Segment complete; only [`VadEngine::reset`] leaves this state.
    Detected,
}

/// Six-state voice activity detector.
///
/// Feed 10 ms frames through [`process`](Self::process) (state only) or
/// [`detect`](Self::detect) (state plus a contiguous copy of the
/// captured segment). After `Detected`, call [`reset`](Self::reset) to
/// arm for the next utterance.
pub struct VadEngine {
    config: VadConfig,
    classifier: Box<dyn FrameClassifier>,
    state: VadState,
    /// Frames since the current state was entered.
    state_count: usize,
    /// Frames included in the growing segment.
    frame_count: usize,
    has_satisfied_hangbefore: bool,
}

impl VadEngine {
    /// Build an engine with the bundled [`EnergyClassifier`].
    pub fn new(config: VadConfig) -> Result<Self, VadError> {
        let classifier = Box::new(EnergyClassifier::new(config.mode));
        Self::with_classifier(config, classifier)
    }

    /// Build an engine around a caller-supplied classifier.
    pub fn with_classifier(
        config: VadConfig,
        classifier: Box<dyn FrameClassifier>,
    ) -> Result<Self, VadError> {
        config.validate()?;
        log::debug!(
            "vad engine ready: frame={}samp hangbefore={}ms decision={}ms hangover={}ms",
            config.frame_length(),
            config.hangbefore_ms,
            config.decision_time_ms,
            config.hangover_ms
        );
        Ok(Self {
            config,
            classifier,
            state: VadState::Warmup,
            state_count: 0,
            frame_count: 0,
            has_satisfied_hangbefore: false,
        })
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &VadConfig {
        &self.config
    }

    /// The state after the last processed frame.
    pub fn state(&self) -> VadState {
        self.state
    }

    /// Samples currently retained in the segment.
    pub fn segment_length(&self) -> usize {
        self.config.frame_length() * self.frame_count
    }

    /// Return to `Warmup` with all counters cleared.
    pub fn reset(&mut self) {
        self.state = VadState::Warmup;
        self.state_count = 0;
        self.frame_count = 0;
        self.has_satisfied_hangbefore = false;
        self.classifier.reset();
    }

    /// Advance the state machine by one frame and return the new state.
    ///
    /// `frame` must hold exactly [`VadConfig::frame_length`] samples.
    /// The classifier is consulted only once the hangbefore window has
    /// been observed; earlier frames count as non-speech unheard.
    pub fn process(&mut self, frame: &[i16]) -> VadState {
        debug_assert_eq!(frame.len(), self.config.frame_length());

        let frame_length = self.config.frame_length();
        self.state_count += 1;
        let state_length = frame_length * self.state_count;
        let is_speech = self.has_satisfied_hangbefore
            && self.classifier.classify(frame, self.config.sample_rate) == FrameDecision::Speech;

        match self.state {
            VadState::Warmup => {
                if state_length >= self.config.warmup_length() {
                    self.state_count = 0;
                    self.state = VadState::Setup;
                }
            }
            VadState::Setup => {
                self.state_count = 0;
                self.state = VadState::Silence;
            }
            VadState::Silence => {
                if !self.has_satisfied_hangbefore {
                    self.frame_count += 1;
                    if state_length >= self.config.before_length() {
                        self.has_satisfied_hangbefore = true;
                    }
                } else if is_speech {
                    self.state_count = 0;
                    self.frame_count += 1;
                    self.state = VadState::PreDetection;
                }
            }
            VadState::PreDetection => {
                if is_speech {
                    let pass_count = self.config.decision_length().div_ceil(frame_length);
                    self.frame_count += 1;
                    if self.state_count >= pass_count {
                        self.state_count = 0;
                        self.state = VadState::Speech;
                        log::debug!("speech committed after {} frames", self.frame_count);
                    }
                } else {
                    // Transient noise: retract every tentative frame.
                    self.frame_count -= self.state_count;
                    self.state_count = 0;
                    self.state = VadState::Silence;
                }
            }
            VadState::Speech => {
                self.frame_count += 1;
                if !is_speech {
                    self.state_count = 0;
                    self.state = VadState::PostDetection;
                }
            }
            VadState::PostDetection => {
                self.frame_count += 1;
                if is_speech {
                    self.state_count = 0;
                    self.state = VadState::Speech;
                } else {
                    let over_count = self.config.over_length().div_ceil(frame_length);
                    if self.state_count >= over_count {
                        self.state_count = 0;
                        self.state = VadState::Detected;
                        log::debug!(
                            "segment detected: {} samples",
                            frame_length * self.frame_count
                        );
                    }
                }
            }
            VadState::Detected => {}
        }
        self.state
    }

    /// Advance the state machine while keeping `dest[..segment_length()]`
    /// a contiguous copy of the captured audio.
    ///
    /// Returns `Some(samples)` once the segment is complete: on
    /// `Detected`, or early when `dest` cannot take another frame while
    /// speech is already committed. Returns `None` while detection is
    /// still in progress (including when `dest` is too small before any
    /// speech was committed).
    pub fn detect(&mut self, dest: &mut [i16], frame: &[i16]) -> Option<usize> {
        let frame_length = self.config.frame_length();
        let sound_length = frame_length * self.frame_count;

        if self.state == VadState::Detected {
            return Some(sound_length);
        }
        if dest.len() < sound_length + frame_length {
            if self.state >= VadState::Speech {
                log::warn!("capture buffer full at {sound_length} samples, completing segment");
                return Some(sound_length);
            }
            return None;
        }

        let prev_frame_count = self.frame_count;
        let state = self.process(frame);

        if self.frame_count == prev_frame_count + 1 {
            // Segment grew: append the newest frame.
            dest[sound_length..sound_length + frame_length].copy_from_slice(frame);
        } else if state == VadState::Silence && prev_frame_count >= self.frame_count {
            // Retract or steady silence: slide the retained window left and
            // keep the newest frame at the tail.
            let shift_count = prev_frame_count - self.frame_count + 1;
            let shift_length = frame_length * shift_count;
            if sound_length > shift_length {
                dest.copy_within(shift_length..sound_length, 0);
                let tail = sound_length - shift_length;
                dest[tail..tail + frame_length].copy_from_slice(frame);
            }
        }

        if state == VadState::Detected {
            Some(frame_length * self.frame_count)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VadMode;

    /// Classifier that replays a fixed script of decisions.
    struct Scripted {
        decisions: Vec<FrameDecision>,
        cursor: usize,
    }

    impl Scripted {
        fn new(decisions: Vec<FrameDecision>) -> Self {
            Self {
                decisions,
                cursor: 0,
            }
        }
    }

    impl FrameClassifier for Scripted {
        fn classify(&mut self, _frame: &[i16], _sample_rate: u32) -> FrameDecision {
            let decision = self.decisions[self.cursor % self.decisions.len()];
            self.cursor += 1;
            decision
        }
    }

    fn scripted_engine(config: VadConfig, decisions: Vec<FrameDecision>) -> VadEngine {
        VadEngine::with_classifier(config, Box::new(Scripted::new(decisions)))
            .expect("valid config")
    }

    fn config() -> VadConfig {
        VadConfig {
            warmup_time_ms: 0,
            hangbefore_ms: 100,
            decision_time_ms: 200,
            hangover_ms: 200,
            sample_rate: 16_000,
            mode: VadMode::Level0,
        }
    }

    const FRAME: [i16; 160] = [0i16; 160];

    #[test]
    fn state_ordering_is_meaningful() {
        assert!(VadState::Warmup < VadState::Setup);
        assert!(VadState::Silence < VadState::PreDetection);
        assert!(VadState::PreDetection < VadState::Speech);
        assert!(VadState::Speech < VadState::PostDetection);
        assert!(VadState::PostDetection < VadState::Detected);
    }

    #[test]
    fn walks_the_full_detection_path() {
        // The classifier is only consulted once hangbefore is satisfied,
        // so the script covers consultations: 38 non-speech (the tail of
        // 50 silent frames), 30 speech, then non-speech until detection.
        let mut script = vec![FrameDecision::NonSpeech; 38];
        script.extend(vec![FrameDecision::Speech; 30]);
        script.extend(vec![FrameDecision::NonSpeech; 25]);
        let mut engine = scripted_engine(config(), script);

        // Warmup of zero resolves on the first frame, setup on the second.
        assert_eq!(engine.process(&FRAME), VadState::Setup);
        assert_eq!(engine.process(&FRAME), VadState::Silence);

        // Ten frames of silence satisfy the 100 ms hangbefore. The
        // scripted classifier is not consulted until then.
        for _ in 0..10 {
            assert_eq!(engine.process(&FRAME), VadState::Silence);
        }
        assert_eq!(engine.frame_count, 10);

        // Classifier now runs; its script still says non-speech. Skip to
        // the speech portion of the script.
        for _ in 0..38 {
            assert_eq!(engine.process(&FRAME), VadState::Silence);
        }
        assert_eq!(engine.frame_count, 10);

        // 200 ms decision window: entry frame plus 20 PreDetection frames.
        assert_eq!(engine.process(&FRAME), VadState::PreDetection);
        for _ in 0..19 {
            assert_eq!(engine.process(&FRAME), VadState::PreDetection);
        }
        assert_eq!(engine.process(&FRAME), VadState::Speech);

        // Remaining speech frames stay in Speech.
        for _ in 0..9 {
            assert_eq!(engine.process(&FRAME), VadState::Speech);
        }
        assert_eq!(engine.frame_count, 40);

        // First non-speech frame opens PostDetection; 200 ms of further
        // silence closes the segment.
        assert_eq!(engine.process(&FRAME), VadState::PostDetection);
        for _ in 0..19 {
            assert_eq!(engine.process(&FRAME), VadState::PostDetection);
        }
        assert_eq!(engine.process(&FRAME), VadState::Detected);
        assert_eq!(engine.frame_count, 61);
        assert_eq!(engine.segment_length(), 61 * 160);

        // Detected is sticky.
        assert_eq!(engine.process(&FRAME), VadState::Detected);
        assert_eq!(engine.frame_count, 61);
    }

    #[test]
    fn transient_noise_is_retracted() {
        // Speech for fewer frames than the decision window, then silence.
        let mut script = vec![FrameDecision::NonSpeech; 20];
        script.extend(vec![FrameDecision::Speech; 5]);
        script.extend(vec![FrameDecision::NonSpeech; 50]);
        let mut engine = scripted_engine(config(), script);

        engine.process(&FRAME);
        engine.process(&FRAME);
        for _ in 0..30 {
            engine.process(&FRAME);
        }
        let baseline = engine.frame_count;

        for _ in 0..5 {
            assert_eq!(engine.process(&FRAME), VadState::PreDetection);
        }
        assert_eq!(engine.frame_count, baseline + 5);

        // One non-speech frame drops the tentative segment entirely.
        assert_eq!(engine.process(&FRAME), VadState::Silence);
        assert_eq!(engine.frame_count, baseline);
    }

    #[test]
    fn frame_count_monotone_through_speech_states() {
        let mut script = vec![FrameDecision::NonSpeech; 15];
        script.extend(vec![FrameDecision::Speech; 40]);
        // Alternate pauses shorter than the hangover.
        script.extend(vec![FrameDecision::NonSpeech; 5]);
        script.extend(vec![FrameDecision::Speech; 10]);
        script.extend(vec![FrameDecision::NonSpeech; 40]);
        let mut engine = scripted_engine(config(), script);

        let mut last = 0usize;
        let mut in_speech = false;
        for _ in 0..120 {
            let state = engine.process(&FRAME);
            if state >= VadState::Speech {
                if in_speech {
                    assert!(engine.frame_count >= last);
                }
                in_speech = true;
                last = engine.frame_count;
            }
            if state == VadState::Detected {
                break;
            }
        }
        assert!(in_speech);
    }

    #[test]
    fn reset_rearms_from_any_state() {
        let mut engine = scripted_engine(config(), vec![FrameDecision::Speech]);
        for _ in 0..80 {
            engine.process(&FRAME);
        }
        engine.reset();
        assert_eq!(engine.state(), VadState::Warmup);
        assert_eq!(engine.frame_count, 0);
        assert_eq!(engine.state_count, 0);
        assert!(!engine.has_satisfied_hangbefore);
    }

    #[test]
    fn detect_captures_the_segment() {
        let mut script = vec![FrameDecision::NonSpeech; 20];
        script.extend(vec![FrameDecision::Speech; 30]);
        script.extend(vec![FrameDecision::NonSpeech; 25]);
        let mut engine = scripted_engine(config(), script);

        let mut dest = vec![0i16; 16_000 * 3];
        let mut completed = None;
        for tick in 0..120 {
            // Stamp each frame so capture order is visible.
            let frame = [tick as i16; 160];
            if let Some(samples) = engine.detect(&mut dest, &frame) {
                completed = Some((tick, samples));
                break;
            }
        }

        let (_tick, samples) = completed.expect("segment must complete");
        assert_eq!(samples, engine.segment_length());
        assert_eq!(samples % 160, 0);

        // The capture must be contiguous 160-sample runs of increasing
        // stamps: sliding silence, then speech, then hangover.
        let stamps: Vec<i16> = dest[..samples].chunks_exact(160).map(|c| c[0]).collect();
        for pair in stamps.windows(2) {
            assert_eq!(pair[1], pair[0] + 1, "capture not contiguous: {stamps:?}");
        }
    }

    #[test]
    fn detect_retract_restores_previous_length() {
        let mut script = vec![FrameDecision::NonSpeech; 20];
        script.extend(vec![FrameDecision::Speech; 4]);
        script.extend(vec![FrameDecision::NonSpeech; 40]);
        let mut engine = scripted_engine(config(), script);

        let mut dest = vec![0i16; 16_000];
        let mut lengths = Vec::new();
        for tick in 0..40 {
            let frame = [tick as i16; 160];
            engine.detect(&mut dest, &frame);
            lengths.push(engine.segment_length());
        }

        // Hangbefore holds ten frames; the tentative speech grows to
        // fourteen and collapses back to ten.
        let max = *lengths.iter().max().expect("non-empty");
        assert_eq!(max, 14 * 160);
        assert_eq!(*lengths.last().expect("non-empty"), 10 * 160);
    }

    #[test]
    fn detect_reports_not_ready_when_buffer_too_small_before_speech() {
        let mut engine = scripted_engine(config(), vec![FrameDecision::NonSpeech]);
        // Room for just two frames; silence alone can never complete.
        let mut dest = vec![0i16; 320];
        for _ in 0..30 {
            assert_eq!(engine.detect(&mut dest, &FRAME), None);
        }
        assert!(engine.state() < VadState::Speech);
    }

    #[test]
    fn detect_completes_early_when_buffer_fills_during_speech() {
        let mut script = vec![FrameDecision::NonSpeech; 20];
        script.extend(vec![FrameDecision::Speech; 200]);
        let mut engine = scripted_engine(config(), script);

        // Buffer bounded well below the endless speech script.
        let mut dest = vec![0i16; 160 * 40];
        let mut result = None;
        for _ in 0..300 {
            if let Some(samples) = engine.detect(&mut dest, &FRAME) {
                result = Some(samples);
                break;
            }
        }
        let samples = result.expect("forced completion");
        assert!(samples <= dest.len());
        assert!(engine.state() >= VadState::Speech);
        assert_ne!(engine.state(), VadState::Detected);
    }
}
