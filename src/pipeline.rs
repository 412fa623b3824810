use anyhow::Result;
use indicatif::ProgressBar;
use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::actuator::{Actuator, TriggerAction};
use crate::capture::{Frame, FrameReader};
use crate::config::Config;
use crate::dsp::classify::Classifier;
use crate::dsp::peak::{find_peak, SpectralPeak};
use crate::dsp::preprocess::Preprocessor;
use crate::dsp::spectrum::SpectralAnalyzer;
use crate::error::{AcquisitionError, ActuatorError, ConfigError};
use crate::trigger::Debouncer;

/// What one cycle saw and did.
#[derive(Clone, Copy, Debug)]
pub struct CycleOutcome {
    pub peak: SpectralPeak,
    pub detected: bool,
    pub triggered: bool,
}

/// An accepted trigger whose actuation failed.
#[derive(Debug, Error)]
#[error("trigger at {outcome_secs:.3}s not actuated: {source}")]
pub struct TriggerFailure {
    pub outcome: CycleOutcome,
    outcome_secs: f64,
    #[source]
    pub source: ActuatorError,
}

/// Frame-in, trigger-out detection chain.
pub struct Detector {
    preprocessor: Preprocessor,
    analyzer: SpectralAnalyzer,
    classifier: Classifier,
    debouncer: Debouncer,
    action: TriggerAction,
}

impl Detector {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            preprocessor: Preprocessor::new(config.detector.shift_bits),
            analyzer: SpectralAnalyzer::new(config.capture.frame_size, config.capture.sample_rate)?,
            classifier: config.classifier(),
            debouncer: Debouncer::new(config.refractory()),
            action: config.trigger_action(),
        })
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Run one frame through every stage.
    ///
    /// The classifier runs on every frame, refractory or not. When the
    /// actuator fails the trigger still counts and the refractory window
    /// still starts; the error is handed back to the caller.
    pub fn process(
        &mut self,
        frame: &Frame,
        now: Duration,
        actuator: &mut dyn Actuator,
    ) -> Result<CycleOutcome, TriggerFailure> {
        self.debouncer.tick(now);

        self.preprocessor.normalize(frame, self.analyzer.input_mut());
        let bin_width = self.analyzer.bin_width();
        let peak = find_peak(self.analyzer.analyze(), bin_width);
        let detected = self.classifier.classify(peak.frequency, peak.magnitude);

        log::trace!(
            "t={:?} peak bin {} ({:.1} Hz) magnitude {:.1}",
            now,
            peak.bin,
            peak.frequency,
            peak.magnitude
        );

        let triggered = self.debouncer.offer(detected, now);
        if triggered {
            log::info!(
                "Snap at {:.3}s: {:.0} Hz, magnitude {:.0}",
                now.as_secs_f64(),
                peak.frequency,
                peak.magnitude
            );
        } else if detected {
            log::debug!("Detection at {:.3}s ignored (refractory)", now.as_secs_f64());
        }

        let outcome = CycleOutcome {
            peak,
            detected,
            triggered,
        };
        if triggered {
            if let Err(source) = self.action.apply(actuator) {
                return Err(TriggerFailure {
                    outcome,
                    outcome_secs: now.as_secs_f64(),
                    source,
                });
            }
        }
        Ok(outcome)
    }
}

/// Clock that stamps each cycle.
pub enum Timebase {
    /// Elapsed real time since the loop started; for live capture.
    Wall(Instant),
    /// Position in the sample stream; for replayed recordings.
    Stream { frames: u64, frame_duration: Duration },
}

impl Timebase {
    pub fn wall() -> Self {
        Timebase::Wall(Instant::now())
    }

    pub fn stream(frame_duration: Duration) -> Self {
        Timebase::Stream {
            frames: 0,
            frame_duration,
        }
    }

    pub fn now(&self) -> Duration {
        match *self {
            Timebase::Wall(start) => start.elapsed(),
            Timebase::Stream { frames, frame_duration } => {
                let nanos = (frame_duration.as_nanos() as u64).saturating_mul(frames);
                Duration::from_nanos(nanos)
            }
        }
    }

    fn advance(&mut self) {
        if let Timebase::Stream { frames, .. } = self {
            *frames += 1;
        }
    }
}

#[derive(Clone, Debug)]
pub struct RunOptions {
    /// Consecutive failed reads tolerated before giving up.
    pub max_consecutive_failures: u32,
    pub max_frames: Option<u64>,
    /// Print each trigger as a JSON line on stdout.
    pub json_events: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub detections: u64,
    pub triggers: u64,
    pub read_failures: u64,
    pub actuator_failures: u64,
}

#[derive(Serialize)]
struct TriggerEvent {
    trigger: u64,
    time_ms: u128,
    frequency_hz: f32,
    magnitude: f32,
    bin: usize,
    actuated: bool,
}

/// Pull frames until the source ends, `max_frames` is reached, or reads keep
/// failing.
pub fn run(
    reader: &mut FrameReader,
    detector: &mut Detector,
    actuator: &mut dyn Actuator,
    timebase: &mut Timebase,
    opts: &RunOptions,
    progress: Option<&ProgressBar>,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    let mut consecutive_failures = 0u32;

    loop {
        if opts.max_frames.is_some_and(|max| summary.frames >= max) {
            log::info!("Reached frame limit ({})", summary.frames);
            break;
        }

        let frame = match reader.read_frame() {
            Ok(frame) => {
                consecutive_failures = 0;
                frame
            }
            Err(e) if e.is_end_of_stream() => {
                log::info!("Sample stream ended");
                break;
            }
            Err(e) => {
                summary.read_failures += 1;
                consecutive_failures += 1;
                log::warn!("Skipping cycle: {} ({} in a row)", e, consecutive_failures);
                if consecutive_failures >= opts.max_consecutive_failures {
                    log_summary(&summary);
                    return Err(AcquisitionError::Persistent(consecutive_failures).into());
                }
                continue;
            }
        };

        let now = timebase.now();
        let (outcome, actuated) = match detector.process(frame, now, actuator) {
            Ok(outcome) => (outcome, true),
            Err(failure) => {
                summary.actuator_failures += 1;
                log::error!("{}", failure);
                (failure.outcome, false)
            }
        };

        summary.frames += 1;
        timebase.advance();
        if let Some(pb) = progress {
            pb.set_position(summary.frames);
        }

        if outcome.detected {
            summary.detections += 1;
        }
        if outcome.triggered && opts.json_events {
            let event = TriggerEvent {
                trigger: detector.debouncer().triggers(),
                time_ms: now.as_millis(),
                frequency_hz: outcome.peak.frequency,
                magnitude: outcome.peak.magnitude,
                bin: outcome.peak.bin,
                actuated,
            };
            println!("{}", serde_json::to_string(&event)?);
        }
    }

    summary.triggers = detector.debouncer().triggers();
    log_summary(&summary);
    Ok(summary)
}

fn log_summary(summary: &RunSummary) {
    log::info!(
        "Processed {} frames: {} detections, {} triggers, {} read failures, {} actuator failures",
        summary.frames,
        summary.detections,
        summary.triggers,
        summary.read_failures,
        summary.actuator_failures
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::tests::RecordingActuator;
    use crate::capture::synth::{Segment, SyntheticSource};
    use crate::capture::tests::ScriptedSource;
    use crate::capture::CaptureFormat;
    use crate::error::SourceError;
    use crate::trigger::DebounceState;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn tone_frame(freq: f32, amplitude: f32) -> Frame {
        let words = (0..512)
            .map(|i| {
                let t = i as f64 / 16000.0;
                let v = f64::from(amplitude) * (2.0 * std::f64::consts::PI * f64::from(freq) * t).sin();
                (v * 16384.0).round() as i32
            })
            .collect();
        Frame::mono(words)
    }

    fn opts() -> RunOptions {
        RunOptions {
            max_consecutive_failures: 3,
            max_frames: None,
            json_events: false,
        }
    }

    fn reader(source: Box<dyn crate::capture::SampleSource>) -> FrameReader {
        let format = CaptureFormat {
            sample_rate: 16000,
            bit_depth: 32,
            channels: 1,
        };
        FrameReader::new(source, format, 512, ms(100)).unwrap()
    }

    #[test]
    fn silent_frame_never_triggers() {
        let mut detector = Detector::new(&Config::default()).unwrap();
        let mut actuator = RecordingActuator::default();

        let outcome = detector.process(&Frame::mono(vec![0; 512]), ms(0), &mut actuator).unwrap();

        assert_eq!(outcome.peak.magnitude, 0.0);
        assert!(!outcome.detected);
        assert!(!outcome.triggered);
        assert!(actuator.history.is_empty());
    }

    #[test]
    fn snap_refractory_then_snap_again() {
        let mut detector = Detector::new(&Config::default()).unwrap();
        let mut actuator = RecordingActuator::default();
        let frame = tone_frame(3000.0, 58.0);

        let first = detector.process(&frame, ms(0), &mut actuator).unwrap();
        assert_eq!(first.peak.frequency, 3000.0);
        assert!(first.peak.magnitude > 7000.0 && first.peak.magnitude < 9000.0, "{}", first.peak.magnitude);
        assert!(first.triggered);
        assert_eq!(detector.debouncer().state(), DebounceState::Refractory { since: ms(0) });

        let second = detector.process(&frame, ms(50), &mut actuator).unwrap();
        assert!(second.detected);
        assert!(!second.triggered);

        let third = detector.process(&frame, ms(350), &mut actuator).unwrap();
        assert!(third.triggered);

        assert_eq!(actuator.history, vec![true, false]);
    }

    #[test]
    fn quiet_or_out_of_band_tones_are_ignored() {
        let mut detector = Detector::new(&Config::default()).unwrap();
        let mut actuator = RecordingActuator::default();

        let quiet = detector.process(&tone_frame(3000.0, 10.0), ms(0), &mut actuator).unwrap();
        assert!(!quiet.detected);

        let low = detector.process(&tone_frame(1000.0, 200.0), ms(100), &mut actuator).unwrap();
        assert!((low.peak.frequency - 1000.0).abs() <= 31.25);
        assert!(!low.detected);

        let high = detector.process(&tone_frame(6000.0, 200.0), ms(200), &mut actuator).unwrap();
        assert!(!high.detected);
        assert!(actuator.history.is_empty());
    }

    #[test]
    fn actuator_failure_still_starts_refractory() {
        let mut detector = Detector::new(&Config::default()).unwrap();
        let mut actuator = RecordingActuator {
            fail: true,
            ..Default::default()
        };
        let frame = tone_frame(3000.0, 100.0);

        let failure = detector.process(&frame, ms(0), &mut actuator).unwrap_err();
        assert!(failure.outcome.triggered);
        assert!(matches!(failure.source, ActuatorError::Stuck(_)));
        assert_eq!(detector.debouncer().triggers(), 1);

        let next = detector.process(&frame, ms(50), &mut actuator).unwrap();
        assert!(!next.triggered);
    }

    #[test]
    fn run_replays_stream_with_stream_time() {
        // 20 frames of 32 ms: triggers at 0 ms and 320 ms.
        let script = vec![Segment::Tone { freq: 3000.0, amplitude: 100.0, frames: 20 }];
        let mut reader = reader(Box::new(SyntheticSource::new(script, 512, 14)));
        let mut detector = Detector::new(&Config::default()).unwrap();
        let mut actuator = RecordingActuator::default();
        let mut timebase = Timebase::stream(reader.frame_duration());

        let summary =
            run(&mut reader, &mut detector, &mut actuator, &mut timebase, &opts(), None).unwrap();

        assert_eq!(summary.frames, 20);
        assert_eq!(summary.detections, 20);
        assert_eq!(summary.triggers, 2);
        assert_eq!(detector.debouncer().last_trigger(), Some(ms(320)));
        assert_eq!(timebase.now(), ms(640));
    }

    #[test]
    fn run_honors_frame_limit() {
        let script = vec![Segment::Silence { frames: 1 }];
        let source = SyntheticSource::new(script, 512, 14).looping(true);
        let mut reader = reader(Box::new(source));
        let mut detector = Detector::new(&Config::default()).unwrap();
        let mut actuator = RecordingActuator::default();
        let mut timebase = Timebase::stream(reader.frame_duration());
        let opts = RunOptions {
            max_frames: Some(7),
            ..opts()
        };

        let summary =
            run(&mut reader, &mut detector, &mut actuator, &mut timebase, &opts, None).unwrap();
        assert_eq!(summary.frames, 7);
        assert_eq!(summary.triggers, 0);
    }

    #[test]
    fn transient_read_failures_are_skipped() {
        let source = ScriptedSource::new(vec![
            Err(SourceError::Timeout),
            Ok(vec![0u8; 2048]),
            Err(SourceError::Driver("dma overrun".into())),
            Ok(vec![0u8; 2048]),
        ]);
        let mut reader = reader(Box::new(source));
        let mut detector = Detector::new(&Config::default()).unwrap();
        let mut actuator = RecordingActuator::default();
        let mut timebase = Timebase::stream(reader.frame_duration());

        let summary =
            run(&mut reader, &mut detector, &mut actuator, &mut timebase, &opts(), None).unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.read_failures, 2);
    }

    #[test]
    fn persistent_read_failures_are_fatal() {
        let source = ScriptedSource::new(vec![
            Err(SourceError::Timeout),
            Err(SourceError::Timeout),
            Err(SourceError::Timeout),
            Ok(vec![0u8; 2048]),
        ]);
        let mut reader = reader(Box::new(source));
        let mut detector = Detector::new(&Config::default()).unwrap();
        let mut actuator = RecordingActuator::default();
        let mut timebase = Timebase::wall();

        let err = run(&mut reader, &mut detector, &mut actuator, &mut timebase, &opts(), None)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AcquisitionError>(),
            Some(AcquisitionError::Persistent(3))
        ));
    }
}
