mod actuator;
mod capture;
mod cli;
mod config;
mod dsp;
mod error;
mod pipeline;
mod trigger;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use actuator::command::CommandActuator;
use actuator::relay::Relay;
use actuator::Actuator;
use capture::file::FileSource;
use capture::synth::{Segment, SyntheticSource};
use capture::{FrameReader, SampleSource};
use cli::Cli;
use config::{ActuatorKind, Config};
use error::ConfigError;
use pipeline::{Detector, RunOptions, Timebase};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect snapwatch.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("snapwatch.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("snapwatch").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("snapwatch").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });

    let mut cfg = match config_path {
        Some(ref path) => match config::load_config(path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(err) if cli.config.is_some() => return Err(err),
            Err(err) => {
                log::warn!("Ignoring config: {:#}", err);
                Config::default()
            }
        },
        None => Config::default(),
    };
    apply_overrides(&mut cfg, &cli);
    cfg.validate().context("Invalid configuration")?;

    let (source, total_frames): (Box<dyn SampleSource>, Option<u64>) = if let Some(freq) = cli.tone {
        let script = vec![
            Segment::Tone {
                freq,
                amplitude: cli.tone_amplitude,
                frames: 1,
            },
            Segment::Silence {
                frames: cli.tone_gap,
            },
        ];
        log::info!("Synthetic input: {:.0} Hz bursts every {} frames", freq, cli.tone_gap + 1);
        let source = SyntheticSource::new(script, cfg.capture.frame_size, cfg.detector.shift_bits)
            .looping(true)
            .paced(cli.realtime);
        (Box::new(source) as Box<dyn SampleSource>, None)
    } else {
        let input = cli.input.as_ref().context("Input audio file or --tone is required")?;
        if !input.exists() {
            anyhow::bail!("Input file not found: {}", input.display());
        }
        let source = FileSource::open(input, cli.realtime)?;
        if source.sample_rate() != cfg.capture.sample_rate {
            return Err(ConfigError::RateMismatch {
                expected: cfg.capture.sample_rate,
                found: source.sample_rate(),
            })
            .context("Resample the recording or pass --sample-rate");
        }
        let frames = source.frame_count(cfg.capture.frame_size);
        (Box::new(source) as Box<dyn SampleSource>, Some(frames))
    };

    let mut actuator: Box<dyn Actuator> = match cfg.actuator.kind {
        ActuatorKind::Relay => Box::new(Relay::new(cfg.actuator.label.clone(), cfg.actuator.active_low)),
        ActuatorKind::Command => {
            Box::new(CommandActuator::new(&cfg.actuator.command).ok_or(ConfigError::EmptyCommand)?)
        }
    };
    actuator.off().context("Failed to reset actuator")?;

    let mut detector = Detector::new(&cfg)?;
    let mut reader = FrameReader::new(
        source,
        cfg.capture_format(),
        cfg.capture.frame_size,
        cfg.read_timeout(),
    )
    .context("Failed to start capture")?;

    // Paced input runs on the wall clock; unpaced replay on sample-stream time.
    let mut timebase = if cli.realtime {
        Timebase::wall()
    } else {
        Timebase::stream(reader.frame_duration())
    };

    log::info!(
        "Listening for {:.0}-{:.0} Hz peaks above {:.0}, refractory {} ms",
        cfg.detector.low_hz,
        cfg.detector.high_hz,
        cfg.detector.magnitude_threshold,
        cfg.trigger.refractory_ms
    );

    let progress = match total_frames {
        Some(total) if !cli.realtime && !cli.json => {
            let pb = ProgressBar::new(cli.max_frames.map_or(total, |max| max.min(total)));
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")?
                    .progress_chars("=>-"),
            );
            Some(pb)
        }
        _ => None,
    };

    let opts = RunOptions {
        max_consecutive_failures: cfg.capture.max_consecutive_failures,
        max_frames: cli.max_frames,
        json_events: cli.json,
    };

    let summary = pipeline::run(
        &mut reader,
        &mut detector,
        actuator.as_mut(),
        &mut timebase,
        &opts,
        progress.as_ref(),
    )?;

    if let Some(pb) = progress {
        pb.finish_with_message("Replay complete");
    }
    log::info!("Done: {} trigger(s) in {} frames", summary.triggers, summary.frames);
    Ok(())
}

/// Command-line values win over the config file.
fn apply_overrides(cfg: &mut Config, cli: &Cli) {
    if let Some(v) = cli.sample_rate { cfg.capture.sample_rate = v; }
    if let Some(v) = cli.frame_size { cfg.capture.frame_size = v; }
    if let Some(v) = cli.low_hz { cfg.detector.low_hz = v; }
    if let Some(v) = cli.high_hz { cfg.detector.high_hz = v; }
    if let Some(v) = cli.threshold { cfg.detector.magnitude_threshold = v; }
    if let Some(v) = cli.refractory_ms { cfg.trigger.refractory_ms = v; }
    if let Some(v) = cli.action { cfg.trigger.action = v; }
    if let Some(v) = cli.pulse_ms { cfg.trigger.pulse_ms = v; }
    if let Some(v) = cli.actuator { cfg.actuator.kind = v; }
    if !cli.command.is_empty() {
        cfg.actuator.command = cli.command.clone();
        if cli.actuator.is_none() {
            cfg.actuator.kind = ActuatorKind::Command;
        }
    }
}
