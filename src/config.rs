use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::actuator::TriggerAction;
use crate::capture::CaptureFormat;
use crate::dsp::classify::Classifier;
use crate::error::ConfigError;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub actuator: ActuatorConfig,
}

#[derive(Debug, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_bit_depth")]
    pub bit_depth: u16,
    #[serde(default = "default_channels")]
    pub channels: u16,
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

#[derive(Debug, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_shift_bits")]
    pub shift_bits: u32,
    #[serde(default = "default_low_hz")]
    pub low_hz: f32,
    #[serde(default = "default_high_hz")]
    pub high_hz: f32,
    #[serde(default = "default_magnitude_threshold")]
    pub magnitude_threshold: f32,
}

#[derive(Debug, Deserialize)]
pub struct TriggerConfig {
    #[serde(default = "default_refractory_ms")]
    pub refractory_ms: u64,
    #[serde(default)]
    pub action: ActionKind,
    #[serde(default = "default_pulse_ms")]
    pub pulse_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct ActuatorConfig {
    #[serde(default)]
    pub kind: ActuatorKind,
    #[serde(default = "default_label")]
    pub label: String,
    /// Drive the line low for "on" (active-low relay boards).
    #[serde(default)]
    pub active_low: bool,
    /// Program and arguments for the `command` actuator.
    #[serde(default)]
    pub command: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    #[default]
    Toggle,
    On,
    Off,
    Pulse,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorKind {
    #[default]
    Relay,
    Command,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            bit_depth: default_bit_depth(),
            channels: default_channels(),
            frame_size: default_frame_size(),
            read_timeout_ms: default_read_timeout_ms(),
            max_consecutive_failures: default_max_consecutive_failures(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            shift_bits: default_shift_bits(),
            low_hz: default_low_hz(),
            high_hz: default_high_hz(),
            magnitude_threshold: default_magnitude_threshold(),
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            refractory_ms: default_refractory_ms(),
            action: ActionKind::default(),
            pulse_ms: default_pulse_ms(),
        }
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            kind: ActuatorKind::default(),
            label: default_label(),
            active_low: false,
            command: Vec::new(),
        }
    }
}

fn default_sample_rate() -> u32 { 16000 }
fn default_bit_depth() -> u16 { 32 }
fn default_channels() -> u16 { 1 }
fn default_frame_size() -> usize { 512 }
fn default_read_timeout_ms() -> u64 { 1000 }
fn default_max_consecutive_failures() -> u32 { 50 }
fn default_shift_bits() -> u32 { 14 }
fn default_low_hz() -> f32 { 2000.0 }
fn default_high_hz() -> f32 { 5000.0 }
fn default_magnitude_threshold() -> f32 { 6000.0 }
fn default_refractory_ms() -> u64 { 300 }
fn default_pulse_ms() -> u64 { 500 }
fn default_label() -> String { "relay".into() }

impl Config {
    /// Reject anything the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let capture = &self.capture;
        let detector = &self.detector;

        if capture.sample_rate == 0 {
            return Err(ConfigError::SampleRate);
        }
        if capture.frame_size < 4 || !capture.frame_size.is_power_of_two() {
            return Err(ConfigError::FrameSize(capture.frame_size));
        }
        if !matches!(capture.bit_depth, 16 | 32) {
            return Err(ConfigError::BitDepth(capture.bit_depth));
        }
        if !matches!(capture.channels, 1 | 2) {
            return Err(ConfigError::Channels(capture.channels));
        }
        if capture.max_consecutive_failures == 0 {
            return Err(ConfigError::Zero { field: "max_consecutive_failures" });
        }
        if capture.read_timeout_ms == 0 {
            return Err(ConfigError::Zero { field: "read_timeout_ms" });
        }
        if detector.shift_bits >= u32::from(capture.bit_depth) {
            return Err(ConfigError::Shift {
                shift: detector.shift_bits,
                bit_depth: capture.bit_depth,
            });
        }

        let nyquist = capture.sample_rate as f32 / 2.0;
        let (low, high) = (detector.low_hz, detector.high_hz);
        if !low.is_finite() || !high.is_finite() || low < 0.0 || low >= high || high > nyquist {
            return Err(ConfigError::Band { low, high, nyquist });
        }
        if !detector.magnitude_threshold.is_finite() || detector.magnitude_threshold < 0.0 {
            return Err(ConfigError::Threshold(detector.magnitude_threshold));
        }

        if self.trigger.action == ActionKind::Pulse && self.trigger.pulse_ms == 0 {
            return Err(ConfigError::Zero { field: "pulse_ms" });
        }
        if self.actuator.kind == ActuatorKind::Command && self.actuator.command.is_empty() {
            return Err(ConfigError::EmptyCommand);
        }
        Ok(())
    }

    pub fn capture_format(&self) -> CaptureFormat {
        CaptureFormat {
            sample_rate: self.capture.sample_rate,
            bit_depth: self.capture.bit_depth,
            channels: self.capture.channels,
        }
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(
            self.detector.low_hz,
            self.detector.high_hz,
            self.detector.magnitude_threshold,
        )
    }

    pub fn refractory(&self) -> Duration {
        Duration::from_millis(self.trigger.refractory_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.capture.read_timeout_ms)
    }

    pub fn trigger_action(&self) -> TriggerAction {
        match self.trigger.action {
            ActionKind::Toggle => TriggerAction::Toggle,
            ActionKind::On => TriggerAction::On,
            ActionKind::Off => TriggerAction::Off,
            ActionKind::Pulse => TriggerAction::Pulse(Duration::from_millis(self.trigger.pulse_ms)),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config file: {}", path.display()))
}
