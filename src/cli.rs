use clap::Parser;
use std::path::PathBuf;

use crate::config::{ActionKind, ActuatorKind};

#[derive(Parser, Debug)]
#[command(name = "snapwatch", about = "Finger-snap detector that flips a relay")]
pub struct Cli {
    /// Recorded audio to replay as microphone input (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Config file (defaults to ./snapwatch.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Feed the input at its natural rate instead of as fast as possible
    #[arg(long)]
    pub realtime: bool,

    /// Generate a synthetic snap-like tone at this frequency instead of reading a file
    #[arg(long, value_name = "HZ", conflicts_with = "input")]
    pub tone: Option<f32>,

    /// Tone amplitude in post-shift sample units
    #[arg(long, default_value_t = 100.0)]
    pub tone_amplitude: f32,

    /// Frames of silence between synthetic tone bursts
    #[arg(long, default_value_t = 15)]
    pub tone_gap: usize,

    /// Sample rate in Hz
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Samples per analysis frame (power of two)
    #[arg(long)]
    pub frame_size: Option<usize>,

    /// Lower edge of the detection band in Hz (exclusive)
    #[arg(long)]
    pub low_hz: Option<f32>,

    /// Upper edge of the detection band in Hz (exclusive)
    #[arg(long)]
    pub high_hz: Option<f32>,

    /// Peak magnitude a snap must exceed
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Ignore further snaps for this long after a trigger
    #[arg(long)]
    pub refractory_ms: Option<u64>,

    /// What a trigger does to the actuator
    #[arg(long, value_enum)]
    pub action: Option<ActionKind>,

    /// Pulse length for --action pulse
    #[arg(long)]
    pub pulse_ms: Option<u64>,

    /// Actuator to drive
    #[arg(long, value_enum)]
    pub actuator: Option<ActuatorKind>,

    /// Command line for --actuator command (receives SNAPWATCH_STATE=on|off)
    #[arg(long, num_args = 1.., allow_hyphen_values = true)]
    pub command: Vec<String>,

    /// Stop after this many frames
    #[arg(long)]
    pub max_frames: Option<u64>,

    /// Print triggers as JSON lines on stdout
    #[arg(long)]
    pub json: bool,
}
