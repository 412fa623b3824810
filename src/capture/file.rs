use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::{encode_word, CaptureFormat, SampleSource};
use crate::error::SourceError;

/// Replays a recorded audio file as if it were a live I2S microphone.
pub struct FileSource {
    /// Interleaved samples in `[-1.0, 1.0]`.
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
    pos: usize,
    realtime: bool,
    format: Option<CaptureFormat>,
}

impl FileSource {
    pub fn open(path: &Path, realtime: bool) -> Result<Self> {
        let (samples, channels, sample_rate) = decode_interleaved(path)?;
        Ok(Self::from_samples(samples, channels, sample_rate, realtime))
    }

    pub fn from_samples(samples: Vec<f32>, channels: u16, sample_rate: u32, realtime: bool) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            sample_rate,
            pos: 0,
            realtime,
            format: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Complete frames this file will yield.
    pub fn frame_count(&self, frame_size: usize) -> u64 {
        (self.samples.len() / usize::from(self.channels) / frame_size) as u64
    }

    fn sample_at(&self, period: usize, channel: u16, wanted: u16) -> f32 {
        let base = period * usize::from(self.channels);
        match (self.channels, wanted) {
            (src, 1) if src > 1 => {
                let frame = &self.samples[base..base + usize::from(src)];
                frame.iter().sum::<f32>() / src as f32
            }
            (src, _) => self.samples[base + usize::from(channel.min(src - 1))],
        }
    }
}

impl SampleSource for FileSource {
    fn init(&mut self, format: &CaptureFormat) -> Result<(), SourceError> {
        if format.sample_rate != self.sample_rate {
            return Err(SourceError::Driver(format!(
                "file is {} Hz, capture wants {} Hz",
                self.sample_rate, format.sample_rate
            )));
        }
        self.format = Some(*format);
        self.pos = 0;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, SourceError> {
        let format = self.format.ok_or(SourceError::NotInitialized)?;
        let periods_total = self.samples.len() / usize::from(self.channels);
        if self.pos >= periods_total {
            return Err(SourceError::Exhausted);
        }

        let period_bytes = format.bytes_per_frame(1);
        let periods = (buf.len() / period_bytes).min(periods_total - self.pos);
        let scale = f64::from(1u32 << (format.bit_depth - 1));
        let (lo, hi) = match format.bit_depth {
            16 => (f64::from(i16::MIN), f64::from(i16::MAX)),
            _ => (f64::from(i32::MIN), f64::from(i32::MAX)),
        };

        let mut out = Vec::with_capacity(periods * period_bytes);
        for period in self.pos..self.pos + periods {
            for channel in 0..format.channels {
                let sample = self.sample_at(period, channel, format.channels);
                let word = (f64::from(sample) * scale).round().clamp(lo, hi) as i32;
                encode_word(word, format.bit_depth, &mut out);
            }
        }
        buf[..out.len()].copy_from_slice(&out);
        self.pos += periods;

        if self.realtime {
            std::thread::sleep(Duration::from_secs_f64(periods as f64 / self.sample_rate as f64));
        }
        Ok(out.len())
    }

    fn close(&mut self) {
        self.format = None;
    }
}

fn decode_interleaved(path: &Path) -> Result<(Vec<f32>, u16, u32)> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe audio format")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio tracks found")?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count()) as u16;
    let sample_rate = track.codec_params.sample_rate.context("Unknown sample rate")?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                log::debug!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    log::info!(
        "Decoded {}: {} channel(s), {}Hz, {:.1}s",
        path.display(),
        channels,
        sample_rate,
        samples.len() as f32 / channels.max(1) as f32 / sample_rate as f32
    );

    Ok((samples, channels, sample_rate))
}
