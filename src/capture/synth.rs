use std::f64::consts::PI;
use std::time::Duration;

use super::{encode_word, CaptureFormat, SampleSource};
use crate::error::SourceError;

/// One stretch of generated signal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Segment {
    /// Sinusoid at `freq` Hz; `amplitude` is in post-shift sample units.
    Tone { freq: f32, amplitude: f32, frames: usize },
    Silence { frames: usize },
}

impl Segment {
    fn frames(&self) -> usize {
        match *self {
            Segment::Tone { frames, .. } | Segment::Silence { frames } => frames,
        }
    }
}

/// Deterministic test signal generator standing in for a microphone.
pub struct SyntheticSource {
    script: Vec<Segment>,
    frame_size: usize,
    shift_bits: u32,
    looping: bool,
    paced: bool,
    format: Option<CaptureFormat>,
    /// Sample periods emitted so far.
    cursor: usize,
}

impl SyntheticSource {
    pub fn new(script: Vec<Segment>, frame_size: usize, shift_bits: u32) -> Self {
        Self {
            script,
            frame_size,
            shift_bits,
            looping: false,
            paced: false,
            format: None,
            cursor: 0,
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Sleep for the duration of the generated audio on every read.
    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    fn script_len(&self) -> usize {
        self.script.iter().map(|s| s.frames() * self.frame_size).sum()
    }

    fn segment_at(&self, period: usize) -> Option<Segment> {
        let mut start = 0;
        for segment in &self.script {
            let len = segment.frames() * self.frame_size;
            if period < start + len {
                return Some(*segment);
            }
            start += len;
        }
        None
    }

    fn word_at(&self, period: usize, format: &CaptureFormat) -> i32 {
        let Some(segment) = self.segment_at(period) else {
            return 0;
        };
        match segment {
            Segment::Silence { .. } => 0,
            Segment::Tone { freq, amplitude, .. } => {
                let t = period as f64 / f64::from(format.sample_rate);
                let value = f64::from(amplitude) * (2.0 * PI * f64::from(freq) * t).sin();
                let word = value * f64::from(1u32 << self.shift_bits);
                let limit = if format.bit_depth == 16 { f64::from(i16::MAX) } else { f64::from(i32::MAX) };
                word.round().clamp(-limit, limit) as i32
            }
        }
    }
}

impl SampleSource for SyntheticSource {
    fn init(&mut self, format: &CaptureFormat) -> Result<(), SourceError> {
        if self.script.is_empty() {
            return Err(SourceError::Driver("empty signal script".into()));
        }
        self.format = Some(*format);
        self.cursor = 0;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, SourceError> {
        let format = self.format.ok_or(SourceError::NotInitialized)?;
        let total = self.script_len();
        if !self.looping && self.cursor >= total {
            return Err(SourceError::Exhausted);
        }

        let period_bytes = format.bytes_per_frame(1);
        let mut periods = buf.len() / period_bytes;
        if !self.looping {
            periods = periods.min(total - self.cursor);
        }

        let mut out = Vec::with_capacity(periods * period_bytes);
        for i in 0..periods {
            let period = if total == 0 { 0 } else { (self.cursor + i) % total };
            let word = self.word_at(period, &format);
            for _ in 0..format.channels {
                encode_word(word, format.bit_depth, &mut out);
            }
        }
        buf[..out.len()].copy_from_slice(&out);
        self.cursor += periods;

        if self.paced {
            std::thread::sleep(Duration::from_secs_f64(periods as f64 / f64::from(format.sample_rate)));
        }
        Ok(out.len())
    }

    fn close(&mut self) {
        self.format = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format() -> CaptureFormat {
        CaptureFormat {
            sample_rate: 16000,
            bit_depth: 32,
            channels: 1,
        }
    }

    #[test]
    fn silence_then_exhaustion() {
        let mut source = SyntheticSource::new(vec![Segment::Silence { frames: 1 }], 4, 14);
        source.init(&format()).unwrap();

        let mut buf = [0xffu8; 16];
        assert_eq!(source.read(&mut buf, Duration::ZERO).unwrap(), 16);
        assert!(buf.iter().all(|&b| b == 0));
        assert!(matches!(source.read(&mut buf, Duration::ZERO), Err(SourceError::Exhausted)));
    }

    #[test]
    fn tone_is_scaled_by_shift() {
        // 4 kHz at 16 kHz: samples 0, +A, 0, -A
        let script = vec![Segment::Tone { freq: 4000.0, amplitude: 100.0, frames: 1 }];
        let mut source = SyntheticSource::new(script, 4, 14);
        source.init(&format()).unwrap();

        let mut buf = [0u8; 16];
        source.read(&mut buf, Duration::ZERO).unwrap();
        let words: Vec<i32> = buf
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(words, vec![0, 100 << 14, 0, -(100 << 14)]);
    }

    #[test]
    fn looping_never_exhausts() {
        let mut source =
            SyntheticSource::new(vec![Segment::Silence { frames: 1 }], 4, 14).looping(true);
        source.init(&format()).unwrap();

        let mut buf = [0u8; 16];
        for _ in 0..5 {
            assert_eq!(source.read(&mut buf, Duration::ZERO).unwrap(), 16);
        }
    }
}
