pub mod file;
pub mod synth;

use std::time::Duration;

use crate::error::{AcquisitionError, SourceError};

/// Stream layout requested from a sample source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureFormat {
    pub sample_rate: u32,
    /// Width of one sample word on the wire: 16 or 32.
    pub bit_depth: u16,
    /// Interleaved channels per sample period.
    pub channels: u16,
}

impl CaptureFormat {
    pub fn bytes_per_word(&self) -> usize {
        usize::from(self.bit_depth / 8)
    }

    pub fn bytes_per_frame(&self, frame_size: usize) -> usize {
        frame_size * usize::from(self.channels) * self.bytes_per_word()
    }
}

/// A digital microphone or anything that can stand in for one.
///
/// `read` blocks until some bytes are available or `timeout` elapses and
/// returns how many bytes of little-endian sample words were written.
pub trait SampleSource {
    fn init(&mut self, format: &CaptureFormat) -> Result<(), SourceError>;
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, SourceError>;
    fn close(&mut self);
}

/// One acquisition cycle worth of raw sample words, channels interleaved.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    pub words: Vec<i32>,
    pub channels: u16,
}

impl Frame {
    #[allow(dead_code)]
    pub fn mono(words: Vec<i32>) -> Self {
        Self { words, channels: 1 }
    }
}

/// Pulls fixed-size frames out of a `SampleSource`, reusing its buffers.
pub struct FrameReader {
    source: Box<dyn SampleSource>,
    format: CaptureFormat,
    timeout: Duration,
    bytes: Vec<u8>,
    frame: Frame,
}

impl FrameReader {
    pub fn new(
        mut source: Box<dyn SampleSource>,
        format: CaptureFormat,
        frame_size: usize,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        source.init(&format)?;
        log::info!(
            "Capture started: {} Hz, {}-bit, {} channel(s), {} samples per frame",
            format.sample_rate,
            format.bit_depth,
            format.channels,
            frame_size
        );

        Ok(Self {
            source,
            format,
            timeout,
            bytes: vec![0u8; format.bytes_per_frame(frame_size)],
            frame: Frame {
                words: vec![0; frame_size * usize::from(format.channels)],
                channels: format.channels,
            },
        })
    }

    /// Real time covered by one frame.
    pub fn frame_duration(&self) -> Duration {
        let frame_size = self.frame.words.len() / usize::from(self.format.channels);
        let nanos = frame_size as u64 * 1_000_000_000 / u64::from(self.format.sample_rate);
        Duration::from_nanos(nanos)
    }

    /// Block until a full frame has been read.
    pub fn read_frame(&mut self) -> Result<&Frame, AcquisitionError> {
        let expected = self.bytes.len();
        let mut filled = 0;

        while filled < expected {
            match self.source.read(&mut self.bytes[filled..], self.timeout) {
                Ok(0) => return Err(AcquisitionError::ShortRead { expected, got: filled }),
                Ok(n) => filled += n,
                Err(e) => return Err(e.into()),
            }
        }

        decode_words(&self.bytes, self.format.bit_depth, &mut self.frame.words);
        Ok(&self.frame)
    }
}

impl Drop for FrameReader {
    fn drop(&mut self) {
        self.source.close();
        log::debug!("Capture released");
    }
}

fn decode_words(bytes: &[u8], bit_depth: u16, words: &mut [i32]) {
    match bit_depth {
        16 => {
            for (word, b) in words.iter_mut().zip(bytes.chunks_exact(2)) {
                *word = i32::from(i16::from_le_bytes([b[0], b[1]]));
            }
        }
        _ => {
            for (word, b) in words.iter_mut().zip(bytes.chunks_exact(4)) {
                *word = i32::from_le_bytes([b[0], b[1], b[2], b[3]]);
            }
        }
    }
}

/// Serialize words the way `FrameReader` expects them on the wire.
pub fn encode_word(word: i32, bit_depth: u16, out: &mut Vec<u8>) {
    match bit_depth {
        16 => out.extend_from_slice(&(word as i16).to_le_bytes()),
        _ => out.extend_from_slice(&word.to_le_bytes()),
    }
}
