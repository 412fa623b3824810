use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use crate::error::ConfigError;

/// Windowed forward FFT over one frame, with every buffer allocated up front
/// and reused for the life of the analyzer.
pub struct SpectralAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    magnitude: Vec<f32>,
    sample_rate: u32,
}

impl SpectralAnalyzer {
    pub fn new(frame_size: usize, sample_rate: u32) -> Result<Self, ConfigError> {
        if frame_size < 4 || !frame_size.is_power_of_two() {
            return Err(ConfigError::FrameSize(frame_size));
        }
        if sample_rate == 0 {
            return Err(ConfigError::SampleRate);
        }

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(frame_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Ok(Self {
            fft,
            window: hamming_window(frame_size),
            buffer: vec![Complex::new(0.0, 0.0); frame_size],
            scratch,
            magnitude: vec![0.0; frame_size],
            sample_rate,
        })
    }

    pub fn frame_size(&self) -> usize {
        self.buffer.len()
    }

    /// Hz covered by one bin.
    pub fn bin_width(&self) -> f32 {
        self.sample_rate as f32 / self.frame_size() as f32
    }

    /// Input slot for the next frame; fill it before calling `analyze`.
    pub fn input_mut(&mut self) -> &mut [Complex<f32>] {
        &mut self.buffer
    }

    /// Window, transform, and reduce the input to per-bin magnitudes.
    ///
    /// Returns all N magnitudes; only `[1, N/2)` carry information for real input.
    pub fn analyze(&mut self) -> &[f32] {
        for (c, w) in self.buffer.iter_mut().zip(&self.window) {
            c.re *= w;
            c.im *= w;
        }

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        for (m, c) in self.magnitude.iter_mut().zip(&self.buffer) {
            *m = c.norm();
        }
        &self.magnitude
    }
}

fn hamming_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            0.54 - 0.46 * (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos()
        })
        .collect()
}
