use rustfft::num_complex::Complex;

use crate::capture::Frame;

/// Turns raw microphone words into real-valued FFT input.
#[derive(Clone, Copy, Debug)]
pub struct Preprocessor {
    shift_bits: u32,
}

impl Preprocessor {
    pub fn new(shift_bits: u32) -> Self {
        Self { shift_bits }
    }

    /// Write channel 0 of `frame`, shifted down by `shift_bits`, into the real
    /// parts of `out` and clear the imaginary parts.
    ///
    /// Periods missing from a short frame are filled with zeros.
    pub fn normalize(&self, frame: &Frame, out: &mut [Complex<f32>]) {
        let stride = usize::from(frame.channels.max(1));
        let mut words = frame.words.iter().step_by(stride);

        for slot in out.iter_mut() {
            let re = words.next().map_or(0.0, |&w| (w >> self.shift_bits) as f32);
            *slot = Complex::new(re, 0.0);
        }
    }
}
