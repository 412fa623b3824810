/// Strongest bin of one frame's spectrum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpectralPeak {
    pub bin: usize,
    pub magnitude: f32,
    /// `bin * bin_width`, in Hz.
    pub frequency: f32,
}

/// Find the highest-magnitude bin in `[1, N/2)`, where N is `magnitude.len()`.
///
/// DC and the mirrored upper half are skipped. Ties go to the lowest bin, and
/// a flat spectrum reports bin 1.
pub fn find_peak(magnitude: &[f32], bin_width: f32) -> SpectralPeak {
    let half = magnitude.len() / 2;
    let mut bin = 1;
    let mut peak = magnitude.get(1).copied().unwrap_or(0.0);

    for (i, &m) in magnitude.iter().enumerate().take(half).skip(2) {
        if m > peak {
            peak = m;
            bin = i;
        }
    }

    SpectralPeak {
        bin,
        magnitude: peak,
        frequency: bin as f32 * bin_width,
    }
}
