/// Decides whether a frame's dominant peak looks like a finger snap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classifier {
    low_hz: f32,
    high_hz: f32,
    magnitude_threshold: f32,
}

impl Classifier {
    pub fn new(low_hz: f32, high_hz: f32, magnitude_threshold: f32) -> Self {
        Self {
            low_hz,
            high_hz,
            magnitude_threshold,
        }
    }

    /// True iff `frequency` lies strictly inside the band and `magnitude`
    /// strictly exceeds the threshold.
    pub fn classify(&self, frequency: f32, magnitude: f32) -> bool {
        frequency > self.low_hz && frequency < self.high_hz && magnitude > self.magnitude_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap() -> Classifier {
        Classifier::new(2000.0, 5000.0, 6000.0)
    }

    #[test]
    fn accepts_loud_in_band_peak() {
        assert!(snap().classify(3000.0, 8000.0));
    }

    #[test]
    fn band_edges_are_excluded() {
        assert!(!snap().classify(5000.0, 8000.0));
        assert!(!snap().classify(2000.0, 8000.0));
        assert!(snap().classify(4999.0, 8000.0));
    }

    #[test]
    fn threshold_is_strict() {
        assert!(!snap().classify(3000.0, 6000.0));
        assert!(snap().classify(3000.0, 6000.5));
    }

    #[test]
    fn silence_never_classifies() {
        assert!(!snap().classify(31.25, 0.0));
    }

    #[test]
    fn classification_is_repeatable() {
        let classifier = snap();
        let first = classifier.classify(4200.0, 7000.0);
        for _ in 0..10 {
            assert_eq!(classifier.classify(4200.0, 7000.0), first);
        }
    }
}
