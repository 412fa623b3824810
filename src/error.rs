use thiserror::Error;

/// Rejected settings. Raised before the detection loop starts.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("frame size {0} is not a power of two (minimum 4)")]
    FrameSize(usize),
    #[error("sample rate must be positive")]
    SampleRate,
    #[error("unsupported bit depth {0} (expected 16 or 32)")]
    BitDepth(u16),
    #[error("unsupported channel count {0} (expected 1 or 2)")]
    Channels(u16),
    #[error("shift of {shift} bits leaves nothing of a {bit_depth}-bit word")]
    Shift { shift: u32, bit_depth: u16 },
    #[error("invalid frequency band ({low} Hz, {high} Hz) for Nyquist {nyquist} Hz")]
    Band { low: f32, high: f32, nyquist: f32 },
    #[error("magnitude threshold must be a finite non-negative number, got {0}")]
    Threshold(f32),
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("source sample rate {found} Hz does not match configured {expected} Hz")]
    RateMismatch { expected: u32, found: u32 },
    #[error("command actuator needs a program to run")]
    EmptyCommand,
}

/// Failure reported by a `SampleSource` implementation.
#[allow(dead_code)]
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("sample source is not initialized")]
    NotInitialized,
    #[error("timed out waiting for samples")]
    Timeout,
    #[error("end of sample stream")]
    Exhausted,
    #[error("driver error: {0}")]
    Driver(String),
}

/// A cycle could not obtain a complete frame.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },
    #[error("{0} consecutive read failures, giving up")]
    Persistent(u32),
}

impl AcquisitionError {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, AcquisitionError::Source(SourceError::Exhausted))
    }
}

/// The actuator did not reach the commanded state.
#[allow(dead_code)]
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` exited with {status}")]
    Exit { program: String, status: String },
    #[error("{0}")]
    Stuck(String),
}
