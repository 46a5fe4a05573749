//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (link configuration, frame
//! encoding, transmission, device I/O).
use thiserror_no_std::Error;

//==================================================================================CONFIG_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Invalid link parameters detected before the device is touched.
pub enum ConfigError {
    /// Line number does not exist on the port.
    #[error("Line {line} is out of range for a {width}-line port")]
    LineOutOfRange { line: u8, width: u8 },
    /// The same physical line was assigned to two roles.
    #[error("Line {line} is assigned to more than one role")]
    DuplicateLine { line: u8 },
    /// Sample clock rate must be strictly positive.
    #[error("Invalid sample rate: {rate_hz} Hz")]
    InvalidSampleRate { rate_hz: u32 },
    /// At least one chunk must be allowed per frame.
    #[error("Chunk budget must be at least one")]
    ZeroChunkBudget,
    /// The decoder was started on a link configured without input lines.
    #[error("No input lines configured")]
    MissingInput,
}

//==================================================================================FRAME_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Failures raised while expanding a payload into line samples.
pub enum FrameError {
    /// The encoder produced a length that disagrees with the closed-form count.
    #[error("Mismatch between expected ({expected}) and actual ({actual}) number of samples")]
    SanityMismatch { expected: usize, actual: usize },
    /// The output slice cannot hold the whole frame.
    #[error("Buffer too small -> needed: {needed}, available: {available}")]
    BufferTooSmall { needed: usize, available: usize },
}

//==================================================================================LINK_ERROR
#[derive(Error, Debug)]
/// Errors surfaced by the session and the transmit path.
///
/// `E` is the device error type; it carries the device-supplied diagnostics.
pub enum LinkError<E: core::fmt::Debug> {
    /// Link parameters rejected during `init`.
    #[error("Configuration error: {0}")]
    Configuration(ConfigError),
    /// The device refused its configuration or failed to start.
    #[error("Device setup failed: {0:?}")]
    Device(E),
    /// Frame or payload larger than the configured budget. Nothing was sent.
    #[error("Capacity exceeded -> requested: {requested}, capacity: {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },
    /// Command issued before `init` (or after `end`).
    #[error("Session is not initialized")]
    NotInitialized,
    /// Device write or read failed.
    #[error("Hardware I/O error: {0:?}")]
    Hardware(E),
    /// The device accepted fewer samples than the chunk holds. The frame was aborted.
    #[error("Short write -> written: {written}, expected: {expected}")]
    ShortWrite { written: usize, expected: usize },
    /// Internal encoder inconsistency. The frame was aborted.
    #[error("Mismatch between expected ({expected}) and actual ({actual}) number of samples")]
    SanityMismatch { expected: usize, actual: usize },
}

impl<E: core::fmt::Debug> From<ConfigError> for LinkError<E> {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err)
    }
}

impl<E: core::fmt::Debug> From<FrameError> for LinkError<E> {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::SanityMismatch { expected, actual } => {
                Self::SanityMismatch { expected, actual }
            }
            FrameError::BufferTooSmall { needed, available } => Self::CapacityExceeded {
                requested: needed,
                capacity: available,
            },
        }
    }
}
