//! Transport layer: device abstraction traits, the chunked transmit scheduler
//! and the trigger-edge frame decoder.

pub mod decoder;
pub mod scheduler;
pub mod traits;

/// Sleep between two device reads that returned no sample (ms).
///
/// Keeps the decoder loop from spinning while the input buffer is empty.
pub const POLL_INTERVAL_MS: u64 = 1;

/// Output sample clock used when the configuration does not set one (Hz).
///
/// Two output samples make one bus clock period at most, so the bus itself
/// runs well below this rate.
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 1_000_000;

/// Number of digital lines on one device port. Line numbers must stay below it.
pub const PORT_WIDTH: u8 = 32;
