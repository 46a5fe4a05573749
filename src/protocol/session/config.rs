//! Link configuration handed to `init`: device, lines, timing and framing.
use crate::core::{BitOrder, FrameProfile, BUFFER_RECV, DEFAULT_MAX_CHUNKS};
use crate::error::ConfigError;
use crate::protocol::transport::traits::device::{DeviceConfig, LineMap};
use crate::protocol::transport::{DEFAULT_SAMPLE_RATE_HZ, PORT_WIDTH};

/// Lines of the acquisition side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputLines {
    pub trigger_line: u8,
    pub data_line: u8,
    /// Terminal carrying the external sample clock. Not a port line, so it is
    /// not checked against the other lines.
    pub sample_clock_line: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    pub device_id: u32,
    pub port: u8,
    pub clock_line: u8,
    pub data_line: u8,
    /// Output trigger line; `None` transmits clock and data only.
    pub trigger_line: Option<u8>,
    pub bit_order: BitOrder,
    pub profile: FrameProfile,
    /// Output sample clock (Hz).
    pub sample_rate_hz: u32,
    /// Chunk budget of one frame.
    pub max_chunks: usize,
    /// Acquisition lines; `None` when the link only transmits.
    pub input: Option<InputLines>,
}

impl LinkConfig {
    /// Transmit-only I2C link, most significant bit first, at the default rate.
    pub fn new(device_id: u32, port: u8, clock_line: u8, data_line: u8) -> Self {
        Self {
            device_id,
            port,
            clock_line,
            data_line,
            trigger_line: None,
            bit_order: BitOrder::MsbFirst,
            profile: FrameProfile::I2C,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            max_chunks: DEFAULT_MAX_CHUNKS,
            input: None,
        }
    }

    pub fn with_trigger_line(mut self, line: u8) -> Self {
        self.trigger_line = Some(line);
        self
    }

    pub fn with_input(mut self, input: InputLines) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_profile(mut self, profile: FrameProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_bit_order(mut self, bit_order: BitOrder) -> Self {
        self.bit_order = bit_order;
        self
    }

    /// Pick the bit order from the host endianness flag.
    pub fn with_host_endianness(self, is_big_endian: bool) -> Self {
        self.with_bit_order(BitOrder::from_host_endianness(is_big_endian))
    }

    pub fn with_sample_rate(mut self, sample_rate_hz: u32) -> Self {
        self.sample_rate_hz = sample_rate_hz;
        self
    }

    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = max_chunks;
        self
    }

    /// Check line numbers, rate and chunk budget.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::InvalidSampleRate {
                rate_hz: self.sample_rate_hz,
            });
        }
        if self.max_chunks == 0 {
            return Err(ConfigError::ZeroChunkBudget);
        }

        let mut lines = [0u8; 5];
        let mut count = 0;
        let input = self.input.map(|input| [input.trigger_line, input.data_line]);
        let candidates = [self.clock_line, self.data_line]
            .into_iter()
            .chain(self.trigger_line)
            .chain(input.into_iter().flatten());

        for line in candidates {
            if line >= PORT_WIDTH {
                return Err(ConfigError::LineOutOfRange {
                    line,
                    width: PORT_WIDTH,
                });
            }
            if lines[..count].contains(&line) {
                return Err(ConfigError::DuplicateLine { line });
            }
            lines[count] = line;
            count += 1;
        }

        Ok(())
    }

    /// Device setup of the output side, sized for chunks of `chunk_len` samples.
    pub fn output_device(&self, chunk_len: usize) -> DeviceConfig {
        DeviceConfig {
            device_id: self.device_id,
            port: self.port,
            lines: LineMap {
                clock: self.clock_line,
                data: self.data_line,
                trigger: self.trigger_line,
            },
            sample_rate_hz: self.sample_rate_hz,
            buffer_capacity: chunk_len,
        }
    }

    /// Device setup of the acquisition side, sampled at twice the output rate.
    pub fn input_device(&self) -> Option<DeviceConfig> {
        self.input.map(|input| DeviceConfig {
            device_id: self.device_id,
            port: self.port,
            lines: LineMap {
                clock: input.sample_clock_line,
                data: input.data_line,
                trigger: Some(input.trigger_line),
            },
            sample_rate_hz: self.sample_rate_hz.saturating_mul(2),
            buffer_capacity: BUFFER_RECV,
        })
    }
}
