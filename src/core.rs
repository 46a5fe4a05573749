//! Core data types shared by the codec layer (cell/frame encoders, ring buffer)
//! and the protocol layer (scheduler, decoder, session).
//!
//! Everything here is fixed-capacity and allocation-free: buffers are sized by
//! the constants below, which mirror the device buffers the link is built for.

use embassy_time::Duration;

//==================================================================================CONSTANTS
/// Device output buffer capacity, in samples per line. One chunk = one full buffer.
pub const BUFFER_SEND: usize = 2048;

/// Device input buffer capacity, in samples.
pub const BUFFER_RECV: usize = 8192;

/// Capacity of the receive ring, in bytes.
pub const RECV_CAPACITY: usize = 2 * BUFFER_RECV;

/// Largest payload accepted by a background send (staging capacity, in bytes).
pub const MAX_SEND: usize = BUFFER_SEND * 10;

/// Number of address bits emitted by the address phase. The address value is always zero.
pub const ADDRESS_BITS: usize = 7;

/// Bits per transmitted byte.
pub const BITS_PER_BYTE: usize = 8;

/// Default chunk budget: enough windows for the largest stageable payload.
pub const DEFAULT_MAX_CHUNKS: usize =
    FrameProfile::I2C.frame_len(MAX_SEND).div_ceil(BUFFER_SEND);

//==================================================================================SAMPLES
/// One output time slice across the three driven lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    /// Bus clock line.
    pub clock: bool,
    /// Bus data line.
    pub data: bool,
    /// Packet trigger line (ignored when no trigger line is configured).
    pub trigger: bool,
}

impl Sample {
    /// Bus released: clock and data high, trigger low. Used to pad the final chunk.
    pub const IDLE: Self = Self {
        clock: true,
        data: true,
        trigger: false,
    };

    /// Build a sample without trigger.
    pub const fn new(clock: bool, data: bool) -> Self {
        Self {
            clock,
            data,
            trigger: false,
        }
    }

    /// Same sample with the trigger line set to `trigger`.
    pub const fn with_trigger(mut self, trigger: bool) -> Self {
        self.trigger = trigger;
        self
    }
}

/// One acquired input time slice. Any level above zero counts as asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputSample {
    /// Trigger line level.
    pub trigger: u8,
    /// Data line level.
    pub data: u8,
}

impl InputSample {
    pub const fn new(trigger: u8, data: u8) -> Self {
        Self { trigger, data }
    }

    #[inline]
    pub fn trigger_asserted(&self) -> bool {
        self.trigger > 0
    }

    #[inline]
    pub fn data_asserted(&self) -> bool {
        self.data > 0
    }
}

//==================================================================================PACKET_SPEC
/// Order in which the bits of each payload byte go on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    /// Bit 7 first, bit 0 last.
    #[default]
    MsbFirst,
    /// Bit 0 first, bit 7 last.
    LsbFirst,
}

impl BitOrder {
    /// Map the host endianness flag of the init command to a bit order.
    ///
    /// Big-endian hosts transmit least significant bit first.
    pub const fn from_host_endianness(is_big_endian: bool) -> Self {
        if is_big_endian {
            Self::LsbFirst
        } else {
            Self::MsbFirst
        }
    }

    /// Position inside the byte of the `index`-th transmitted bit (0..8).
    #[inline]
    pub const fn bit_position(self, index: usize) -> usize {
        match self {
            Self::MsbFirst => BITS_PER_BYTE - 1 - index,
            Self::LsbFirst => index,
        }
    }
}

/// Which optional phases a frame carries.
///
/// The profile replaces separate encoder variants: the I2C framing (address
/// phase plus ACK slots) and the trigger-framed stream (payload bits only) are
/// two values of this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameProfile {
    /// Emit the address, write-command and header ACK slots.
    pub has_address: bool,
    /// Emit ACK slots (after the header and after every byte).
    pub has_ack_slots: bool,
}

impl Default for FrameProfile {
    fn default() -> Self {
        Self::I2C
    }
}

impl FrameProfile {
    /// Start, zero address, write command, ACKs, data bytes with ACKs, stop.
    pub const I2C: Self = Self {
        has_address: true,
        has_ack_slots: true,
    };

    /// Start, data bits, stop. Packet boundaries come from the trigger line.
    pub const TRIGGERED: Self = Self {
        has_address: false,
        has_ack_slots: false,
    };

    /// Samples per line for a frame carrying `byte_count` bytes (closed form).
    pub const fn frame_len(&self, byte_count: usize) -> usize {
        const START: usize = 2;
        const STOP: usize = 4;
        const CONTROL_CELL: usize = 2;
        const DATA_CELL: usize = 3;

        let header = if self.has_address {
            let ack = if self.has_ack_slots { 1 } else { 0 };
            CONTROL_CELL * (ADDRESS_BITS + 1 + ack)
        } else {
            0
        };
        let per_byte = DATA_CELL * BITS_PER_BYTE + if self.has_ack_slots { DATA_CELL } else { 0 };

        START + header + per_byte * byte_count + STOP
    }
}

/// Shape of one frame. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PacketSpec {
    pub profile: FrameProfile,
    pub byte_count: usize,
    pub bit_order: BitOrder,
}

impl PacketSpec {
    pub const fn new(profile: FrameProfile, byte_count: usize, bit_order: BitOrder) -> Self {
        Self {
            profile,
            byte_count,
            bit_order,
        }
    }

    /// Expected frame length in samples per line.
    #[inline]
    pub const fn frame_len(&self) -> usize {
        self.profile.frame_len(self.byte_count)
    }
}

//==================================================================================BYTE_BUFFERS
/// Private copy of a payload handed to a background send.
#[derive(Clone)]
pub struct StagedPayload {
    len: usize,
    data: [u8; MAX_SEND],
}

impl core::fmt::Debug for StagedPayload {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StagedPayload")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl StagedPayload {
    /// Copy `payload` into a staging buffer. `None` when it does not fit.
    pub fn copy_from(payload: &[u8]) -> Option<Self> {
        if payload.len() > MAX_SEND {
            return None;
        }
        let mut staged = Self {
            len: payload.len(),
            data: [0; MAX_SEND],
        };
        staged.data[..payload.len()].copy_from_slice(payload);
        Some(staged)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

/// Last packet rebuilt by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceivedPacket<const N: usize = RECV_CAPACITY> {
    len: usize,
    data: [u8; N],
    /// Time elapsed between the last transmit start and the read that completed the packet.
    pub timestamp: Duration,
}

impl<const N: usize> Default for ReceivedPacket<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ReceivedPacket<N> {
    /// Empty packet.
    pub const fn new() -> Self {
        Self {
            len: 0,
            data: [0; N],
            timestamp: Duration::from_ticks(0),
        }
    }

    /// Overwrite the packet with `head` followed by `tail` (ring order, oldest first).
    pub fn fill(&mut self, head: &[u8], tail: &[u8], timestamp: Duration) {
        let head_len = head.len().min(N);
        let tail_len = tail.len().min(N - head_len);
        self.data[..head_len].copy_from_slice(&head[..head_len]);
        self.data[head_len..head_len + tail_len].copy_from_slice(&tail[..tail_len]);
        self.len = head_len + tail_len;
        self.timestamp = timestamp;
    }

    /// Number of valid bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Drop the content, keep the storage.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
        self.timestamp = Duration::from_ticks(0);
    }
}
