//! Frame encoder: expands a payload into the full sample sequence of one
//! bus frame (start, optional address phase, data bytes, stop).
//!
//! Samples are produced lazily by [`FrameSamples`], one at a time, so the
//! transmit scheduler can stream them into its chunk window without ever
//! materializing the whole frame.
use crate::core::{BitOrder, FrameProfile, PacketSpec, Sample, ADDRESS_BITS, BITS_PER_BYTE};
use crate::error::FrameError;
use crate::infra::codec::cell::{encode_cell, Cell, CellKind};

/// Logical slot of a frame. Each slot expands into one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slot {
    Start,
    /// Address bit, write command or header ACK; the data line is held.
    Control,
    /// `index`-th transmitted bit of payload byte `byte`.
    Bit { byte: usize, index: usize },
    /// ACK slot following a payload byte, always driven low.
    Ack,
    Stop,
}

impl Slot {
    fn kind(self) -> CellKind {
        match self {
            Self::Start => CellKind::Start,
            Self::Control => CellKind::Control,
            Self::Bit { .. } | Self::Ack => CellKind::Data,
            Self::Stop => CellKind::Stop,
        }
    }
}

#[derive(Debug, Clone, Copy)]
/// Payload plus the shape of the frame that carries it.
pub struct FrameEncoder<'a> {
    spec: PacketSpec,
    payload: &'a [u8],
}

impl<'a> FrameEncoder<'a> {
    pub fn new(spec: PacketSpec, payload: &'a [u8]) -> Self {
        Self { spec, payload }
    }

    /// Encoder for `payload` with its byte count filled in.
    pub fn for_payload(profile: FrameProfile, bit_order: BitOrder, payload: &'a [u8]) -> Self {
        Self::new(PacketSpec::new(profile, payload.len(), bit_order), payload)
    }

    #[inline]
    pub fn spec(&self) -> PacketSpec {
        self.spec
    }

    /// Closed-form sample count of the frame.
    #[inline]
    pub fn frame_len(&self) -> usize {
        self.spec.frame_len()
    }

    fn header_slots(&self) -> usize {
        let profile = self.spec.profile;
        if !profile.has_address {
            return 0;
        }
        ADDRESS_BITS + 1 + usize::from(profile.has_ack_slots)
    }

    fn slots_per_byte(&self) -> usize {
        BITS_PER_BYTE + usize::from(self.spec.profile.has_ack_slots)
    }

    /// Slot at position `position` of the frame, `None` past the stop condition.
    pub fn slot_at(&self, position: usize) -> Option<Slot> {
        if position == 0 {
            return Some(Slot::Start);
        }
        let mut rest = position - 1;

        let header = self.header_slots();
        if rest < header {
            return Some(Slot::Control);
        }
        rest -= header;

        let per_byte = self.slots_per_byte();
        let body = per_byte * self.payload.len();
        if rest < body {
            let byte = rest / per_byte;
            let index = rest % per_byte;
            return Some(if index < BITS_PER_BYTE {
                Slot::Bit { byte, index }
            } else {
                Slot::Ack
            });
        }
        rest -= body;

        (rest == 0).then_some(Slot::Stop)
    }

    /// Start the lazy expansion.
    pub fn samples(&self) -> FrameSamples<'a> {
        FrameSamples {
            encoder: *self,
            slot: 0,
            cell: None,
            offset: 0,
            previous: Sample::IDLE,
        }
    }

    /// Write the whole frame into `out` and return the number of samples written.
    ///
    /// The produced count is checked against the closed-form length.
    pub fn encode_into(&self, out: &mut [Sample]) -> Result<usize, FrameError> {
        let expected = self.frame_len();
        if out.len() < expected {
            return Err(FrameError::BufferTooSmall {
                needed: expected,
                available: out.len(),
            });
        }

        let mut produced = 0;
        for sample in self.samples() {
            if let Some(slot) = out.get_mut(produced) {
                *slot = sample;
            }
            produced += 1;
        }

        if produced != expected {
            return Err(FrameError::SanityMismatch {
                expected,
                actual: produced,
            });
        }
        Ok(produced)
    }
}

/// Lazy iterator returning the frame samples one by one.
pub struct FrameSamples<'a> {
    encoder: FrameEncoder<'a>,
    slot: usize,
    cell: Option<Cell>,
    offset: usize,
    previous: Sample,
}

impl FrameSamples<'_> {
    fn expand(&self, slot: Slot) -> Cell {
        let (bit, trigger) = match slot {
            Slot::Bit { byte, index } => {
                let position = self.encoder.spec.bit_order.bit_position(index);
                let bit = (self.encoder.payload[byte] >> position) & 1 == 1;
                (bit, true)
            }
            _ => (false, false),
        };
        encode_cell(slot.kind(), bit, self.previous, trigger)
    }
}

impl Iterator for FrameSamples<'_> {
    type Item = Sample;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(cell) = self.cell {
                if let Some(sample) = cell.as_slice().get(self.offset) {
                    self.offset += 1;
                    self.previous = *sample;
                    return Some(*sample);
                }
                self.cell = None;
                self.offset = 0;
                self.slot += 1;
            }

            let slot = self.encoder.slot_at(self.slot)?;
            self.cell = Some(self.expand(slot));
        }
    }
}
