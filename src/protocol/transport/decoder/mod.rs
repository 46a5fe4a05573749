//! Trigger-framed packet decoder: rebuilds byte packets from a sampled
//! trigger/data stream.
//!
//! There is no header on the wire. A packet is every complete byte latched
//! while the trigger line is asserted; its boundaries are the trigger edges.
//! Bytes land in a circular buffer, so a packet longer than the buffer keeps
//! only its most recent bytes.
use core::cell::RefCell;

use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex, Mutex},
    signal::Signal,
};
use embassy_time::Duration;

use crate::core::{BitOrder, InputSample, ReceivedPacket, BITS_PER_BYTE, RECV_CAPACITY};
use crate::infra::codec::ring::CircularByteBuffer;

//==================================================================================DECODER
/// Edge-detection state machine. Owns the receive ring and the bit cursors.
#[derive(Debug, Clone)]
pub struct FrameDecoder<const N: usize = RECV_CAPACITY> {
    ring: CircularByteBuffer<N>,
    bit_order: BitOrder,
    current: u8,
    bit_cursor: usize,
    previous_trigger: bool,
}

impl<const N: usize> FrameDecoder<N> {
    /// Decoder assembling bytes in `bit_order`, the order the transmit side
    /// clocks them out.
    ///
    /// The n-th bit latched in a byte lands at `bit_order.bit_position(n)`.
    /// Only [`BitOrder::LsbFirst`] stores bit n at position n. A peer that
    /// always sends least significant bit first is read bit-reversed under
    /// [`BitOrder::MsbFirst`], so such links must be configured `LsbFirst`.
    pub const fn new(bit_order: BitOrder) -> Self {
        Self {
            ring: CircularByteBuffer::new(),
            bit_order,
            current: 0,
            bit_cursor: 0,
            previous_trigger: false,
        }
    }

    #[inline]
    pub fn bit_order(&self) -> BitOrder {
        self.bit_order
    }

    /// Complete bytes buffered for the packet in progress.
    #[inline]
    pub fn pending_bytes(&self) -> usize {
        self.ring.len()
    }

    /// Feed one input sample.
    ///
    /// A trigger edge (either direction) hands the buffered bytes, oldest first,
    /// to `publish` and resets the cursors. Returns `true` when a packet was
    /// published. Edges with nothing buffered publish nothing.
    pub fn process_sample<F>(&mut self, sample: InputSample, mut publish: F) -> bool
    where
        F: FnMut(&[u8], &[u8]),
    {
        let trigger = sample.trigger_asserted();
        let mut published = false;

        if trigger != self.previous_trigger {
            published = self.finalize(&mut publish);
        }

        if trigger {
            self.latch(sample.data_asserted());
        }

        self.previous_trigger = trigger;
        published
    }

    /// Drop every buffered bit and forget the trigger level.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.current = 0;
        self.bit_cursor = 0;
        self.previous_trigger = false;
    }

    fn latch(&mut self, level: bool) {
        let bit = u8::from(level) << self.bit_order.bit_position(self.bit_cursor);
        if self.bit_cursor == 0 {
            self.current = bit;
        } else {
            self.current |= bit;
        }

        self.bit_cursor += 1;
        if self.bit_cursor == BITS_PER_BYTE {
            self.ring.push(self.current);
            self.bit_cursor = 0;
        }
    }

    fn finalize<F>(&mut self, publish: &mut F) -> bool
    where
        F: FnMut(&[u8], &[u8]),
    {
        let published = !self.ring.is_empty();
        if published {
            let (head, tail) = self.ring.as_slices();
            publish(head, tail);
        }

        self.ring.clear();
        self.current = 0;
        self.bit_cursor = 0;
        published
    }
}

//==================================================================================PACKET_SLOT
#[derive(Debug, Clone, Copy)]
struct Mailbox<const N: usize> {
    packet: ReceivedPacket<N>,
    /// Published and not yet taken.
    fresh: bool,
}

/// Single-packet mailbox between the decoder task and `receive`.
///
/// Publishing overwrites the previous packet, consumed or not. A packet is
/// handed out at most once: taking it clears the freshness flag and the
/// pending wake-up under the same lock.
pub struct PacketSlot<const N: usize = RECV_CAPACITY> {
    mailbox: Mutex<CriticalSectionRawMutex, RefCell<Mailbox<N>>>,
    ready: Signal<CriticalSectionRawMutex, ()>,
}

impl<const N: usize> Default for PacketSlot<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PacketSlot<N> {
    pub const fn new() -> Self {
        Self {
            mailbox: Mutex::new(RefCell::new(Mailbox {
                packet: ReceivedPacket::new(),
                fresh: false,
            })),
            ready: Signal::new(),
        }
    }

    /// Store a packet given as two ring parts and wake the waiting reader.
    pub fn publish(&self, head: &[u8], tail: &[u8], timestamp: Duration) {
        self.mailbox.lock(|mailbox| {
            let mut mailbox = mailbox.borrow_mut();
            mailbox.packet.fill(head, tail, timestamp);
            mailbox.fresh = true;
        });
        self.ready.signal(());
    }

    /// Latest packet if one was published since the last take.
    pub fn try_take(&self) -> Option<ReceivedPacket<N>> {
        self.take()
    }

    /// Wait for the next publication.
    ///
    /// A wake-up whose packet was already taken is skipped.
    pub async fn wait(&self) -> ReceivedPacket<N> {
        loop {
            self.ready.wait().await;
            if let Some(packet) = self.take() {
                return packet;
            }
        }
    }

    /// Forget the stored packet and any pending publication.
    pub fn clear(&self) {
        self.mailbox.lock(|mailbox| {
            let mut mailbox = mailbox.borrow_mut();
            mailbox.packet.clear();
            mailbox.fresh = false;
            let _ = self.ready.try_take();
        });
    }

    fn take(&self) -> Option<ReceivedPacket<N>> {
        self.mailbox.lock(|mailbox| {
            let mut mailbox = mailbox.borrow_mut();
            let _ = self.ready.try_take();
            if !mailbox.fresh {
                return None;
            }
            mailbox.fresh = false;
            Some(mailbox.packet)
        })
    }
}
