//! Chunked transmit scheduler: streams the samples of one frame into a
//! fixed-size window and flushes the window to the device each time it fills.
//!
//! Each flush is a blocking `write_chunk`, then `wait_until_done`, then `stop`,
//! so the device never holds more than one window. The last window is padded
//! with [`Sample::IDLE`] so the bus is left released.
use crate::core::{Sample, DEFAULT_MAX_CHUNKS};
use crate::error::LinkError;
use crate::protocol::transport::traits::device::SampleWriter;

//==================================================================================SAMPLE_BUFFER
/// One device chunk: a byte per sample for each driven line.
#[derive(Debug, Clone)]
pub struct SampleBuffer<const N: usize> {
    clock: [u8; N],
    data: [u8; N],
    trigger: [u8; N],
    len: usize,
    trigger_enabled: bool,
}

impl<const N: usize> SampleBuffer<N> {
    pub const fn new(trigger_enabled: bool) -> Self {
        Self {
            clock: [0; N],
            data: [0; N],
            trigger: [0; N],
            len: 0,
            trigger_enabled,
        }
    }

    /// Append a sample. Returns `false` (and drops the sample) when the window is full.
    pub fn push(&mut self, sample: Sample) -> bool {
        if self.len == N {
            return false;
        }
        self.clock[self.len] = u8::from(sample.clock);
        self.data[self.len] = u8::from(sample.data);
        self.trigger[self.len] = u8::from(sample.trigger && self.trigger_enabled);
        self.len += 1;
        true
    }

    /// Fill the rest of the window with idle samples.
    pub fn pad_idle(&mut self) {
        while self.push(Sample::IDLE) {}
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
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    pub fn trigger_enabled(&self) -> bool {
        self.trigger_enabled
    }

    pub fn set_trigger_enabled(&mut self, enabled: bool) {
        self.trigger_enabled = enabled;
    }

    /// Clock line levels written so far.
    pub fn clock(&self) -> &[u8] {
        &self.clock[..self.len]
    }

    /// Data line levels written so far.
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Trigger line levels, `None` when the link has no trigger line.
    pub fn trigger(&self) -> Option<&[u8]> {
        self.trigger_enabled.then(|| &self.trigger[..self.len])
    }

    /// Sample at `index`, if written.
    pub fn sample(&self, index: usize) -> Option<Sample> {
        (index < self.len).then(|| {
            Sample::new(self.clock[index] != 0, self.data[index] != 0)
                .with_trigger(self.trigger[index] != 0)
        })
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

//==================================================================================SCHEDULER
/// Progress of the frame currently owned by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmissionState {
    #[default]
    Idle,
    /// Samples produced so far for the current frame.
    Encoding(usize),
    /// Index of the chunk being flushed.
    Flushing(usize),
}

/// Owns the output device and the single encode window.
pub struct TransmitScheduler<W: SampleWriter, const N: usize> {
    writer: W,
    window: SampleBuffer<N>,
    state: TransmissionState,
    max_chunks: usize,
}

impl<W: SampleWriter, const N: usize> TransmitScheduler<W, N> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            window: SampleBuffer::new(false),
            state: TransmissionState::Idle,
            max_chunks: DEFAULT_MAX_CHUNKS,
        }
    }

    /// Largest frame accepted, in samples per line.
    #[inline]
    pub fn capacity(&self) -> usize {
        N.saturating_mul(self.max_chunks)
    }

    #[inline]
    pub fn max_chunks(&self) -> usize {
        self.max_chunks
    }

    pub fn set_max_chunks(&mut self, max_chunks: usize) {
        self.max_chunks = max_chunks;
    }

    pub fn set_trigger_enabled(&mut self, enabled: bool) {
        self.window.set_trigger_enabled(enabled);
    }

    #[inline]
    pub fn state(&self) -> TransmissionState {
        self.state
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Stream `samples` to the device in chunks of `N`.
    ///
    /// `expected` is the closed-form frame length; it is checked against the
    /// capacity before any device call and against the produced count once the
    /// iterator is exhausted. Returns the number of frame samples transmitted,
    /// padding excluded.
    pub async fn transmit<I>(
        &mut self,
        samples: I,
        expected: usize,
    ) -> Result<usize, LinkError<W::Error>>
    where
        I: IntoIterator<Item = Sample>,
    {
        let capacity = self.capacity();
        if expected > capacity {
            #[cfg(feature = "defmt")]
            defmt::warn!("Frame of {} samples exceeds capacity {}", expected, capacity);
            return Err(LinkError::CapacityExceeded {
                requested: expected,
                capacity,
            });
        }

        self.window.clear();
        let mut produced = 0;
        let mut chunk = 0;

        for sample in samples {
            if self.window.is_full() {
                if chunk + 1 >= self.max_chunks {
                    self.abort();
                    return Err(LinkError::SanityMismatch {
                        expected,
                        actual: produced + 1,
                    });
                }
                if let Err(err) = self.flush(chunk).await {
                    self.abort();
                    return Err(err);
                }
                chunk += 1;
            }
            self.window.push(sample);
            produced += 1;
            self.state = TransmissionState::Encoding(produced);
        }

        if produced != expected {
            #[cfg(feature = "defmt")]
            defmt::error!(
                "Sample count mismatch: expected {}, produced {}",
                expected,
                produced
            );
            self.abort();
            return Err(LinkError::SanityMismatch {
                expected,
                actual: produced,
            });
        }

        if !self.window.is_empty() {
            self.window.pad_idle();
            if let Err(err) = self.flush(chunk).await {
                self.abort();
                return Err(err);
            }
        }

        self.state = TransmissionState::Idle;
        Ok(produced)
    }

    async fn flush(&mut self, chunk: usize) -> Result<(), LinkError<W::Error>> {
        self.state = TransmissionState::Flushing(chunk);
        #[cfg(feature = "defmt")]
        defmt::trace!("Flushing chunk {}", chunk);

        let written = self
            .writer
            .write_chunk(&self.window, true)
            .await
            .map_err(LinkError::Hardware)?;
        if written != N {
            #[cfg(feature = "defmt")]
            defmt::error!("Short write on chunk {}: {} of {} samples", chunk, written, N);
            return Err(LinkError::ShortWrite {
                written,
                expected: N,
            });
        }
        self.writer
            .wait_until_done()
            .await
            .map_err(LinkError::Hardware)?;
        self.writer.stop().await.map_err(LinkError::Hardware)?;

        self.window.clear();
        Ok(())
    }

    /// Drop the partial frame and return to idle.
    fn abort(&mut self) {
        self.window.clear();
        self.state = TransmissionState::Idle;
    }
}
