/// Test doubles to simulate the digital I/O device and timer during integration tests.
use daq_bitbang::core::{InputSample, Sample};
use daq_bitbang::protocol::transport::{
    scheduler::SampleBuffer,
    traits::{
        device::{DeviceConfig, DigitalDevice, SampleReader, SampleWriter},
        link_timer::LinkTimer,
    },
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum MockError {
    ConfigureRejected,
    WriteFailed,
    ReadFailed,
}

//==================================================================================WRITER
#[derive(Debug, Default)]
#[allow(dead_code)]
/// Everything the writer has been asked to do.
pub struct WriterLog {
    pub configured: Vec<DeviceConfig>,
    pub starts: usize,
    pub stops: usize,
    pub waits: usize,
    pub resets: Vec<u32>,
    pub chunks: Vec<Vec<Sample>>,
    pub trigger_lane: Vec<bool>,
    /// Fail the next `write_chunk` call.
    pub fail_next_write: bool,
    /// Report this many accepted samples on the next `write_chunk` call.
    pub short_next_write: Option<usize>,
    pub reject_configure: bool,
}

#[allow(dead_code)]
impl WriterLog {
    /// Every written sample, chunks concatenated.
    pub fn samples(&self) -> Vec<Sample> {
        self.chunks.iter().flatten().copied().collect()
    }

    pub fn device_calls(&self) -> usize {
        self.configured.len() + self.starts + self.stops + self.waits + self.chunks.len()
    }
}

/// Gate holding `write_chunk` until released, to create contention on purpose.
#[derive(Default)]
#[allow(dead_code)]
pub struct WriteGate {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Clone, Default)]
#[allow(dead_code)]
/// In-memory output device recording every chunk.
pub struct MockWriter {
    pub log: Arc<Mutex<WriterLog>>,
    gate: Option<Arc<WriteGate>>,
    loopback: Option<Loopback>,
}

#[allow(dead_code)]
impl MockWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block every write until `gate.release` is notified.
    pub fn with_gate(mut self, gate: Arc<WriteGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Forward the written lines to `loopback`, sampled on rising clock edges.
    pub fn with_loopback(mut self, loopback: Loopback) -> Self {
        self.loopback = Some(loopback);
        self
    }
}

impl DigitalDevice for MockWriter {
    type Error = MockError;

    async fn configure<'a>(&'a mut self, config: &'a DeviceConfig) -> Result<(), Self::Error> {
        let mut log = self.log.lock().unwrap();
        if log.reject_configure {
            return Err(MockError::ConfigureRejected);
        }
        log.configured.push(*config);
        Ok(())
    }

    async fn start<'a>(&'a mut self) -> Result<(), Self::Error> {
        self.log.lock().unwrap().starts += 1;
        Ok(())
    }

    async fn stop<'a>(&'a mut self) -> Result<(), Self::Error> {
        self.log.lock().unwrap().stops += 1;
        Ok(())
    }

    async fn reset<'a>(&'a mut self, device_id: u32) -> Result<(), Self::Error> {
        self.log.lock().unwrap().resets.push(device_id);
        Ok(())
    }
}

impl SampleWriter for MockWriter {
    async fn write_chunk<'a, const N: usize>(
        &'a mut self,
        chunk: &'a SampleBuffer<N>,
        _blocking: bool,
    ) -> Result<usize, Self::Error> {
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let samples: Vec<Sample> = (0..chunk.len()).filter_map(|i| chunk.sample(i)).collect();
        {
            let mut log = self.log.lock().unwrap();
            if log.fail_next_write {
                log.fail_next_write = false;
                return Err(MockError::WriteFailed);
            }
            log.trigger_lane.push(chunk.trigger().is_some());
            log.chunks.push(samples.clone());
            if let Some(accepted) = log.short_next_write.take() {
                return Ok(accepted);
            }
        }

        if let Some(loopback) = &self.loopback {
            loopback.feed(&samples);
        }
        Ok(chunk.len())
    }

    async fn wait_until_done<'a>(&'a mut self) -> Result<(), Self::Error> {
        self.log.lock().unwrap().waits += 1;
        Ok(())
    }
}

//==================================================================================LOOPBACK
#[derive(Debug, Default)]
struct LoopbackState {
    pending: VecDeque<InputSample>,
    last_clock: bool,
}

#[derive(Clone, Debug, Default)]
#[allow(dead_code)]
/// Wire between the writer and the reader: one input sample per rising clock edge,
/// the way an acquisition clocked by the bus clock sees the lines.
pub struct Loopback {
    state: Arc<Mutex<LoopbackState>>,
}

#[allow(dead_code)]
impl Loopback {
    pub fn new() -> Self {
        let loopback = Self::default();
        loopback.state.lock().unwrap().last_clock = true;
        loopback
    }

    pub fn feed(&self, samples: &[Sample]) {
        let mut state = self.state.lock().unwrap();
        for sample in samples {
            if sample.clock && !state.last_clock {
                state
                    .pending
                    .push_back(InputSample::new(sample.trigger as u8, sample.data as u8));
            }
            state.last_clock = sample.clock;
        }
    }

    fn drain(&self, buffer: &mut [InputSample]) -> usize {
        let mut state = self.state.lock().unwrap();
        let count = buffer.len().min(state.pending.len());
        for slot in buffer[..count].iter_mut() {
            if let Some(sample) = state.pending.pop_front() {
                *slot = sample;
            }
        }
        count
    }
}

//==================================================================================READER
#[derive(Debug, Default)]
#[allow(dead_code)]
pub struct ReaderLog {
    pub configured: Vec<DeviceConfig>,
    pub starts: usize,
    pub stops: usize,
    pub reads: usize,
    /// Scripted batches returned before the loopback is consulted.
    pub batches: VecDeque<Vec<InputSample>>,
    /// Fail once the scripted batches are exhausted.
    pub fail_when_drained: bool,
}

#[derive(Clone, Default)]
#[allow(dead_code)]
/// In-memory acquisition device.
pub struct MockReader {
    pub log: Arc<Mutex<ReaderLog>>,
    loopback: Option<Loopback>,
}

#[allow(dead_code)]
impl MockReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loopback(mut self, loopback: Loopback) -> Self {
        self.loopback = Some(loopback);
        self
    }

    pub fn with_batches(self, batches: Vec<Vec<InputSample>>) -> Self {
        self.log.lock().unwrap().batches.extend(batches);
        self
    }
}

impl DigitalDevice for MockReader {
    type Error = MockError;

    async fn configure<'a>(&'a mut self, config: &'a DeviceConfig) -> Result<(), Self::Error> {
        self.log.lock().unwrap().configured.push(*config);
        Ok(())
    }

    async fn start<'a>(&'a mut self) -> Result<(), Self::Error> {
        self.log.lock().unwrap().starts += 1;
        Ok(())
    }

    async fn stop<'a>(&'a mut self) -> Result<(), Self::Error> {
        self.log.lock().unwrap().stops += 1;
        Ok(())
    }

    async fn reset<'a>(&'a mut self, _device_id: u32) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl SampleReader for MockReader {
    async fn read_samples<'a>(
        &'a mut self,
        buffer: &'a mut [InputSample],
        _blocking: bool,
    ) -> Result<usize, Self::Error> {
        let mut log = self.log.lock().unwrap();
        log.reads += 1;

        if let Some(batch) = log.batches.pop_front() {
            let count = batch.len().min(buffer.len());
            buffer[..count].copy_from_slice(&batch[..count]);
            return Ok(count);
        }
        if log.fail_when_drained {
            return Err(MockError::ReadFailed);
        }
        drop(log);

        Ok(self
            .loopback
            .as_ref()
            .map_or(0, |loopback| loopback.drain(buffer)))
    }
}

//==================================================================================TIMER
#[allow(dead_code)]
/// Timer based on `tokio::time` to drive delays and timestamps in tests.
pub struct MockTimer {
    origin: std::time::Instant,
}

#[allow(dead_code)]
impl MockTimer {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl LinkTimer for MockTimer {
    fn now(&self) -> embassy_time::Instant {
        embassy_time::Instant::from_micros(self.origin.elapsed().as_micros() as u64)
    }

    async fn delay<'a>(&'a self, duration: embassy_time::Duration) {
        sleep(std::time::Duration::from_micros(duration.as_micros())).await;
    }
}
