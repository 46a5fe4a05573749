//! Minimal abstraction for a sample-clocked digital I/O device. The output side
//! streams fixed-size chunks of line samples; the input side hands back
//! whatever samples it has buffered.
use crate::core::InputSample;
use crate::protocol::transport::scheduler::SampleBuffer;
use futures_util::Future;

/// Physical lines of one port, by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineMap {
    /// Bus clock on the output side, external sample clock on the input side.
    pub clock: u8,
    pub data: u8,
    /// Packet trigger; `None` leaves the line unused.
    pub trigger: Option<u8>,
}

/// Everything a device needs to prepare one direction of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    pub device_id: u32,
    pub port: u8,
    pub lines: LineMap,
    pub sample_rate_hz: u32,
    /// Device-side buffer size, in samples per line.
    pub buffer_capacity: usize,
}

/// Lifecycle shared by both directions.
pub trait DigitalDevice {
    type Error: core::fmt::Debug;
    /// Reserve the lines, set the timing and size the device buffer.
    fn configure<'a>(
        &'a mut self,
        config: &'a DeviceConfig,
    ) -> impl Future<Output = Result<(), Self::Error>> + 'a;
    /// Arm the task (output) or start the acquisition (input).
    fn start<'a>(&'a mut self) -> impl Future<Output = Result<(), Self::Error>> + 'a;
    /// Stop the running task. Stopping an idle device is not an error.
    fn stop<'a>(&'a mut self) -> impl Future<Output = Result<(), Self::Error>> + 'a;
    /// Hardware reset of the device identified by `device_id`.
    fn reset<'a>(
        &'a mut self,
        device_id: u32,
    ) -> impl Future<Output = Result<(), Self::Error>> + 'a;
}

/// Output direction: streams one chunk of samples per call.
pub trait SampleWriter: DigitalDevice {
    /// Write a full chunk and return the number of samples per line the device accepted.
    fn write_chunk<'a, const N: usize>(
        &'a mut self,
        chunk: &'a SampleBuffer<N>,
        blocking: bool,
    ) -> impl Future<Output = Result<usize, Self::Error>> + 'a;
    /// Wait until every written sample has left the device.
    fn wait_until_done<'a>(&'a mut self) -> impl Future<Output = Result<(), Self::Error>> + 'a;
}

/// Input direction: drains the acquisition buffer.
pub trait SampleReader: DigitalDevice {
    /// Copy up to `buffer.len()` buffered samples; `Ok(0)` when nothing is available.
    fn read_samples<'a>(
        &'a mut self,
        buffer: &'a mut [InputSample],
        blocking: bool,
    ) -> impl Future<Output = Result<usize, Self::Error>> + 'a;
}
