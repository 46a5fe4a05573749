//! Link session: owns the output device, the shared encode window, the
//! received-packet mailbox and the background staging slot.
//!
//! All methods take `&self`, so one session can be shared between the
//! application, the [`DecoderRunner`] and the [`BackgroundWorker`]:
//!
//! * the transmit path is serialized by an async mutex around the scheduler
//!   (see [`guard`]);
//! * the receive path only shares the finished packet, through a
//!   [`PacketSlot`].
//!
//! Nothing is allocated; the firmware (or the test) decides where the session
//! lives, typically in a `StaticCell`.
use core::cell::RefCell;
use core::fmt::Debug;

use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex, Mutex as BlockingMutex},
    channel::Channel,
    mutex::Mutex,
};
use embassy_time::{Duration, Instant};
use futures_util::{future::select, future::Either, pin_mut};

use crate::core::{InputSample, ReceivedPacket, BUFFER_RECV, BUFFER_SEND, RECV_CAPACITY};
use crate::error::{ConfigError, LinkError};
use crate::protocol::transport::decoder::{FrameDecoder, PacketSlot};
use crate::protocol::transport::scheduler::TransmitScheduler;
use crate::protocol::transport::traits::device::{SampleReader, SampleWriter};
use crate::protocol::transport::traits::link_timer::LinkTimer;
use crate::protocol::transport::POLL_INTERVAL_MS;

pub mod command;
pub mod config;
pub mod guard;

use config::LinkConfig;
use guard::{JobLedger, StagedJob};

//==================================================================================SESSION
/// Link parameters of the running session.
#[derive(Debug, Clone, Copy)]
struct LinkState {
    config: Option<LinkConfig>,
    /// Bumped on every `init` and `end`; a decoder loop only runs for the generation it started in.
    generation: u32,
    last_transmit: Instant,
}

impl LinkState {
    const fn new() -> Self {
        Self {
            config: None,
            generation: 0,
            last_transmit: Instant::from_ticks(0),
        }
    }
}

/// One link between the host and a digital I/O device.
///
/// `N` is the device chunk size in samples per line.
pub struct Session<W, T, const N: usize = BUFFER_SEND>
where
    W: SampleWriter,
    T: LinkTimer,
{
    scheduler: Mutex<CriticalSectionRawMutex, TransmitScheduler<W, N>>,
    link: BlockingMutex<CriticalSectionRawMutex, RefCell<LinkState>>,
    packets: PacketSlot,
    staging: Channel<CriticalSectionRawMutex, StagedJob, 1>,
    staging_order: Mutex<CriticalSectionRawMutex, ()>,
    jobs: BlockingMutex<CriticalSectionRawMutex, RefCell<JobLedger<W::Error>>>,
    timer: T,
}

impl<W, T, const N: usize> Session<W, T, N>
where
    W: SampleWriter,
    W::Error: Debug,
    T: LinkTimer,
{
    /// Closed session around an output device. Nothing is touched before `init`.
    pub fn new(writer: W, timer: T) -> Self {
        Self {
            scheduler: Mutex::new(TransmitScheduler::new(writer)),
            link: BlockingMutex::new(RefCell::new(LinkState::new())),
            packets: PacketSlot::new(),
            staging: Channel::new(),
            staging_order: Mutex::new(()),
            jobs: BlockingMutex::new(RefCell::new(JobLedger::new())),
            timer,
        }
    }

    /// Validate `config`, tear down any previous session, then configure and start the writer.
    pub async fn init(&self, config: LinkConfig) -> Result<(), LinkError<W::Error>> {
        config.validate()?;
        self.end().await?;

        let mut scheduler = self.scheduler.lock().await;
        scheduler.set_trigger_enabled(config.trigger_line.is_some());
        scheduler.set_max_chunks(config.max_chunks);

        let device = config.output_device(N);
        let writer = scheduler.writer_mut();
        writer.configure(&device).await.map_err(LinkError::Device)?;
        writer.start().await.map_err(LinkError::Device)?;

        let now = self.timer.now();
        self.link.lock(|link| {
            let mut link = link.borrow_mut();
            link.config = Some(config);
            link.generation = link.generation.wrapping_add(1);
            link.last_transmit = now;
        });

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Link up: device {} port {} at {} Hz",
            config.device_id,
            config.port,
            config.sample_rate_hz
        );
        Ok(())
    }

    /// Close the session. Waits for the transmission in progress, stops the writer,
    /// stops the decoder loop and forgets the last packet. Closing twice is a no-op.
    pub async fn end(&self) -> Result<(), LinkError<W::Error>> {
        let mut scheduler = self.scheduler.lock().await;

        let was_open = self.link.lock(|link| {
            let mut link = link.borrow_mut();
            let was_open = link.config.take().is_some();
            if was_open {
                link.generation = link.generation.wrapping_add(1);
            }
            was_open
        });
        self.packets.clear();
        self.cancel_staged();

        if was_open {
            #[cfg(feature = "defmt")]
            defmt::info!("Link down");
            scheduler
                .writer_mut()
                .stop()
                .await
                .map_err(LinkError::Hardware)?;
        }
        Ok(())
    }

    /// Close the session, then hardware-reset the device.
    pub async fn reset(&self, device_id: u32) -> Result<(), LinkError<W::Error>> {
        self.end().await?;

        #[cfg(feature = "defmt")]
        defmt::warn!("Resetting device {}", device_id);
        let mut scheduler = self.scheduler.lock().await;
        scheduler
            .writer_mut()
            .reset(device_id)
            .await
            .map_err(LinkError::Hardware)
    }

    /// Wait up to `max_wait` for a packet published after the previous `receive`.
    ///
    /// `Ok(None)` on timeout.
    pub async fn receive(
        &self,
        max_wait: Duration,
    ) -> Result<Option<ReceivedPacket>, LinkError<W::Error>> {
        if !self.is_open() {
            return Err(LinkError::NotInitialized);
        }

        let packet = self.packets.wait();
        let timeout = self.timer.delay(max_wait);
        pin_mut!(packet);
        pin_mut!(timeout);

        match select(packet, timeout).await {
            Either::Left((packet, _)) => Ok(Some(packet)),
            Either::Right(_) => Ok(None),
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.config().is_some()
    }

    /// Configuration of the running session.
    pub fn config(&self) -> Option<LinkConfig> {
        self.link.lock(|link| link.borrow().config)
    }

    /// Instant at which the last frame started.
    pub fn last_transmit(&self) -> Instant {
        self.link.lock(|link| link.borrow().last_transmit)
    }

    /// Decoder loop for this session, fed by `reader`.
    pub fn decoder<R: SampleReader>(&self, reader: R) -> DecoderRunner<'_, R, W, T, N> {
        DecoderRunner {
            session: self,
            reader,
        }
    }

    fn mark_transmit_start(&self) {
        let now = self.timer.now();
        self.link.lock(|link| link.borrow_mut().last_transmit = now);
    }

    fn elapsed_since_transmit(&self) -> Duration {
        let now = self.timer.now().as_ticks();
        Duration::from_ticks(now.saturating_sub(self.last_transmit().as_ticks()))
    }

    fn running(&self) -> Option<(LinkConfig, u32)> {
        self.link.lock(|link| {
            let link = link.borrow();
            link.config.map(|config| (config, link.generation))
        })
    }

    fn is_current(&self, generation: u32) -> bool {
        self.running()
            .is_some_and(|(_, current)| current == generation)
    }
}

//==================================================================================DECODER_RUNNER
/// Drives the acquisition device and feeds the frame decoder.
///
/// Returned by [`Session::decoder`]. `run` keeps going while the session it
/// was started in stays open; a new `init` or an `end` stops it.
pub struct DecoderRunner<'s, R, W, T, const N: usize>
where
    R: SampleReader,
    W: SampleWriter,
    T: LinkTimer,
{
    session: &'s Session<W, T, N>,
    reader: R,
}

impl<R, W, T, const N: usize> DecoderRunner<'_, R, W, T, N>
where
    R: SampleReader,
    R::Error: Debug,
    W: SampleWriter,
    W::Error: Debug,
    T: LinkTimer,
{
    /// Configure and start the reader, then decode until the session closes.
    ///
    /// A read error stops the loop and is returned; the transmit path is not affected.
    pub async fn run(mut self) -> Result<R, LinkError<R::Error>> {
        let (config, generation) = self
            .session
            .running()
            .ok_or(LinkError::NotInitialized)?;
        let input = config
            .input_device()
            .ok_or(LinkError::Configuration(ConfigError::MissingInput))?;

        self.reader
            .configure(&input)
            .await
            .map_err(LinkError::Device)?;
        self.reader.start().await.map_err(LinkError::Device)?;

        let mut decoder = FrameDecoder::<RECV_CAPACITY>::new(config.bit_order);
        let mut batch = [InputSample::default(); BUFFER_RECV];

        #[cfg(feature = "defmt")]
        defmt::info!("Decoder started");

        while self.session.is_current(generation) {
            let count = match self.reader.read_samples(&mut batch, false).await {
                Ok(count) => count,
                Err(err) => {
                    #[cfg(feature = "defmt")]
                    defmt::error!("Acquisition read failed, stopping decoder");
                    let _ = self.reader.stop().await;
                    return Err(LinkError::Hardware(err));
                }
            };

            if count == 0 {
                self.session
                    .timer
                    .delay(Duration::from_millis(POLL_INTERVAL_MS))
                    .await;
                continue;
            }

            let timestamp = self.session.elapsed_since_transmit();
            let packets = &self.session.packets;
            for sample in &batch[..count] {
                decoder.process_sample(*sample, |head, tail| {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("Packet of {} bytes", head.len() + tail.len());
                    packets.publish(head, tail, timestamp);
                });
            }
        }

        self.reader.stop().await.map_err(LinkError::Hardware)?;
        Ok(self.reader)
    }
}
