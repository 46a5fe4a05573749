//! Transmission guard: the only way to the encode window.
//!
//! * [`SendMode::MustSend`] waits for the window;
//! * [`SendMode::BestEffort`] gives up at once when another frame holds it and
//!   reports [`SendOutcome::Dropped`], which is not an error;
//! * background sends copy the payload into a staging slot drained by the
//!   [`BackgroundWorker`], which always waits for the window.
//!
//! The outcome of the latest background job is kept until it is collected
//! with [`Session::job_status`].
use core::fmt::Debug;

use crate::core::{StagedPayload, MAX_SEND};
use crate::error::LinkError;
use crate::infra::codec::frame::FrameEncoder;
use crate::protocol::transport::traits::device::SampleWriter;
use crate::protocol::transport::traits::link_timer::LinkTimer;

use super::Session;

//==================================================================================TYPES
/// How `submit` treats a busy encode window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendMode {
    /// Wait for the transmission in progress to finish.
    MustSend,
    /// Drop the frame if a transmission is in progress.
    #[default]
    BestEffort,
}

/// Result of a foreground submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendOutcome {
    /// Frame transmitted; `samples` is its length in samples per line.
    Sent { samples: usize },
    /// Window busy in best-effort mode; nothing was sent.
    Dropped,
}

/// Ticket of a background send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JobHandle {
    id: u32,
}

impl JobHandle {
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }
}

/// State of a background send, as seen by `job_status`.
#[derive(Debug)]
pub enum JobStatus<E: Debug> {
    /// Staged or being transmitted.
    Pending,
    Finished(SendOutcome),
    Failed(LinkError<E>),
    /// Outcome already collected, or replaced by a later job.
    Expired,
}

/// Payload waiting in the staging slot.
#[derive(Debug)]
pub(crate) struct StagedJob {
    id: u32,
    payload: StagedPayload,
}

/// Bookkeeping of background jobs. Jobs complete in staging order.
#[derive(Debug)]
pub(crate) struct JobLedger<E: Debug> {
    issued: u32,
    completed: u32,
    outcome: Option<(u32, Result<SendOutcome, LinkError<E>>)>,
}

impl<E: Debug> JobLedger<E> {
    pub(crate) const fn new() -> Self {
        Self {
            issued: 0,
            completed: 0,
            outcome: None,
        }
    }

    pub(crate) fn issue(&mut self) -> JobHandle {
        self.issued = self.issued.wrapping_add(1);
        JobHandle { id: self.issued }
    }

    pub(crate) fn record(&mut self, id: u32, result: Result<SendOutcome, LinkError<E>>) {
        self.completed = self.completed.max(id);
        let newer = self
            .outcome
            .as_ref()
            .map_or(true, |(latest, _)| id >= *latest);
        if newer {
            self.outcome = Some((id, result));
        }
    }

    pub(crate) fn status(&mut self, handle: JobHandle) -> JobStatus<E> {
        if handle.id > self.completed && handle.id <= self.issued {
            return JobStatus::Pending;
        }
        match self.outcome.take() {
            Some((id, result)) if id == handle.id => match result {
                Ok(outcome) => JobStatus::Finished(outcome),
                Err(err) => JobStatus::Failed(err),
            },
            other => {
                self.outcome = other;
                JobStatus::Expired
            }
        }
    }
}

//==================================================================================GUARD
impl<W, T, const N: usize> Session<W, T, N>
where
    W: SampleWriter,
    W::Error: Debug,
    T: LinkTimer,
{
    /// Encode `payload` and stream it to the device.
    ///
    /// An empty payload is accepted and sends nothing.
    pub async fn submit(
        &self,
        payload: &[u8],
        mode: SendMode,
    ) -> Result<SendOutcome, LinkError<W::Error>> {
        let mut scheduler = match mode {
            SendMode::MustSend => self.scheduler.lock().await,
            SendMode::BestEffort => match self.scheduler.try_lock() {
                Ok(scheduler) => scheduler,
                Err(_) => {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("Encode window busy, dropping {} bytes", payload.len());
                    return Ok(SendOutcome::Dropped);
                }
            },
        };

        let config = self.config().ok_or(LinkError::NotInitialized)?;
        if payload.is_empty() {
            return Ok(SendOutcome::Sent { samples: 0 });
        }

        self.mark_transmit_start();
        let encoder = FrameEncoder::for_payload(config.profile, config.bit_order, payload);
        let samples = scheduler
            .transmit(encoder.samples(), encoder.frame_len())
            .await?;

        #[cfg(feature = "defmt")]
        defmt::trace!("Sent {} bytes as {} samples", payload.len(), samples);
        Ok(SendOutcome::Sent { samples })
    }

    /// Copy `payload` into the staging slot for the [`BackgroundWorker`].
    ///
    /// Waits while a previous job still occupies the slot.
    pub async fn stage(&self, payload: &[u8]) -> Result<JobHandle, LinkError<W::Error>> {
        if !self.is_open() {
            return Err(LinkError::NotInitialized);
        }
        let payload = StagedPayload::copy_from(payload).ok_or(LinkError::CapacityExceeded {
            requested: payload.len(),
            capacity: MAX_SEND,
        })?;

        let _order = self.staging_order.lock().await;
        let handle = self.jobs.lock(|jobs| jobs.borrow_mut().issue());
        self.staging
            .send(StagedJob {
                id: handle.id,
                payload,
            })
            .await;

        #[cfg(feature = "defmt")]
        defmt::debug!("Staged job {}", handle.id);
        Ok(handle)
    }

    /// Outcome of a background job. Finished and failed outcomes are handed out once.
    pub fn job_status(&self, handle: JobHandle) -> JobStatus<W::Error> {
        self.jobs.lock(|jobs| jobs.borrow_mut().status(handle))
    }

    /// Worker draining the staging slot. Must be driven for background sends to progress.
    pub fn worker(&self) -> BackgroundWorker<'_, W, T, N> {
        BackgroundWorker { session: self }
    }

    /// Fail every job still waiting in the staging slot.
    pub(super) fn cancel_staged(&self) {
        while let Ok(job) = self.staging.try_receive() {
            self.jobs
                .lock(|jobs| jobs.borrow_mut().record(job.id, Err(LinkError::NotInitialized)));
        }
    }
}

//==================================================================================WORKER
/// Runner transmitting staged payloads one by one with [`SendMode::MustSend`].
pub struct BackgroundWorker<'s, W, T, const N: usize>
where
    W: SampleWriter,
    T: LinkTimer,
{
    session: &'s Session<W, T, N>,
}

impl<W, T, const N: usize> BackgroundWorker<'_, W, T, N>
where
    W: SampleWriter,
    W::Error: Debug,
    T: LinkTimer,
{
    /// Process the next staged job. Returns its handle once the outcome is recorded.
    pub async fn step(&self) -> JobHandle {
        let job = self.session.staging.receive().await;
        let result = self
            .session
            .submit(job.payload.as_slice(), SendMode::MustSend)
            .await;

        #[cfg(feature = "defmt")]
        defmt::debug!("Background job {} done, ok: {}", job.id, result.is_ok());

        self.session
            .jobs
            .lock(|jobs| jobs.borrow_mut().record(job.id, result));
        JobHandle { id: job.id }
    }

    /// Process staged jobs forever.
    pub async fn run(self) {
        loop {
            self.step().await;
        }
    }
}
