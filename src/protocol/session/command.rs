//! Typed command surface of a session: one verb per host command.
use core::fmt::Debug;

use embassy_time::Duration;

use crate::core::ReceivedPacket;
use crate::error::LinkError;
use crate::protocol::transport::traits::device::SampleWriter;
use crate::protocol::transport::traits::link_timer::LinkTimer;

use super::config::LinkConfig;
use super::guard::{JobHandle, JobStatus, SendMode, SendOutcome};
use super::Session;

/// Host command.
#[derive(Debug, Clone, Copy)]
pub enum Command<'a> {
    Init(LinkConfig),
    Send {
        payload: &'a [u8],
        /// Copy the payload and transmit from the background worker.
        background: bool,
        /// Foreground only: wait for a busy window instead of dropping the frame.
        must_send: bool,
    },
    Receive {
        max_wait: Duration,
    },
    JobStatus(JobHandle),
    End,
    Reset {
        device_id: u32,
    },
}

/// Reply to a `send` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendReply {
    /// Frame transmitted, `samples` per line.
    Sent { samples: usize },
    /// Best-effort frame dropped on a busy window.
    Dropped,
    /// Payload staged for the background worker.
    Queued(JobHandle),
}

impl From<SendOutcome> for SendReply {
    fn from(outcome: SendOutcome) -> Self {
        match outcome {
            SendOutcome::Sent { samples } => Self::Sent { samples },
            SendOutcome::Dropped => Self::Dropped,
        }
    }
}

/// Reply to a [`Command`].
#[derive(Debug)]
pub enum Response<E: Debug> {
    Ready,
    Sent(SendReply),
    /// `None` when no packet arrived in time.
    Packet(Option<ReceivedPacket>),
    Job(JobStatus<E>),
    Closed,
    Reset,
}

impl<W, T, const N: usize> Session<W, T, N>
where
    W: SampleWriter,
    W::Error: Debug,
    T: LinkTimer,
{
    /// Send `payload` in the foreground or stage it for the background worker.
    ///
    /// Background sends always wait for the window once they run; `must_send`
    /// only applies to foreground sends.
    pub async fn send(
        &self,
        payload: &[u8],
        background: bool,
        must_send: bool,
    ) -> Result<SendReply, LinkError<W::Error>> {
        if background {
            return self.stage(payload).await.map(SendReply::Queued);
        }

        let mode = if must_send {
            SendMode::MustSend
        } else {
            SendMode::BestEffort
        };
        self.submit(payload, mode).await.map(SendReply::from)
    }

    /// Run one command.
    pub async fn dispatch(
        &self,
        command: Command<'_>,
    ) -> Result<Response<W::Error>, LinkError<W::Error>> {
        match command {
            Command::Init(config) => self.init(config).await.map(|()| Response::Ready),
            Command::Send {
                payload,
                background,
                must_send,
            } => self
                .send(payload, background, must_send)
                .await
                .map(Response::Sent),
            Command::Receive { max_wait } => self.receive(max_wait).await.map(Response::Packet),
            Command::JobStatus(handle) => Ok(Response::Job(self.job_status(handle))),
            Command::End => self.end().await.map(|()| Response::Closed),
            Command::Reset { device_id } => self.reset(device_id).await.map(|()| Response::Reset),
        }
    }
}
