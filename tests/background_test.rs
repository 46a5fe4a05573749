//! Background sends: staging, worker, job outcomes.
mod helpers;

use daq_bitbang::{
    core::MAX_SEND,
    error::LinkError,
    protocol::session::{
        command::SendReply,
        config::LinkConfig,
        guard::{JobStatus, SendOutcome},
        Session,
    },
};
use helpers::{MockError, MockTimer, MockWriter};

#[tokio::test]
/// A staged payload is pending until the worker runs, then reported once.
async fn test_background_job_lifecycle() {
    let writer = MockWriter::new();
    let log = writer.log.clone();
    let session: Session<_, _> = Session::new(writer, MockTimer::new());
    session.init(LinkConfig::new(1, 0, 0, 1)).await.unwrap();

    let reply = session.send(&[0x41], true, false).await.unwrap();
    let SendReply::Queued(handle) = reply else {
        panic!("expected a queued reply, got {reply:?}");
    };
    assert!(matches!(session.job_status(handle), JobStatus::Pending));
    assert!(log.lock().unwrap().chunks.is_empty());

    let done = session.worker().step().await;
    assert_eq!(done, handle);
    assert!(matches!(
        session.job_status(handle),
        JobStatus::Finished(SendOutcome::Sent { samples: 51 })
    ));
    assert!(matches!(session.job_status(handle), JobStatus::Expired));
    assert_eq!(log.lock().unwrap().chunks.len(), 1);
}

#[tokio::test]
/// The caller's buffer can be reused right after staging.
async fn test_background_copies_payload() {
    let writer = MockWriter::new();
    let log = writer.log.clone();
    let session: Session<_, _> = Session::new(writer, MockTimer::new());
    session.init(LinkConfig::new(1, 0, 0, 1)).await.unwrap();

    let mut payload = [0xFF];
    session.stage(&payload).await.unwrap();
    payload[0] = 0x00;
    session.worker().step().await;

    let log = log.lock().unwrap();
    assert!(log.chunks[0][20..44].iter().any(|s| s.data));
}

#[tokio::test]
/// Oversized background payloads are refused before anything is staged.
async fn test_background_capacity() {
    let writer = MockWriter::new();
    let log = writer.log.clone();
    let session: Session<_, _> = Session::new(writer, MockTimer::new());
    session.init(LinkConfig::new(1, 0, 0, 1)).await.unwrap();

    let payload = vec![0u8; MAX_SEND + 1];
    let result = session.send(&payload, true, true).await;
    assert!(matches!(
        result,
        Err(LinkError::CapacityExceeded {
            requested,
            capacity: MAX_SEND
        }) if requested == MAX_SEND + 1
    ));
    assert!(log.lock().unwrap().chunks.is_empty());
}

#[tokio::test]
/// A device failure during a background job is kept for the caller.
async fn test_background_failure_reported() {
    let writer = MockWriter::new();
    let log = writer.log.clone();
    let session: Session<_, _> = Session::new(writer, MockTimer::new());
    session.init(LinkConfig::new(1, 0, 0, 1)).await.unwrap();

    log.lock().unwrap().fail_next_write = true;
    let handle = session.stage(&[1, 2, 3]).await.unwrap();
    session.worker().step().await;

    assert!(matches!(
        session.job_status(handle),
        JobStatus::Failed(LinkError::Hardware(MockError::WriteFailed))
    ));
}

#[tokio::test]
/// Closing the session fails the jobs still waiting in the staging slot.
async fn test_end_cancels_staged_jobs() {
    let writer = MockWriter::new();
    let log = writer.log.clone();
    let session: Session<_, _> = Session::new(writer, MockTimer::new());
    session.init(LinkConfig::new(1, 0, 0, 1)).await.unwrap();

    let handle = session.stage(&[0x41]).await.unwrap();
    session.end().await.unwrap();

    assert!(matches!(
        session.job_status(handle),
        JobStatus::Failed(LinkError::NotInitialized)
    ));
    assert!(log.lock().unwrap().chunks.is_empty());
}

#[tokio::test]
/// Staging needs an open session.
async fn test_stage_before_init() {
    let session: Session<_, _> = Session::new(MockWriter::new(), MockTimer::new());
    assert!(matches!(
        session.stage(&[1]).await,
        Err(LinkError::NotInitialized)
    ));
}

#[tokio::test]
/// The worker drains jobs in staging order; only the last outcome is retained.
async fn test_worker_runs_in_order() {
    let writer = MockWriter::new();
    let log = writer.log.clone();
    let session: Session<_, _> = Session::new(writer, MockTimer::new());
    session.init(LinkConfig::new(1, 0, 0, 1)).await.unwrap();

    let worker = session.worker();
    let producer = async {
        let first = session.stage(&[0xFF]).await.unwrap();
        let second = session.stage(&[0x00, 0x00]).await.unwrap();
        (first, second)
    };
    let consumer = async {
        worker.step().await;
        worker.step().await
    };
    let ((first, second), last) = tokio::join!(producer, consumer);

    assert_eq!(last, second);
    assert!(first.id() < second.id());
    assert!(matches!(session.job_status(first), JobStatus::Expired));
    assert!(matches!(
        session.job_status(second),
        JobStatus::Finished(SendOutcome::Sent { samples: 78 })
    ));

    let log = log.lock().unwrap();
    assert_eq!(log.chunks.len(), 2);
    assert!(log.chunks[0][20..44].iter().any(|s| s.data));
    assert!(log.chunks[1][20..44].iter().all(|s| !s.data));
}
