//! Transmission guard under contention: must-send waits, best-effort drops.
mod helpers;

use std::sync::Arc;

use daq_bitbang::protocol::session::{
    config::LinkConfig,
    guard::{SendMode, SendOutcome},
    Session,
};
use helpers::{MockTimer, MockWriter, WriteGate};

#[tokio::test]
/// Two best-effort frames racing for the window: exactly one goes out.
async fn test_best_effort_contention() {
    let gate = Arc::new(WriteGate::default());
    let writer = MockWriter::new().with_gate(gate.clone());
    let log = writer.log.clone();
    let session: Session<_, _> = Session::new(writer, MockTimer::new());
    session.init(LinkConfig::new(1, 0, 0, 1)).await.unwrap();

    let first = session.submit(&[0x01], SendMode::BestEffort);
    let second = async {
        // Wait until the first frame holds the window inside the device write.
        gate.entered.notified().await;
        let outcome = session.submit(&[0x02], SendMode::BestEffort).await;
        gate.release.notify_one();
        outcome
    };

    let (first, second) = tokio::join!(first, second);
    let mut outcomes = [first.unwrap(), second.unwrap()];
    outcomes.sort_by_key(|outcome| matches!(outcome, SendOutcome::Dropped));

    assert_eq!(outcomes[0], SendOutcome::Sent { samples: 51 });
    assert_eq!(outcomes[1], SendOutcome::Dropped);
    assert_eq!(log.lock().unwrap().chunks.len(), 1);
}

#[tokio::test]
/// A must-send frame waits for the frame in progress and goes out after it.
async fn test_must_send_waits() {
    let gate = Arc::new(WriteGate::default());
    let writer = MockWriter::new().with_gate(gate.clone());
    let log = writer.log.clone();
    let session: Session<_, _> = Session::new(writer, MockTimer::new());
    session.init(LinkConfig::new(1, 0, 0, 1)).await.unwrap();

    let first = session.submit(&[0xFF], SendMode::MustSend);
    let second = async {
        gate.entered.notified().await;
        let pending = session.submit(&[0x00, 0x00], SendMode::MustSend);
        let release = async {
            tokio::task::yield_now().await;
            // First frame, then the second one.
            gate.release.notify_one();
            gate.entered.notified().await;
            gate.release.notify_one();
        };
        let (outcome, ()) = tokio::join!(pending, release);
        outcome
    };

    let (first, second) = tokio::join!(first, second);
    assert_eq!(first.unwrap(), SendOutcome::Sent { samples: 51 });
    assert_eq!(second.unwrap(), SendOutcome::Sent { samples: 78 });

    let log = log.lock().unwrap();
    assert_eq!(log.chunks.len(), 2);
    // Frames do not interleave: the first chunk carries the 0xFF frame.
    assert!(log.chunks[0][20..44].iter().any(|s| s.data));
}

#[tokio::test]
/// `end` waits for the frame in progress before stopping the device.
async fn test_end_waits_for_transmission() {
    let gate = Arc::new(WriteGate::default());
    let writer = MockWriter::new().with_gate(gate.clone());
    let log = writer.log.clone();
    let session: Session<_, _> = Session::new(writer, MockTimer::new());
    session.init(LinkConfig::new(1, 0, 0, 1)).await.unwrap();

    let send = session.submit(&[0x41], SendMode::MustSend);
    let close = async {
        gate.entered.notified().await;
        let end = session.end();
        let release = async {
            tokio::task::yield_now().await;
            assert_eq!(log.lock().unwrap().stops, 0);
            gate.release.notify_one();
        };
        let (result, ()) = tokio::join!(end, release);
        result
    };

    let (sent, closed) = tokio::join!(send, close);
    assert_eq!(sent.unwrap(), SendOutcome::Sent { samples: 51 });
    closed.unwrap();

    // One stop for the chunk, one for the teardown.
    assert_eq!(log.lock().unwrap().stops, 2);
    assert!(!session.is_open());
}
