//! Inbound and outbound event buses. Both are bounded MPSC channels:
//! transports produce `InboundEvent`s and the engine is the sole consumer;
//! the engine (and its subsystems) produce `OutboundEvent`s and the
//! outbound router is the sole consumer. No subsystem ever awaits a send
//! while holding a registry borrow.

use ambonmud_domain::{InboundEvent, OutboundEvent};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

pub type InboundSender = mpsc::Sender<InboundEvent>;
pub type InboundReceiver = mpsc::Receiver<InboundEvent>;
pub type OutboundSender = mpsc::Sender<OutboundEvent>;
pub type OutboundReceiver = mpsc::Receiver<OutboundEvent>;

pub fn inbound_bus(capacity: usize) -> (InboundSender, InboundReceiver) {
    mpsc::channel(capacity)
}

pub fn outbound_bus(capacity: usize) -> (OutboundSender, OutboundReceiver) {
    mpsc::channel(capacity)
}

/// Send with a short retry budget before the caller gives up and treats the
/// session as backpressured, per the inbound bus's backpressure contract.
/// Returns the event back to the caller if every attempt failed, so the
/// transport can decide how to close the session.
pub async fn send_with_backpressure_retry(
    sender: &InboundSender,
    event: InboundEvent,
    max_attempts: u32,
    attempt_timeout: Duration,
) -> Result<(), InboundEvent> {
    for attempt in 0..max_attempts {
        let to_send = event.clone();
        match timeout(attempt_timeout, sender.send(to_send)).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(_closed)) => return Err(event),
            Err(_elapsed) if attempt + 1 == max_attempts => return Err(event),
            Err(_elapsed) => continue,
        }
    }
    Err(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inbound_bus_delivers_in_order() {
        let (tx, mut rx) = inbound_bus(4);
        tx.send(InboundEvent::LineReceived {
            session_id: ambonmud_domain::SessionId(1),
            text: "look".into(),
        })
        .await
        .unwrap();
        tx.send(InboundEvent::LineReceived {
            session_id: ambonmud_domain::SessionId(1),
            text: "north".into(),
        })
        .await
        .unwrap();
        drop(tx);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        match (first, second) {
            (
                InboundEvent::LineReceived { text: a, .. },
                InboundEvent::LineReceived { text: b, .. },
            ) => {
                assert_eq!(a, "look");
                assert_eq!(b, "north");
            }
            _ => panic!("unexpected event shape"),
        }
        assert!(rx.recv().await.is_none());
    }
}
