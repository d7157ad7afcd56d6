//! Fans engine-produced [`OutboundEvent`]s out to per-session transport
//! queues. Ordering is FIFO per session; a session whose queue cannot
//! accept an event within the backpressure timeout is closed.

use std::collections::BTreeMap;
use std::time::Duration;

use ambonmud_domain::{DisconnectReason, OutboundEvent, PlayerState, SessionId};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::render;

/// A registered session's transport-facing outbound queue.
pub struct SessionQueue {
    pub sender: mpsc::Sender<OutboundEvent>,
}

#[derive(Default)]
pub struct OutboundRouter {
    sessions: BTreeMap<SessionId, SessionQueue>,
    backpressure_timeout: Duration,
}

impl OutboundRouter {
    pub fn new(backpressure_timeout: Duration) -> Self {
        Self {
            sessions: BTreeMap::new(),
            backpressure_timeout,
        }
    }

    /// Registers the per-session queue a transport created at connect time.
    pub fn register(&mut self, session_id: SessionId, sender: mpsc::Sender<OutboundEvent>) {
        self.sessions.insert(session_id, SessionQueue { sender });
    }

    pub fn unregister(&mut self, session_id: SessionId) {
        self.sessions.remove(&session_id);
    }

    /// Routes one event, rendering `SendPrompt` against `vitals_source` if
    /// given. `SessionRedirect` is consumed locally and never forwarded.
    /// Returns the session id to disconnect with `"backpressure"`, if any.
    pub async fn route(&mut self, event: OutboundEvent, vitals_source: Option<&PlayerState>) -> Option<SessionId> {
        if matches!(event, OutboundEvent::SessionRedirect { .. }) {
            return None;
        }

        let session_id = event.session_id();
        let event = match (&event, vitals_source) {
            (OutboundEvent::SendPrompt { .. }, Some(player)) => render::char_vitals(player),
            _ => event,
        };

        let Some(queue) = self.sessions.get(&session_id) else {
            return None;
        };

        match timeout(self.backpressure_timeout, queue.sender.send(event)).await {
            Ok(Ok(())) => None,
            Ok(Err(_closed)) | Err(_elapsed) => {
                self.unregister(session_id);
                Some(session_id)
            }
        }
    }

    pub fn is_registered(&self, session_id: SessionId) -> bool {
        self.sessions.contains_key(&session_id)
    }
}

pub fn close_reason_for_backpressure() -> DisconnectReason {
    DisconnectReason::Backpressure
}

/// Drains the engine's global outbound channel and routes each event to its
/// session's transport queue. The engine never calls [`OutboundRouter::route`]
/// directly — every `SendPrompt` it emits already carries resolved vitals
/// (see `GameEngine::run_periodic`), so no vitals lookup is needed here.
pub async fn run_dispatch_loop(mut outbound_rx: mpsc::Receiver<OutboundEvent>, router: std::sync::Arc<tokio::sync::Mutex<OutboundRouter>>) {
    while let Some(event) = outbound_rx.recv().await {
        router.lock().await.route(event, None).await;
    }
}
