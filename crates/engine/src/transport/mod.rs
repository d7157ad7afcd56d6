//! Telnet and WebSocket transports: thin framing layers that turn raw
//! bytes into [`InboundEvent`]s and an [`OutboundRouter`]-delivered queue of
//! [`OutboundEvent`]s back into bytes. Neither transport touches a
//! registry directly; they only ever see the wire-independent event types.

pub mod telnet_transport;
pub mod websocket;

use std::sync::{Arc, Mutex};

use ambonmud_domain::SessionId;
use ambonmud_shared::Clock;

use crate::outbound_router::OutboundRouter;

/// Mints session ids for every listening transport off one shared
/// generator, so telnet and WebSocket connections never collide.
pub struct SessionIds {
    generator: Mutex<ambonmud_domain::SessionIdGenerator>,
    clock: Arc<dyn Clock>,
}

impl SessionIds {
    pub fn new(gateway_id: u16, clock: Arc<dyn Clock>) -> Self {
        Self {
            generator: Mutex::new(ambonmud_domain::SessionIdGenerator::new(gateway_id)),
            clock,
        }
    }

    pub fn next(&self) -> SessionId {
        let now_unix_secs = (self.clock.now_ms() / 1000).max(0) as u32;
        self.generator.lock().expect("session id generator mutex poisoned").next(now_unix_secs)
    }
}

/// The router every transport registers its per-session outbound queue
/// with. Shared because multiple transport listeners run concurrently.
pub type SharedRouter = Arc<tokio::sync::Mutex<OutboundRouter>>;
