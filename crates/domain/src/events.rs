//! The inbound and outbound event buses' wire-independent payload types.

use serde::{Deserialize, Serialize};

use crate::ids::SessionId;

/// How a session reached the engine; carried only for logging/metrics, the
/// engine treats every transport identically past `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    Telnet,
    WebSocket,
}

/// Why a session disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisconnectReason {
    Eof,
    Io,
    Backpressure,
    Timeout,
    ProtocolViolation,
    ServerClosed,
}

/// An event produced by a transport and consumed by the engine worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InboundEvent {
    Connected {
        session_id: SessionId,
        transport: TransportKind,
        ansi_enabled: bool,
    },
    Disconnected {
        session_id: SessionId,
        reason: DisconnectReason,
    },
    LineReceived {
        session_id: SessionId,
        text: String,
    },
    GmcpReceived {
        session_id: SessionId,
        package: String,
        payload: String,
    },
}

impl InboundEvent {
    pub fn session_id(&self) -> SessionId {
        match self {
            InboundEvent::Connected { session_id, .. }
            | InboundEvent::Disconnected { session_id, .. }
            | InboundEvent::LineReceived { session_id, .. }
            | InboundEvent::GmcpReceived { session_id, .. } => *session_id,
        }
    }
}

/// An event produced by the engine worker and consumed by the outbound
/// router, which fans it out to the target session's transport queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutboundEvent {
    SendText { session_id: SessionId, text: String },
    SendInfo { session_id: SessionId, text: String },
    SendPrompt { session_id: SessionId },
    SendGmcp { session_id: SessionId, package: String, payload: String },
    Close { session_id: SessionId, reason: DisconnectReason },
    /// Consumed locally by the router/gateway; never forwarded to a
    /// transport.
    SessionRedirect { session_id: SessionId, engine_id: String },
}

impl OutboundEvent {
    pub fn session_id(&self) -> SessionId {
        match self {
            OutboundEvent::SendText { session_id, .. }
            | OutboundEvent::SendInfo { session_id, .. }
            | OutboundEvent::SendPrompt { session_id }
            | OutboundEvent::SendGmcp { session_id, .. }
            | OutboundEvent::Close { session_id, .. }
            | OutboundEvent::SessionRedirect { session_id, .. } => *session_id,
        }
    }
}
