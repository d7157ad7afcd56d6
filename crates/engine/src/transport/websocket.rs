//! WebSocket transport. One axum route upgrades into a per-connection
//! socket split into a sender/receiver pair; inbound JSON frames become
//! [`InboundEvent`]s, outbound queue items are serialized back as JSON.

use std::sync::Arc;
use std::time::Duration;

use ambonmud_domain::{DisconnectReason, InboundEvent, OutboundEvent, SessionId, TransportKind};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::bus::{send_with_backpressure_retry, InboundSender};

use super::{SessionIds, SharedRouter};

/// Messages a connected client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    Line { text: String },
    Gmcp { package: String, payload: String },
}

/// Messages pushed down to a connected client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    Text { text: String },
    Info { text: String },
    Prompt,
    Gmcp { package: String, payload: String },
    Close { reason: String },
}

fn to_server_message(event: OutboundEvent, max_close_reason_length: usize) -> Option<ServerMessage> {
    match event {
        OutboundEvent::SendText { text, .. } => Some(ServerMessage::Text { text }),
        OutboundEvent::SendInfo { text, .. } => Some(ServerMessage::Info { text }),
        OutboundEvent::SendPrompt { .. } => Some(ServerMessage::Prompt),
        OutboundEvent::SendGmcp { package, payload, .. } => Some(ServerMessage::Gmcp { package, payload }),
        OutboundEvent::Close { reason, .. } => {
            let mut reason = format!("{reason:?}");
            reason.truncate(max_close_reason_length);
            Some(ServerMessage::Close { reason })
        }
        OutboundEvent::SessionRedirect { .. } => None,
    }
}

/// Shared application state the `/ws` route needs: where to mint session
/// ids, where to register outbound queues, and the inbound bus sender.
#[derive(Clone)]
pub struct WsState {
    pub inbound_tx: InboundSender,
    pub router: SharedRouter,
    pub session_ids: Arc<SessionIds>,
    pub outbound_queue_capacity: usize,
    pub max_close_reason_length: usize,
    pub stop_grace_period: Duration,
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WsState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: WsState) {
    let session_id = state.session_ids.next();
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<OutboundEvent>(state.outbound_queue_capacity);
    state.router.lock().await.register(session_id, out_tx);

    let connected = InboundEvent::Connected { session_id, transport: TransportKind::WebSocket, ansi_enabled: true };
    if send_with_backpressure_retry(&state.inbound_tx, connected, 3, Duration::from_millis(200)).await.is_err() {
        state.router.lock().await.unregister(session_id);
        return;
    }

    let max_close_reason_length = state.max_close_reason_length;
    let send_task = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let should_close = matches!(event, OutboundEvent::Close { .. });
            let Some(message) = to_server_message(event, max_close_reason_length) else { continue };
            let Ok(json) = serde_json::to_string(&message) else { continue };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
            if should_close {
                let _ = ws_sender.close().await;
                break;
            }
        }
    });

    let disconnect_reason = receive_loop(&mut ws_receiver, session_id, &state.inbound_tx).await;

    state.router.lock().await.unregister(session_id);
    if tokio::time::timeout(state.stop_grace_period, &mut send_task).await.is_err() {
        send_task.abort();
    }
    let _ = send_with_backpressure_retry(
        &state.inbound_tx,
        InboundEvent::Disconnected { session_id, reason: disconnect_reason },
        3,
        Duration::from_millis(200),
    )
    .await;
}

async fn receive_loop(
    ws_receiver: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
    session_id: SessionId,
    inbound_tx: &InboundSender,
) -> DisconnectReason {
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let event = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Line { text }) => InboundEvent::LineReceived { session_id, text },
                    Ok(ClientMessage::Gmcp { package, payload }) => {
                        InboundEvent::GmcpReceived { session_id, package, payload }
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, "malformed websocket frame");
                        continue;
                    }
                };
                if send_with_backpressure_retry(inbound_tx, event, 3, Duration::from_millis(200)).await.is_err() {
                    return DisconnectReason::Backpressure;
                }
            }
            Ok(Message::Close(_)) => return DisconnectReason::Eof,
            Ok(_) => {}
            Err(_) => return DisconnectReason::Io,
        }
    }
    DisconnectReason::Eof
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_close_maps_to_tagged_server_message() {
        let message = to_server_message(
            OutboundEvent::Close { session_id: SessionId(1), reason: DisconnectReason::Timeout },
            120,
        )
        .unwrap();
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"type\":\"Close\""));
        assert!(json.contains("Timeout"));
    }

    #[test]
    fn close_reason_is_truncated_to_the_configured_length() {
        let message =
            to_server_message(OutboundEvent::Close { session_id: SessionId(1), reason: DisconnectReason::Timeout }, 3)
                .unwrap();
        match message {
            ServerMessage::Close { reason } => assert_eq!(reason.len(), 3),
            other => panic!("expected Close, got {other:?}"),
        }
    }

    #[test]
    fn session_redirect_never_reaches_the_client() {
        assert!(to_server_message(
            OutboundEvent::SessionRedirect { session_id: SessionId(1), engine_id: "engine-2".into() },
            120,
        )
        .is_none());
    }

    #[test]
    fn client_line_message_deserializes() {
        let parsed: ClientMessage = serde_json::from_str(r#"{"type":"Line","text":"look"}"#).unwrap();
        assert!(matches!(parsed, ClientMessage::Line { text } if text == "look"));
    }
}
