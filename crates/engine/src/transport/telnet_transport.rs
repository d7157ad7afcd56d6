//! Raw-TCP telnet transport. One task per connection reads bytes through a
//! [`TelnetDecoder`] and pushes [`InboundEvent`]s onto the shared inbound
//! bus; a second task drains the session's outbound queue and encodes
//! [`OutboundEvent`]s back onto the wire.

use std::sync::Arc;
use std::time::Duration;

use ambonmud_domain::{DisconnectReason, InboundEvent, OutboundEvent, TransportKind};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::bus::{send_with_backpressure_retry, InboundSender};
use crate::telnet::{TelnetDecoder, TelnetEvent, TelnetLimits, IAC, SB, SE};

use super::{SessionIds, SharedRouter};

const GMCP_OPTION: u8 = crate::telnet::OPTION_GMCP;

/// Accepts connections on `listener` until the process shuts down. Each
/// accepted socket gets its own read/write task pair.
pub async fn serve(
    listener: TcpListener,
    inbound_tx: InboundSender,
    router: SharedRouter,
    session_ids: Arc<SessionIds>,
    limits: TelnetLimits,
    outbound_queue_capacity: usize,
    read_buffer_bytes: usize,
    prompt_text: Arc<str>,
) {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                tracing::warn!(error = %error, "telnet accept failed");
                continue;
            }
        };
        tracing::info!(%peer, "telnet connection accepted");
        let inbound_tx = inbound_tx.clone();
        let router = router.clone();
        let session_ids = session_ids.clone();
        let prompt_text = prompt_text.clone();
        tokio::spawn(async move {
            handle_connection(
                socket,
                inbound_tx,
                router,
                session_ids,
                limits,
                outbound_queue_capacity,
                read_buffer_bytes,
                prompt_text,
            )
            .await;
        });
    }
}

async fn handle_connection(
    socket: TcpStream,
    inbound_tx: InboundSender,
    router: SharedRouter,
    session_ids: Arc<SessionIds>,
    limits: TelnetLimits,
    outbound_queue_capacity: usize,
    read_buffer_bytes: usize,
    prompt_text: Arc<str>,
) {
    let session_id = session_ids.next();
    let (mut read_half, mut write_half) = socket.into_split();
    if write_half.write_all(&[IAC, crate::telnet::WILL, GMCP_OPTION]).await.is_err() {
        return;
    }
    let (out_tx, mut out_rx) = mpsc::channel::<OutboundEvent>(outbound_queue_capacity);
    router.lock().await.register(session_id, out_tx);

    let connected = InboundEvent::Connected { session_id, transport: TransportKind::Telnet, ansi_enabled: false };
    if send_with_backpressure_retry(&inbound_tx, connected, 3, Duration::from_millis(200)).await.is_err() {
        router.lock().await.unregister(session_id);
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let (bytes, should_close) = encode_outbound(&event, &prompt_text);
            if !bytes.is_empty() && write_half.write_all(&bytes).await.is_err() {
                break;
            }
            if should_close {
                let _ = write_half.shutdown().await;
                break;
            }
        }
    });

    let disconnect_reason = read_loop(&mut read_half, session_id, &inbound_tx, limits, read_buffer_bytes).await;
    writer.abort();
    router.lock().await.unregister(session_id);
    let _ = send_with_backpressure_retry(
        &inbound_tx,
        InboundEvent::Disconnected { session_id, reason: disconnect_reason },
        3,
        Duration::from_millis(200),
    )
    .await;
}

async fn read_loop(
    read_half: &mut (impl AsyncReadExt + Unpin),
    session_id: ambonmud_domain::SessionId,
    inbound_tx: &InboundSender,
    limits: TelnetLimits,
    read_buffer_bytes: usize,
) -> DisconnectReason {
    let mut decoder = TelnetDecoder::new(limits);
    let mut buf = vec![0u8; read_buffer_bytes.max(1)];
    loop {
        let read = match read_half.read(&mut buf).await {
            Ok(0) => return DisconnectReason::Eof,
            Ok(n) => n,
            Err(_) => return DisconnectReason::Io,
        };
        for &byte in &buf[..read] {
            match decoder.feed_byte(byte) {
                Ok(Some(TelnetEvent::Line(text))) => {
                    let event = InboundEvent::LineReceived { session_id, text };
                    if send_with_backpressure_retry(inbound_tx, event, 3, Duration::from_millis(200)).await.is_err() {
                        return DisconnectReason::Backpressure;
                    }
                }
                Ok(Some(TelnetEvent::Subnegotiation { option, payload })) if option == GMCP_OPTION => {
                    if let Some((package, json)) = split_gmcp_payload(&payload) {
                        let event = InboundEvent::GmcpReceived { session_id, package, payload: json };
                        if send_with_backpressure_retry(inbound_tx, event, 3, Duration::from_millis(200)).await.is_err() {
                            return DisconnectReason::Backpressure;
                        }
                    }
                }
                Ok(Some(_)) | Ok(None) => {}
                Err(_violation) => return DisconnectReason::ProtocolViolation,
            }
        }
    }
}

/// GMCP payloads are `"Package.Sub {json}"`; the space separates the
/// dotted package name from the JSON body (the JSON body itself may be
/// empty for argument-less messages).
fn split_gmcp_payload(payload: &[u8]) -> Option<(String, String)> {
    let text = String::from_utf8_lossy(payload);
    match text.find(' ') {
        Some(idx) => Some((text[..idx].to_string(), text[idx + 1..].to_string())),
        None => Some((text.to_string(), String::new())),
    }
}

fn escape_iac(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    for &b in bytes {
        out.push(b);
        if b == IAC {
            out.push(IAC);
        }
    }
    out
}

/// Renders one outbound event into telnet wire bytes, and whether the
/// connection should be closed after this write.
fn encode_outbound(event: &OutboundEvent, prompt_text: &str) -> (Vec<u8>, bool) {
    match event {
        OutboundEvent::SendText { text, .. } | OutboundEvent::SendInfo { text, .. } => {
            let mut bytes = text.as_bytes().to_vec();
            bytes.extend_from_slice(b"\r\n");
            (bytes, false)
        }
        OutboundEvent::SendPrompt { .. } => (prompt_text.as_bytes().to_vec(), false),
        OutboundEvent::SendGmcp { package, payload, .. } => {
            let mut body = format!("{package} {payload}").into_bytes();
            body = escape_iac(&body);
            let mut bytes = vec![IAC, SB, GMCP_OPTION];
            bytes.append(&mut body);
            bytes.extend_from_slice(&[IAC, SE]);
            (bytes, false)
        }
        OutboundEvent::Close { .. } => (b"\r\nConnection closed.\r\n".to_vec(), true),
        OutboundEvent::SessionRedirect { .. } => (Vec::new(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gmcp_payload_splits_package_from_json() {
        let (package, json) = split_gmcp_payload(b"Char.Vitals {\"hp\":10}").unwrap();
        assert_eq!(package, "Char.Vitals");
        assert_eq!(json, "{\"hp\":10}");
    }

    #[test]
    fn send_text_encodes_with_crlf() {
        let (bytes, close) = encode_outbound(
            &OutboundEvent::SendText { session_id: ambonmud_domain::SessionId(1), text: "hello".to_string() },
            "> ",
        );
        assert_eq!(bytes, b"hello\r\n");
        assert!(!close);
    }

    #[test]
    fn gmcp_encodes_with_iac_escaping() {
        let (bytes, _) = encode_outbound(
            &OutboundEvent::SendGmcp {
                session_id: ambonmud_domain::SessionId(1),
                package: "Char.Vitals".to_string(),
                payload: "{}".to_string(),
            },
            "> ",
        );
        assert_eq!(bytes[0], IAC);
        assert_eq!(bytes[1], SB);
        assert_eq!(&bytes[bytes.len() - 2..], &[IAC, SE]);
    }

    #[test]
    fn prompt_uses_the_configured_prompt_text() {
        let (bytes, close) =
            encode_outbound(&OutboundEvent::SendPrompt { session_id: ambonmud_domain::SessionId(1) }, "HP:10> ");
        assert_eq!(bytes, b"HP:10> ");
        assert!(!close);
    }
}
