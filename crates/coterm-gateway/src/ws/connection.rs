//! Per-connection WS task: decode → classify → dispatch.
//!
//! This is intentionally thin. All of the cross-cutting terminal protocol
//! rules (duplicate spawn, unknown session, permitted signals) live in
//! `coterm_terminal::protocol::handle` — this module's only job is turning
//! one WS socket into a `ClientConn` + inbound frame stream and wiring both
//! to that function.

use axum::{
    extract::{ws::Message, ws::WebSocket, State, WebSocketUpgrade},
    response::IntoResponse,
};
use coterm_core::config::{MAX_PAYLOAD_BYTES, OUTBOUND_QUEUE_CAPACITY};
use coterm_protocol::{
    frames::{InboundTerminalFrame, RawFrame},
    router::{classify, FrameClass},
};
use coterm_terminal::{ConnId, OutboundSink};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::ws::conn::ClientConn;

/// Axum handler — upgrades HTTP to WebSocket at GET /ws.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_connection(socket, state))
}

/// Per-connection task — lives for the entire WS session lifetime. There is
/// no authentication handshake here: auth is an explicit non-goal of this
/// core, left to whatever sits in front of the transport.
async fn handle_connection(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = ConnId::new();
    info!(conn_id = %conn_id, "new WS connection");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE_CAPACITY);

    let client_conn = Arc::new(ClientConn::new(conn_id.clone(), out_tx));
    let sink: Arc<dyn OutboundSink> = client_conn.clone();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > MAX_PAYLOAD_BYTES {
                            warn!(conn_id = %conn_id, size = text.len(), "payload too large, dropping");
                            continue;
                        }
                        handle_inbound_text(&text, &conn_id, &sink, &state).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if ws_tx.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(conn_id = %conn_id, error = %e, "WS read error");
                        break;
                    }
                    _ => {}
                }
            }

            outbound = out_rx.recv() => {
                match outbound {
                    Some(msg) => {
                        if ws_tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    client_conn.close();
    state.registry.remove_client(&conn_id).await;
    info!(conn_id = %conn_id, "WS connection closed");
}

/// Decode one inbound text frame, classify it, and dispatch. Anything that
/// doesn't decode, or doesn't classify as `terminal:*`, is logged and
/// dropped — it never tears down the connection.
async fn handle_inbound_text(text: &str, conn_id: &ConnId, conn: &Arc<dyn OutboundSink>, state: &Arc<AppState>) {
    let raw: RawFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            debug!(conn_id = %conn_id, error = %e, "malformed inbound frame, discarding");
            return;
        }
    };

    match classify(&raw.frame_type) {
        FrameClass::Terminal => match serde_json::from_str::<InboundTerminalFrame>(text) {
            Ok(frame) => coterm_terminal::protocol::handle(frame, conn_id, conn, &state.registry).await,
            Err(e) => debug!(conn_id = %conn_id, error = %e, "malformed terminal frame, discarding"),
        },
        class => {
            // Command execution, file-watch, and ping are external
            // collaborators — this core classifies and would route to them,
            // but implements none of their business logic itself.
            debug!(conn_id = %conn_id, frame_type = %raw.frame_type, ?class, "frame routed to a subsystem outside this core");
        }
    }
}
