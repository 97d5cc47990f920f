//! WebSocket connection lifecycle (spec §4.2 / C2, server half) and the
//! dispatch of inbound frames to the Registration state machine (§4.7) and
//! Request Multiplexer (§4.5).

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};
use tunnel_protocol::Frame;

use crate::mux;
use crate::registration::handle_register;
use crate::session::Session;
use crate::state::{generate_session_id, AppState};

/// `GET /ws` — upgrades to the control-channel WebSocket for one session.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

/// Owns one session's full lifecycle: registers it, drains inbound frames
/// into [`handle_frame`], and tears everything down on close or decode
/// failure (spec §3 invariant 4, §7's "frame decode failure" row).
async fn handle_connection(socket: WebSocket, state: AppState) {
    let session_id = generate_session_id();
    info!(session_id = %session_id, "session connected");

    let (ws_sink, mut ws_stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
    let session = Session::new(session_id.clone(), tx);
    state.sessions.insert(session_id.clone(), session.clone());

    // Outbound task: serializes and sends every queued frame in order,
    // so concurrent senders never interleave mid-frame (spec §4.2).
    let ws_sink = Arc::new(Mutex::new(ws_sink));
    let ws_sink_clone = ws_sink.clone();
    let outbound_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match tunnel_protocol::encode(&frame) {
                Ok(text) => text,
                Err(e) => {
                    error!(error = %e, "failed to encode outbound frame");
                    continue;
                }
            };
            let mut sink = ws_sink_clone.lock().await;
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Inbound loop: only text frames containing a valid Frame are handled.
    while let Some(Ok(msg)) = ws_stream.next().await {
        match msg {
            Message::Text(text) => match tunnel_protocol::decode(&text) {
                Ok(frame) => handle_frame(&state, &session, frame).await,
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "frame decode failure, closing session");
                    break;
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    info!(session_id = %session_id, "session disconnecting");
    outbound_task.abort();
    session.close().await;
    state.forget_session(&session).await;
}

/// Central dispatch for one inbound frame. Unknown/out-of-place variants
/// are ignored per spec §7's "unknown frame type" row.
async fn handle_frame(state: &AppState, session: &Arc<Session>, frame: Frame) {
    match frame {
        Frame::Register {
            local_port,
            public_port,
            protocol,
        } => match handle_register(state, session, local_port, public_port, protocol).await {
            Ok(registered) => {
                session.send(registered);
            }
            Err(e) => {
                session.send(Frame::Error {
                    message: e.to_string(),
                });
            }
        },

        Frame::HttpResponse {
            request_id,
            status,
            headers,
            body,
            error,
        } => {
            mux::deliver_http_response(session, &request_id, status, headers, body, error);
        }

        Frame::TcpResponse {
            request_id: _,
            socket_id,
            data,
        } => {
            mux::deliver_tcp_response(session, &socket_id, data);
        }

        Frame::TcpClose { socket_id } => {
            mux::deliver_tcp_close(session, &socket_id);
        }

        other => {
            debug!(session_id = %session.id, frame = ?other, "ignoring frame not expected from a client");
        }
    }
}
