//! Public Listener Manager (spec §4.4 / C4).
//!
//! Only one listener kind is active per tunnel. Both are bound
//! synchronously during registration so a bind failure can be reported
//! before `Registered` is ever sent (spec §4.7).

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tunnel_protocol::{Frame, Headers};

use crate::error::TunnelError;
use crate::mux::dispatch_http;
use crate::session::Session;
use crate::state::{generate_request_id, AppState};

#[derive(Clone)]
struct HttpListenerCtx {
    session: Arc<Session>,
    deadline: std::time::Duration,
    capacity: usize,
}

/// Binds `public_port` and serves every inbound HTTP request through the
/// Request Multiplexer (spec §4.4 item "HTTP listener").
pub async fn spawn_http_listener(
    state: AppState,
    session: Arc<Session>,
    public_port: u16,
) -> Result<JoinHandle<()>, TunnelError> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", public_port))
        .await
        .map_err(|e| TunnelError::BindFailed(public_port, e))?;

    let ctx = HttpListenerCtx {
        session,
        deadline: state.config.pending_timeout(),
        capacity: state.config.pending_capacity,
    };
    let app = Router::new()
        .fallback(handle_public_request)
        .with_state(ctx);

    info!(public_port, "HTTP listener bound");
    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(public_port, error = %e, "public HTTP listener exited");
        }
    }))
}

async fn handle_public_request(
    State(ctx): State<HttpListenerCtx>,
    request: axum::extract::Request,
) -> impl IntoResponse {
    let (parts, body) = request.into_parts();

    let method = parts.method.to_string();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let mut headers = Headers::new();
    for (name, value) in parts.headers.iter() {
        headers.push(name.as_str(), value.to_str().unwrap_or_default());
    }

    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) if bytes.is_empty() => None,
        Ok(bytes) => Some(bytes.to_vec()),
        Err(_) => Some(Vec::new()),
    };

    let outcome = dispatch_http(
        &ctx.session,
        method,
        path_and_query,
        headers,
        body,
        ctx.deadline,
        ctx.capacity,
    )
    .await;

    let mut builder = Response::builder().status(
        StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::BAD_GATEWAY),
    );
    for (name, value) in outcome.headers.iter() {
        builder = builder.header(name, value);
    }
    builder
        .body(Body::from(outcome.body.unwrap_or_default()))
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::empty())
                .expect("static response is always valid")
        })
}

/// Binds `public_port` and relays every accepted TCP connection's bytes
/// through `TcpData`/`TcpResponse` frames keyed by `socket_id` (spec §4.4
/// item "TCP listener").
pub async fn spawn_tcp_listener(
    session: Arc<Session>,
    public_port: u16,
) -> Result<JoinHandle<()>, TunnelError> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", public_port))
        .await
        .map_err(|e| TunnelError::BindFailed(public_port, e))?;

    info!(public_port, "TCP listener bound");
    Ok(tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let session = session.clone();
                    tokio::spawn(relay_public_tcp_connection(session, stream, peer.to_string()));
                }
                Err(e) => {
                    error!(public_port, error = %e, "TCP accept failed");
                    break;
                }
            }
        }
    }))
}

async fn relay_public_tcp_connection(session: Arc<Session>, stream: TcpStream, socket_id: String) {
    let (mut read_half, mut write_half) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    session.sockets.insert(socket_id.clone(), tx);

    let write_task = tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if write_half.write_all(&data).await.is_err() {
                break;
            }
        }
    });

    let mut buf = vec![0u8; 8192];
    loop {
        match read_half.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let frame = Frame::TcpData {
                    request_id: generate_request_id(),
                    socket_id: socket_id.clone(),
                    data: buf[..n].to_vec(),
                };
                if !session.send(frame) {
                    break;
                }
            }
            Err(_) => break,
        }
    }

    session.sockets.remove(&socket_id);
    session.send(Frame::TcpClose {
        socket_id: socket_id.clone(),
    });
    write_task.abort();
}
