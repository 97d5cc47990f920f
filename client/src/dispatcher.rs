//! Origin Dispatcher (spec §4.6 / C6): forwards frames arriving over the
//! control channel to the local service and turns the local service's
//! replies back into frames.
//!
//! HTTP requests are stateless: one `reqwest` call per `HttpRequest` frame.
//! TCP is not: spec §9's design notes flag that a fresh origin connection
//! per chunk would silently break any protocol with connection-scoped
//! state, so `socket_id` is treated as a key into a small connection-reuse
//! table (`SPEC_FULL.md` §4, resolved Open Question 2) instead.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use reqwest::Method;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tunnel_protocol::{Frame, Headers};

use crate::control::ControlChannel;

/// Handles one `HttpRequest` frame by replaying it against the local
/// service and returning the matching `HttpResponse` frame.
pub async fn dispatch_http(
    client: &reqwest::Client,
    local_port: u16,
    request_id: String,
    method: String,
    path_and_query: String,
    headers: Headers,
    body: Option<Vec<u8>>,
) -> Frame {
    let parsed_method = match Method::from_bytes(method.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            return Frame::HttpResponse {
                request_id,
                status: 0,
                headers: Headers::new(),
                body: None,
                error: Some(format!("unsupported HTTP method {method:?}")),
            }
        }
    };

    let url = format!("http://127.0.0.1:{local_port}{path_and_query}");
    let mut builder = client.request(parsed_method, &url);
    for (name, value) in headers.iter() {
        builder = builder.header(name, value);
    }
    if let Some(body) = body {
        builder = builder.body(body);
    }

    let response = match builder.send().await {
        Ok(r) => r,
        Err(e) => {
            return Frame::HttpResponse {
                request_id,
                status: 0,
                headers: Headers::new(),
                body: None,
                error: Some(format!("local service request failed: {e}")),
            }
        }
    };

    let status = response.status().as_u16();
    let mut out_headers = Headers::new();
    for (name, value) in response.headers().iter() {
        out_headers.push(name.as_str(), value.to_str().unwrap_or_default());
    }

    match response.bytes().await {
        Ok(bytes) => Frame::HttpResponse {
            request_id,
            status,
            headers: out_headers,
            body: if bytes.is_empty() {
                None
            } else {
                Some(bytes.to_vec())
            },
            error: None,
        },
        Err(e) => Frame::HttpResponse {
            request_id,
            status: 0,
            headers: Headers::new(),
            body: None,
            error: Some(format!("failed reading local service response: {e}")),
        },
    }
}

/// Per-socket origin connections, keyed by the `socket_id` the server
/// minted for the public TCP connection it is relaying.
///
/// Lookup/insert is synchronous (`std::sync::Mutex`, never held across an
/// `.await`) so [`dispatch`](Self::dispatch) can run inline in the control
/// channel's receive loop instead of being spawned per chunk. That is what
/// preserves spec §5's per-socket arrival order and the one-origin-
/// connection-per-`socket_id` contract (SPEC_FULL.md §4, Open Question 2):
/// the receive loop calls `dispatch` for each `TcpData` frame in the order
/// frames arrive, and the existence check plus the fallback insert happen
/// under one lock acquisition, so two frames for a brand-new `socket_id`
/// can never both decide to open a connection.
#[derive(Clone)]
pub struct TcpOriginRegistry {
    inner: Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Vec<u8>>>>>,
}

impl TcpOriginRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Handles one `TcpData` frame: reuses the origin connection already
    /// open for `socket_id`, or opens a fresh one and spawns its long-lived
    /// reader/writer loop. Call this synchronously from the frame receive
    /// loop, before any `tokio::spawn`, so per-socket ordering holds.
    pub fn dispatch(
        &self,
        control: ControlChannel,
        local_port: u16,
        socket_id: String,
        data: Vec<u8>,
    ) {
        let mut map = self.inner.lock().expect("origin registry lock poisoned");

        let data = match map.get(&socket_id) {
            Some(tx) => match tx.send(data) {
                Ok(()) => return,
                // Stale entry (writer half already gone); replace it below
                // while still holding the lock.
                Err(mpsc::error::SendError(data)) => {
                    map.remove(&socket_id);
                    data
                }
            },
            None => data,
        };

        let (tx, rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let _ = tx.send(data);
        map.insert(socket_id.clone(), tx);
        drop(map);

        let registry = self.clone();
        tokio::spawn(async move {
            run_origin_connection(registry, control, local_port, socket_id, rx).await;
        });
    }

    /// Handles a `TcpClose` frame from the server: the public side closed,
    /// so there is nothing left to write to; drop the sender, which ends
    /// the write loop and tears down the origin connection. Synchronous
    /// for the same reason as [`dispatch`](Self::dispatch).
    pub fn close(&self, socket_id: &str) {
        self.inner
            .lock()
            .expect("origin registry lock poisoned")
            .remove(socket_id);
    }
}

impl Default for TcpOriginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_origin_connection(
    registry: TcpOriginRegistry,
    control: ControlChannel,
    local_port: u16,
    socket_id: String,
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
) {
    let stream = match TcpStream::connect(("127.0.0.1", local_port)).await {
        Ok(s) => s,
        Err(e) => {
            warn!(socket_id, error = %e, "failed to connect to local TCP service");
            registry.close(&socket_id);
            control.send(Frame::TcpClose { socket_id });
            return;
        }
    };
    let (mut read_half, mut write_half) = stream.into_split();

    let write_task = {
        let socket_id = socket_id.clone();
        tokio::spawn(async move {
            while let Some(chunk) = rx.recv().await {
                if write_half.write_all(&chunk).await.is_err() {
                    break;
                }
            }
            let _ = write_half.shutdown().await;
            debug!(socket_id, "origin write half closed");
        })
    };

    let mut buf = vec![0u8; 16 * 1024];
    loop {
        match read_half.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let sent = control.send(Frame::TcpResponse {
                    request_id: uuid::Uuid::new_v4().to_string(),
                    socket_id: socket_id.clone(),
                    data: buf[..n].to_vec(),
                });
                if !sent {
                    break;
                }
            }
        }
    }

    registry.close(&socket_id);
    control.send(Frame::TcpClose {
        socket_id: socket_id.clone(),
    });
    write_task.abort();
    debug!(socket_id, "origin connection closed");
}
