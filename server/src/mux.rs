//! Request Multiplexer (spec §4.5 / C5).
//!
//! HTTP: inserts a pending entry, frames the request, sends it, and awaits
//! the one-shot reply — guaranteeing every inserted `request_id` eventually
//! completes (reply, timeout, or drain) with at-most-once delivery.
//!
//! TCP: does not await a reply in line. `TcpResponse`/`TcpClose` frames are
//! asynchronous demultiplex events keyed by `socket_id`, delivered straight
//! to the live public socket registry (§4.4's `SocketRegistry`) by the
//! Control Channel's receive loop — see [`deliver_tcp_response`] and
//! [`deliver_tcp_close`], called from `handlers.rs`.

use tunnel_protocol::{Frame, Headers};

use crate::pending::PendingOutcome;
use crate::session::Session;
use crate::state::generate_request_id;

/// What the public HTTP listener should translate a dispatch result into.
pub struct HttpOutcome {
    pub status: u16,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

impl HttpOutcome {
    fn gateway(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Some(message.into().into_bytes()),
        }
    }
}

/// Sends one buffered HTTP request over `session`'s control channel and
/// awaits the matching reply, translating timeouts and session loss per
/// spec §4.4 item 4.
pub async fn dispatch_http(
    session: &Session,
    method: String,
    path_and_query: String,
    headers: Headers,
    body: Option<Vec<u8>>,
    deadline: std::time::Duration,
    capacity: usize,
) -> HttpOutcome {
    if session.pending.len() >= capacity {
        return HttpOutcome::gateway(503, "tunnel over capacity");
    }

    let request_id = generate_request_id();
    let Some(rx) = session.pending.insert(request_id.clone(), deadline) else {
        return HttpOutcome::gateway(503, "duplicate request id");
    };

    let sent = session.send(Frame::HttpRequest {
        request_id,
        method,
        path_and_query,
        headers,
        body,
    });
    if !sent {
        return HttpOutcome::gateway(502, "tunnel session is gone");
    }

    match rx.await {
        // spec §4.4: a non-null `error` always forces a 502 with that
        // message as the body, regardless of whatever `status`/`headers`
        // the client also sent.
        Ok(PendingOutcome::Replied {
            error: Some(message),
            ..
        }) => HttpOutcome::gateway(502, message),
        Ok(PendingOutcome::Replied {
            status,
            headers,
            body,
            error: None,
        }) => HttpOutcome {
            status,
            headers,
            body,
        },
        Ok(PendingOutcome::Timeout) => HttpOutcome::gateway(504, "gateway timeout"),
        Ok(PendingOutcome::Gone) => HttpOutcome::gateway(502, "tunnel session is gone"),
        // The sender side was dropped without completing — only possible
        // if the session task itself panicked; treat as gone.
        Err(_) => HttpOutcome::gateway(502, "tunnel session is gone"),
    }
}

/// Routes an inbound `HttpResponse` frame to its waiting pending entry.
/// Silently dropped if the `request_id` is unknown (spec invariant 5).
pub fn deliver_http_response(
    session: &Session,
    request_id: &str,
    status: u16,
    headers: Headers,
    body: Option<Vec<u8>>,
    error: Option<String>,
) {
    session.pending.complete(
        request_id,
        PendingOutcome::Replied {
            status,
            headers,
            body,
            error,
        },
    );
}

/// Routes an inbound `TcpResponse` frame's payload to the originating
/// public socket.
pub fn deliver_tcp_response(session: &Session, socket_id: &str, data: Vec<u8>) {
    session.sockets.send(socket_id, data);
}

/// Routes an inbound `TcpClose` frame: drops the registry entry so no
/// further bytes are written to an already-closed origin side.
pub fn deliver_tcp_close(session: &Session, socket_id: &str) {
    session.sockets.remove(socket_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn test_session() -> (std::sync::Arc<Session>, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Session::new("s1".into(), tx), rx)
    }

    #[tokio::test]
    async fn replies_are_delivered() {
        let (session, mut rx) = test_session();
        let reply_session = session.clone();
        tokio::spawn(async move {
            if let Some(Frame::HttpRequest { request_id, .. }) = rx.recv().await {
                deliver_http_response(
                    &reply_session,
                    &request_id,
                    200,
                    Headers::new(),
                    Some(b"hi".to_vec()),
                    None,
                );
            }
        });

        let outcome = dispatch_http(
            &session,
            "GET".into(),
            "/a".into(),
            Headers::new(),
            None,
            std::time::Duration::from_secs(5),
            10,
        )
        .await;
        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.body, Some(b"hi".to_vec()));
    }

    #[tokio::test]
    async fn non_null_error_forces_502_regardless_of_status() {
        let (session, mut rx) = test_session();
        let reply_session = session.clone();
        tokio::spawn(async move {
            if let Some(Frame::HttpRequest { request_id, .. }) = rx.recv().await {
                deliver_http_response(
                    &reply_session,
                    &request_id,
                    200,
                    Headers::new(),
                    None,
                    Some("boom".into()),
                );
            }
        });

        let outcome = dispatch_http(
            &session,
            "GET".into(),
            "/a".into(),
            Headers::new(),
            None,
            std::time::Duration::from_secs(5),
            10,
        )
        .await;
        assert_eq!(outcome.status, 502);
        assert_eq!(outcome.body, Some(b"boom".to_vec()));
    }

    #[tokio::test]
    async fn unanswered_request_times_out() {
        let (session, mut rx) = test_session();
        tokio::spawn(async move {
            let _ = rx.recv().await;
        });

        let outcome = dispatch_http(
            &session,
            "GET".into(),
            "/a".into(),
            Headers::new(),
            None,
            std::time::Duration::from_millis(20),
            10,
        )
        .await;
        assert_eq!(outcome.status, 504);
    }

    #[tokio::test]
    async fn over_capacity_rejected_without_sending() {
        let (session, _rx) = test_session();
        let outcome = dispatch_http(
            &session,
            "GET".into(),
            "/a".into(),
            Headers::new(),
            None,
            std::time::Duration::from_secs(5),
            0,
        )
        .await;
        assert_eq!(outcome.status, 503);
    }
}
