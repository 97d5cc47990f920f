use serde::{Deserialize, Serialize};

use crate::bytes::{bytes, opt_bytes};
use crate::headers::Headers;

/// The two tunnel shapes a session can register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Http,
    Tcp,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Tcp => write!(f, "tcp"),
        }
    }
}

/// One message on the control channel. See spec §3 for the full contract.
///
/// Serialized with serde's internally-tagged representation: every variant
/// becomes a JSON object with a `"type"` field holding the snake_case
/// variant name, matching the relay's existing wire convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Client → server: request a tunnel for `local_port` at `public_port`.
    Register {
        local_port: u16,
        public_port: u16,
        protocol: Protocol,
    },

    /// Server → client: registration succeeded. Emitted exactly once per
    /// session (spec §3 invariant 3).
    Registered {
        session_id: String,
        local_port: u16,
        public_port: u16,
        protocol: Protocol,
        public_url: String,
    },

    /// Server → client: a `Register` (or any other operation) failed.
    /// Fatal for the pending operation only, not the session, unless the
    /// decode/transport layer is what raised it.
    Error { message: String },

    /// Server → client: one buffered public HTTP request awaiting a reply.
    HttpRequest {
        request_id: String,
        method: String,
        path_and_query: String,
        headers: Headers,
        #[serde(with = "opt_bytes", default)]
        body: Option<Vec<u8>>,
    },

    /// Client → server: the origin's reply to a matching `HttpRequest`.
    HttpResponse {
        request_id: String,
        status: u16,
        headers: Headers,
        #[serde(with = "opt_bytes", default)]
        body: Option<Vec<u8>>,
        error: Option<String>,
    },

    /// Server → client: one inbound byte chunk from a public TCP socket.
    TcpData {
        request_id: String,
        socket_id: String,
        #[serde(with = "bytes")]
        data: Vec<u8>,
    },

    /// Client → server: one outbound byte chunk from the origin connection,
    /// to be written back to the public socket named by `socket_id`.
    TcpResponse {
        request_id: String,
        socket_id: String,
        #[serde(with = "bytes")]
        data: Vec<u8>,
    },

    /// Either direction: the named TCP socket/connection has closed.
    /// Additive beyond the distilled spec (SPEC_FULL.md §4, Open Question
    /// 3) — lets the client drop a reused origin connection promptly
    /// instead of relying purely on its own read/write errors.
    TcpClose { socket_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_frame_tag_shape() {
        let frame = Frame::Error {
            message: "port 5000 already in use".into(),
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["message"], "port 5000 already in use");
    }

    #[test]
    fn registered_round_trips_with_protocol() {
        let frame = Frame::Registered {
            session_id: "abc123".into(),
            local_port: 22,
            public_port: 5000,
            protocol: Protocol::Tcp,
            public_url: "tcp://localhost:5000".into(),
        };
        let text = serde_json::to_string(&frame).unwrap();
        let back: Frame = serde_json::from_str(&text).unwrap();
        assert_eq!(back, frame);
    }
}
