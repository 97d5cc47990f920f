//! # Tunnel Protocol
//!
//! Wire types shared by the tunnel server and client. This crate owns the
//! frame codec (`Frame`), the header multimap, and nothing else: no I/O, no
//! transport, no session state. Both `tunnel-server` and `tunnel-client`
//! depend on it so the two sides of the control channel can never drift.
//!
//! ## Wire format
//!
//! Each [`Frame`] is serialized as a single JSON text value with a `"type"`
//! discriminant (serde's internally-tagged representation), the same
//! convention the relay server/client pair in this codebase have always
//! used for their WebSocket traffic. Binary payloads (HTTP bodies, TCP
//! chunks) are carried as base64 strings rather than JSON arrays of byte
//! integers, since the control channel here is a WebSocket text frame and
//! base64 is the path of least resistance for embedding bytes in JSON.

mod bytes;
mod error;
mod frame;
mod headers;

pub use error::FrameError;
pub use frame::{Frame, Protocol};
pub use headers::Headers;

/// Encode a [`Frame`] as a single JSON text record.
///
/// This is the wire form sent as one WebSocket text message per frame —
/// see [`decode`] for the receiving side.
pub fn encode(frame: &Frame) -> Result<String, FrameError> {
    serde_json::to_string(frame).map_err(FrameError::from)
}

/// Decode a single JSON text record into a [`Frame`].
///
/// Returns [`FrameError::Decode`] on malformed input; the caller (the
/// Control Channel) treats this as fatal for the owning session per
/// spec §4.1.
pub fn decode(text: &str) -> Result<Frame, FrameError> {
    serde_json::from_str(text).map_err(FrameError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Protocol;

    #[test]
    fn register_round_trips() {
        let frame = Frame::Register {
            local_port: 3000,
            public_port: 5000,
            protocol: Protocol::Http,
        };
        let text = encode(&frame).unwrap();
        assert_eq!(decode(&text).unwrap(), frame);
    }

    #[test]
    fn http_request_with_body_round_trips() {
        let mut headers = Headers::new();
        headers.push("Content-Type", "text/plain");
        let frame = Frame::HttpRequest {
            request_id: "req-1".into(),
            method: "POST".into(),
            path_and_query: "/a?b=1".into(),
            headers,
            body: Some(b"hello world".to_vec()),
        };
        let text = encode(&frame).unwrap();
        assert_eq!(decode(&text).unwrap(), frame);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode("not json").is_err());
        assert!(decode(r#"{"type":"not_a_variant"}"#).is_err());
    }

    #[test]
    fn decode_rejects_unknown_but_well_formed_shape() {
        // An object with no recognizable "type" tag should fail, not panic.
        assert!(decode(r#"{"foo":"bar"}"#).is_err());
    }
}
