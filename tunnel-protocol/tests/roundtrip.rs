//! Black-box round-trip coverage (spec.md §8: "Encoding then decoding any
//! `Frame` yields an equal `Frame`") exercised through the crate's public
//! API only, one test per wire variant.

use tunnel_protocol::{decode, encode, Frame, Headers, Protocol};

fn round_trips(frame: Frame) {
    let text = encode(&frame).unwrap();
    assert_eq!(decode(&text).unwrap(), frame);
}

#[test]
fn register_round_trips() {
    round_trips(Frame::Register {
        local_port: 3000,
        public_port: 5000,
        protocol: Protocol::Http,
    });
}

#[test]
fn registered_round_trips() {
    round_trips(Frame::Registered {
        session_id: "a1b2c3d4".into(),
        local_port: 22,
        public_port: 5000,
        protocol: Protocol::Tcp,
        public_url: "tcp://localhost:5000".into(),
    });
}

#[test]
fn error_round_trips() {
    round_trips(Frame::Error {
        message: "public port 5000 already mapped".into(),
    });
}

#[test]
fn http_request_with_repeated_headers_round_trips() {
    let mut headers = Headers::new();
    headers.push("Set-Cookie", "a=1");
    headers.push("Set-Cookie", "b=2");
    round_trips(Frame::HttpRequest {
        request_id: "r1".into(),
        method: "POST".into(),
        path_and_query: "/a?b=1".into(),
        headers,
        body: Some(b"payload".to_vec()),
    });
}

#[test]
fn http_response_with_null_body_round_trips() {
    round_trips(Frame::HttpResponse {
        request_id: "r1".into(),
        status: 204,
        headers: Headers::new(),
        body: None,
        error: None,
    });
}

#[test]
fn http_response_with_error_round_trips() {
    round_trips(Frame::HttpResponse {
        request_id: "r1".into(),
        status: 0,
        headers: Headers::new(),
        body: None,
        error: Some("local service request failed: connection refused".into()),
    });
}

#[test]
fn tcp_data_round_trips() {
    round_trips(Frame::TcpData {
        request_id: "r1".into(),
        socket_id: "127.0.0.1:54321".into(),
        data: (0..=255).collect(),
    });
}

#[test]
fn tcp_response_round_trips() {
    round_trips(Frame::TcpResponse {
        request_id: "r1".into(),
        socket_id: "127.0.0.1:54321".into(),
        data: vec![],
    });
}

#[test]
fn tcp_close_round_trips() {
    round_trips(Frame::TcpClose {
        socket_id: "127.0.0.1:54321".into(),
    });
}
