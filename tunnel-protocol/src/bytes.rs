//! Base64 (de)serialization for binary frame fields.
//!
//! Mirrors the `base64::engine::general_purpose::STANDARD` usage the
//! original relay's `relay.rs`/`agent.rs` used for TCP payloads, just
//! applied uniformly to every byte-carrying field via `#[serde(with = ...)]`
//! instead of hand-encoding at each call site.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub mod bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        STANDARD.encode(bytes).serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(de)?;
        STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}

pub mod opt_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, ser: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => Some(STANDARD.encode(b)).serialize(ser),
            None => Option::<String>::None.serialize(ser),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(de)?;
        match encoded {
            Some(s) => STANDARD
                .decode(s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Frame, Headers, Protocol};

    #[test]
    fn empty_body_round_trips_as_null() {
        let frame = Frame::HttpResponse {
            request_id: "x".into(),
            status: 204,
            headers: Headers::new(),
            body: None,
            error: None,
        };
        let text = crate::encode(&frame).unwrap();
        assert!(text.contains("\"body\":null"));
        assert_eq!(crate::decode(&text).unwrap(), frame);
    }

    #[test]
    fn tcp_data_bytes_round_trip() {
        let frame = Frame::TcpData {
            request_id: "r1".into(),
            socket_id: "127.0.0.1:9999".into(),
            data: vec![0, 1, 2, 255, 254],
        };
        let text = crate::encode(&frame).unwrap();
        assert_eq!(crate::decode(&text).unwrap(), frame);
        let _ = Protocol::Tcp;
    }
}
