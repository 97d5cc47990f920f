use thiserror::Error;

/// Errors from encoding/decoding a [`crate::Frame`].
///
/// Malformed base64 in a byte-carrying field surfaces here too: the
/// `#[serde(with = ...)]` modules in `bytes.rs` report a failed decode via
/// `serde::de::Error::custom`, which `serde_json` folds into the same
/// `serde_json::Error` this variant already carries.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame decode error: {0}")]
    Decode(#[from] serde_json::Error),
}
