use thiserror::Error;

/// Errors raised while servicing one session. Disposition for each variant
/// follows spec §7's error table.
#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("public port {0} already mapped")]
    PortInUse(u16),

    #[error("failed to bind public port {0}: {1}")]
    BindFailed(u16, std::io::Error),

    #[error("session already registered")]
    AlreadyRegistered,

    #[error("pending table full (capacity {0})")]
    PendingTableFull(usize),

    #[error("frame decode error: {0}")]
    Decode(#[from] tunnel_protocol::FrameError),

    #[error("session closed before a reply arrived")]
    SessionClosed,

    #[error("request timed out")]
    Timeout,
}
