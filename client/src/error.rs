use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unknown protocol {0:?}, expected \"http\" or \"tcp\"")]
    InvalidProtocol(String),

    #[error("local service on port {0} is not reachable: {1}")]
    LocalServiceUnreachable(u16, std::io::Error),

    #[error("failed to connect to tunnel server at {0}: {1}")]
    ConnectFailed(String, tokio_tungstenite::tungstenite::Error),

    #[error("control channel closed")]
    ControlChannelClosed,

    #[error("control channel transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("server rejected registration: {0}")]
    RegistrationRejected(String),

    #[error(transparent)]
    Frame(#[from] tunnel_protocol::FrameError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
