//! Control Channel, client half (spec §4.1 / C2).
//!
//! Mirrors the relay's own reconnect-loop shape: a single WebSocket
//! connection carrying JSON-framed [`Frame`] values, split into an outbound
//! queue (so the Origin Dispatcher's concurrently-running tasks can all
//! send replies without fighting over the sink) and an inbound stream
//! drained by the caller.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use tunnel_protocol::Frame;

use crate::error::ClientError;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Handle for sending frames; cheap to clone and share across tasks.
#[derive(Clone)]
pub struct ControlChannel {
    outbound: mpsc::UnboundedSender<Frame>,
}

impl ControlChannel {
    /// Connects to the server's control endpoint and spawns the writer
    /// task. Returns the sending handle plus the receiver half, which the
    /// caller drives in its own loop.
    pub async fn connect(url: &str) -> Result<(Self, FrameReceiver), ClientError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| ClientError::ConnectFailed(url.to_string(), e))?;
        let (sink, stream) = ws_stream.split();

        let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
        tokio::spawn(async move {
            run_writer(sink, &mut rx).await;
        });

        Ok((Self { outbound: tx }, FrameReceiver { stream }))
    }

    /// Queues a frame for sending. Returns `false` if the writer task has
    /// already exited (connection lost).
    pub fn send(&self, frame: Frame) -> bool {
        self.outbound.send(frame).is_ok()
    }
}

async fn run_writer(mut sink: WsSink, rx: &mut mpsc::UnboundedReceiver<Frame>) {
    while let Some(frame) = rx.recv().await {
        let text = match tunnel_protocol::encode(&frame) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "failed to encode outbound frame, dropping");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(text)).await {
            warn!(error = %e, "control channel write failed, stopping writer");
            break;
        }
    }
    debug!("control channel writer task exiting");
}

/// The inbound half of a connected control channel.
pub struct FrameReceiver {
    stream: WsSource,
}

impl FrameReceiver {
    /// Returns the next decoded frame, or `None` once the connection is
    /// closed. A malformed text frame is fatal for the connection per
    /// spec §4.1 (same disposition as the server's half).
    pub async fn recv(&mut self) -> Option<Result<Frame, ClientError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(tunnel_protocol::decode(&text).map_err(ClientError::from)),
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(ClientError::from(e))),
            }
        }
    }
}
