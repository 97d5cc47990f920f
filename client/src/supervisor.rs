//! Reconnect supervisor (spec §4.8 / C8).
//!
//! Owns the client's outer loop: connect, register, relay frames until the
//! control channel drops, then wait and try again with the same
//! parameters. Runs until the process is killed.

use std::time::Duration;

use tracing::{error, info, warn};
use tunnel_protocol::{Frame, Protocol};

use crate::control::ControlChannel;
use crate::dispatcher::{self, TcpOriginRegistry};
use crate::error::ClientError;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub struct SupervisorConfig {
    pub control_url: String,
    pub local_port: u16,
    pub public_port: u16,
    pub protocol: Protocol,
}

/// Runs the reconnect loop forever. Each iteration is one connection
/// attempt; a lost connection (or a rejected registration) logs and
/// retries after [`RECONNECT_DELAY`] rather than giving up, since the
/// outage may be transient on either end.
pub async fn run(config: SupervisorConfig) {
    loop {
        match run_once(&config).await {
            Ok(()) => info!("control channel closed, reconnecting"),
            Err(e) => warn!(error = %e, "connection attempt failed, reconnecting"),
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn run_once(config: &SupervisorConfig) -> Result<(), ClientError> {
    let (control, mut receiver) = ControlChannel::connect(&config.control_url).await?;

    control.send(Frame::Register {
        local_port: config.local_port,
        public_port: config.public_port,
        protocol: config.protocol,
    });

    let session_id = match receiver.recv().await {
        Some(Ok(Frame::Registered {
            session_id,
            public_url,
            ..
        })) => {
            info!(session_id = %session_id, public_url = %public_url, "tunnel registered");
            session_id
        }
        Some(Ok(Frame::Error { message })) => return Err(ClientError::RegistrationRejected(message)),
        Some(Ok(other)) => {
            return Err(ClientError::RegistrationRejected(format!(
                "unexpected frame before registration: {other:?}"
            )))
        }
        Some(Err(e)) => return Err(e),
        None => return Err(ClientError::ControlChannelClosed),
    };

    let http_client = reqwest::Client::new();
    let tcp_registry = TcpOriginRegistry::new();

    while let Some(frame) = receiver.recv().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                error!(session_id = %session_id, error = %e, "control channel decode error");
                return Err(e);
            }
        };

        match frame {
            Frame::HttpRequest {
                request_id,
                method,
                path_and_query,
                headers,
                body,
            } => {
                let control = control.clone();
                let http_client = http_client.clone();
                let local_port = config.local_port;
                tokio::spawn(async move {
                    let response = dispatcher::dispatch_http(
                        &http_client,
                        local_port,
                        request_id,
                        method,
                        path_and_query,
                        headers,
                        body,
                    )
                    .await;
                    control.send(response);
                });
            }
            Frame::TcpData {
                socket_id, data, ..
            } => {
                // Dispatched inline, synchronously, so chunks for the same
                // socket_id are handed to the origin connection in arrival
                // order (spec §5) and a brand-new socket_id can only ever
                // open one origin connection (SPEC_FULL.md §4, Open
                // Question 2). Only the long-lived origin connection
                // reader/writer is spawned, inside `dispatch` itself.
                tcp_registry.dispatch(control.clone(), config.local_port, socket_id, data);
            }
            Frame::TcpClose { socket_id } => {
                tcp_registry.close(&socket_id);
            }
            other => {
                warn!(session_id = %session_id, frame = ?other, "ignoring unexpected frame from server");
            }
        }
    }

    Ok(())
}
