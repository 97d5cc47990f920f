//! CLI flags (spec §6). Parsing itself is "external collaborator" plumbing
//! per the spec, but the shape of the flags is normative.

use clap::Parser;

use crate::error::ClientError;

/// Reverse tunnel client: exposes a local service through a tunnel-server.
#[derive(Debug, Parser)]
#[command(name = "tunnel-client", version, about)]
pub struct Cli {
    /// Local port to expose. Equivalent to `--local-port`; the positional
    /// form takes precedence if both are given.
    #[arg(value_name = "LOCAL_PORT")]
    local_port_positional: Option<u16>,

    /// Local port to expose.
    #[arg(long = "local-port", short = 'l')]
    local_port_flag: Option<u16>,

    /// Public port to request on the server.
    #[arg(long = "server-port", short = 's', default_value_t = 5000)]
    pub server_port: u16,

    /// Tunnel protocol.
    #[arg(long = "protocol", short = 'p', default_value = "http")]
    pub protocol: String,

    /// Server hostname to connect to. Not named in the distilled spec's CLI
    /// table; added because a client has to know where to dial
    /// (SPEC_FULL.md §4, resolved Open Question 5).
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Port the server's control channel (WebSocket) listens on.
    #[arg(long, default_value_t = 7070)]
    pub control_port: u16,
}

impl Cli {
    pub fn local_port(&self) -> u16 {
        self.local_port_positional
            .or(self.local_port_flag)
            .unwrap_or(3000)
    }

    pub fn protocol(&self) -> Result<tunnel_protocol::Protocol, ClientError> {
        match self.protocol.as_str() {
            "http" => Ok(tunnel_protocol::Protocol::Http),
            "tcp" => Ok(tunnel_protocol::Protocol::Tcp),
            other => Err(ClientError::InvalidProtocol(other.to_string())),
        }
    }

    pub fn control_url(&self) -> String {
        format!("ws://{}:{}/ws", self.host, self.control_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn positional_local_port_wins_over_default() {
        let cli = Cli::parse_from(["tunnel-client", "4000"]);
        assert_eq!(cli.local_port(), 4000);
    }

    #[test]
    fn flag_local_port_used_when_no_positional() {
        let cli = Cli::parse_from(["tunnel-client", "--local-port", "4001"]);
        assert_eq!(cli.local_port(), 4001);
    }

    #[test]
    fn defaults_match_spec() {
        let cli = Cli::parse_from(["tunnel-client"]);
        assert_eq!(cli.local_port(), 3000);
        assert_eq!(cli.server_port, 5000);
        assert_eq!(cli.protocol, "http");
    }

    #[test]
    fn invalid_protocol_rejected() {
        let cli = Cli::parse_from(["tunnel-client", "--protocol", "quic"]);
        assert!(cli.protocol().is_err());
    }
}
