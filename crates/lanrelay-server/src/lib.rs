//! lanrelay chat relay server.
//!
//! Runtime glue around [`lanrelay_core`]'s event/action driver: the driver
//! decides, this crate does the I/O. Two transports share the one driver
//! implementation:
//!
//! - TCP ([`TransportKind::Tcp`]): accept loop, one task per connection,
//!   per-session writer tasks, shared driver behind a single lock.
//! - UDP ([`TransportKind::Udp`]): one task owning socket and driver, the
//!   packet source address as the session identity.

mod error;
mod fanout;
mod tcp;
mod udp;

use std::net::SocketAddr;

pub use error::ServerError;
use tokio::net::{TcpListener, UdpSocket};

/// Which transport the server speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Connection-oriented stream transport.
    Tcp,
    /// Connectionless datagram transport.
    Udp,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind, e.g. `127.0.0.1:49152`.
    pub bind_address: String,
    /// Transport to serve.
    pub transport: TransportKind,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "127.0.0.1:49152".to_string(), transport: TransportKind::Tcp }
    }
}

/// A bound relay server, ready to run.
pub struct Server {
    endpoint: Endpoint,
}

enum Endpoint {
    Tcp(TcpListener),
    Udp(UdpSocket),
}

impl Server {
    /// Bind the configured address.
    ///
    /// # Errors
    ///
    /// [`ServerError::Config`] for an unparseable address;
    /// [`ServerError::Transport`] if the bind fails (e.g. port already in
    /// use). Bind failures are fatal and never retried.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
            ServerError::Config(format!("invalid bind address '{}': {e}", config.bind_address))
        })?;

        let endpoint = match config.transport {
            TransportKind::Tcp => {
                let listener = TcpListener::bind(addr)
                    .await
                    .map_err(|e| ServerError::Transport(format!("failed to bind {addr}: {e}")))?;
                Endpoint::Tcp(listener)
            },
            TransportKind::Udp => {
                let socket = UdpSocket::bind(addr)
                    .await
                    .map_err(|e| ServerError::Transport(format!("failed to bind {addr}: {e}")))?;
                Endpoint::Udp(socket)
            },
        };

        Ok(Self { endpoint })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        let addr = match &self.endpoint {
            Endpoint::Tcp(listener) => listener.local_addr()?,
            Endpoint::Udp(socket) => socket.local_addr()?,
        };
        Ok(addr)
    }

    /// Run the relay until the process exits.
    pub async fn run(self) -> Result<(), ServerError> {
        match self.endpoint {
            Endpoint::Tcp(listener) => tcp::run(listener).await,
            Endpoint::Udp(socket) => udp::run(socket).await,
        }
    }
}
