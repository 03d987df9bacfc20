//! Client transport endpoints.
//!
//! Both transports present the same frame-at-a-time interface. The TCP
//! endpoint reassembles frames across chunk boundaries with [`LineCodec`];
//! the UDP endpoint is a connected socket whose datagrams are complete
//! frames. `recv` is cancel-safe: decoded frames queue inside the
//! transport, and the underlying reads never buffer partially outside it.

use std::collections::VecDeque;

use bytes::BytesMut;
use lanrelay_proto::{ClientFrame, LineCodec, ProtocolError, split_datagram};
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpStream, UdpSocket},
};

/// Client-side errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not reach the server.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Target address.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Transport I/O failed mid-session.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// The server sent undecodable data.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// A connected client endpoint for either transport.
pub struct ClientTransport {
    inner: Inner,
    /// Frames decoded but not yet handed out.
    pending: VecDeque<String>,
}

enum Inner {
    Tcp { stream: TcpStream, codec: LineCodec, buf: BytesMut },
    Udp { socket: UdpSocket, buf: Vec<u8> },
}

impl ClientTransport {
    /// Connect over the stream transport.
    pub async fn connect_tcp(addr: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ClientError::Connect { addr: addr.to_string(), source })?;

        Ok(Self {
            inner: Inner::Tcp {
                stream,
                codec: LineCodec::new(),
                buf: BytesMut::with_capacity(4096),
            },
            pending: VecDeque::new(),
        })
    }

    /// Open the datagram transport against a server address.
    ///
    /// Binds an ephemeral local port; the server learns our identity from
    /// the first datagram's source address.
    pub async fn connect_udp(addr: &str) -> Result<Self, ClientError> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|source| ClientError::Connect { addr: addr.to_string(), source })?;
        socket
            .connect(addr)
            .await
            .map_err(|source| ClientError::Connect { addr: addr.to_string(), source })?;

        Ok(Self {
            inner: Inner::Udp { socket, buf: vec![0u8; 64 * 1024] },
            pending: VecDeque::new(),
        })
    }

    /// Send one frame to the server.
    pub async fn send(&mut self, frame: &ClientFrame) -> Result<(), ClientError> {
        let wire = frame.to_wire();
        match &mut self.inner {
            Inner::Tcp { stream, .. } => stream.write_all(wire.as_bytes()).await?,
            Inner::Udp { socket, .. } => {
                socket.send(wire.as_bytes()).await?;
            },
        }
        Ok(())
    }

    /// Next inbound frame. `Ok(None)` means the server closed the stream
    /// (the datagram transport has no close and never returns `None`).
    pub async fn recv(&mut self) -> Result<Option<String>, ClientError> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Ok(Some(line));
            }

            match &mut self.inner {
                Inner::Tcp { stream, codec, buf } => {
                    let n = stream.read_buf(buf).await?;
                    if n == 0 {
                        return Ok(None);
                    }
                    let frames = codec.decode(buf)?;
                    buf.clear();
                    self.pending.extend(frames.into_iter().filter(|line| !line.is_empty()));
                },
                Inner::Udp { socket, buf } => {
                    let n = socket.recv(buf).await?;
                    let frames = split_datagram(&buf[..n])?;
                    self.pending.extend(frames.into_iter().filter(|line| !line.is_empty()));
                },
            }
        }
    }
}
