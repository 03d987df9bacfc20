//! Datagram transport: one socket, source address as identity.
//!
//! There is no accept step: a session record appears on first contact and
//! the sender only becomes a real participant once it registers. The whole
//! transport runs on one task that owns the driver outright, so registry
//! mutation needs no lock at all.
//!
//! Packet loss, duplication and reordering are accepted as-is. The only
//! teardown paths are an explicit QUIT frame and a failed outbound send; a
//! peer that silently vanishes holds its registry slot indefinitely.

use std::{collections::VecDeque, net::SocketAddr};

use lanrelay_core::{RelayDriver, RelayEvent};
use lanrelay_proto::split_datagram;
use tokio::net::UdpSocket;

use crate::{
    error::ServerError,
    fanout::{self, Delivery},
};

/// Receive datagrams until the process exits.
pub(crate) async fn run(socket: UdpSocket) -> Result<(), ServerError> {
    let mut driver: RelayDriver<SocketAddr> = RelayDriver::new();
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                tracing::warn!(error = %e, "datagram receive error");
                continue;
            },
        };

        apply(&mut driver, &socket, RelayEvent::PeerConnected { id: peer, addr: peer }).await;

        match split_datagram(&buf[..len]) {
            Ok(frames) => {
                for line in frames {
                    apply(&mut driver, &socket, RelayEvent::LineReceived { id: peer, line }).await;
                }
            },
            Err(e) => {
                tracing::warn!(%peer, error = %e, "undecodable datagram");
                apply(&mut driver, &socket, RelayEvent::DecodeFailed { id: peer }).await;
            },
        }
    }
}

/// Feed one event to the driver and execute everything it causes.
///
/// A failed `send_to` tears that recipient down through the normal
/// termination path; delivery to the remaining recipients is unaffected.
async fn apply(driver: &mut RelayDriver<SocketAddr>, socket: &UdpSocket, event: RelayEvent<SocketAddr>) {
    let mut events = VecDeque::from([event]);

    while let Some(event) = events.pop_front() {
        let actions = driver.handle(event);
        for delivery in fanout::resolve(driver, actions) {
            match delivery {
                Delivery::Line { id, line } => {
                    if let Err(e) = socket.send_to(line.as_bytes(), id).await {
                        tracing::warn!(peer = %id, error = %e, "send failed, tearing session down");
                        events.push_back(RelayEvent::PeerDisconnected { id });
                    }
                },
                // No connection to close on a datagram socket.
                Delivery::Close { .. } => {},
            }
        }
    }
}
