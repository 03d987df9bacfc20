//! Relay driver: per-identity protocol state machine plus fan-out decisions.
//!
//! Events in, actions out, no I/O. The runtime decodes frames (the stream
//! runtime owns a reassembly codec per connection, the datagram runtime
//! splits whole packets) and feeds trimmed lines here; the driver classifies
//! them and applies the state machine:
//!
//! - UNREGISTERED + valid registration → REGISTERED, welcome to the
//!   registrant, "joined" to the other registered sessions
//! - UNREGISTERED + anything else → protocol violation, dropped silently
//! - REGISTERED + payload → relayed to every other registered session
//! - REGISTERED + QUIT or transport loss → removed, "left" broadcast
//!
//! Broadcast policy: the origin is always excluded, on both transports.
//! Teardown is idempotent - a quit racing a transport loss removes the
//! session once and emits exactly one "left" notice.

use std::{fmt::Debug, hash::Hash, net::SocketAddr};

use lanrelay_proto::{ClientFrame, ServerNotice, validate_display_name};

use crate::registry::SessionRegistry;

/// Events fed to the driver by the runtime.
#[derive(Debug, Clone)]
pub enum RelayEvent<I> {
    /// First contact from an identity. Idempotent: the datagram runtime
    /// reports contact on every packet since it has no accept step.
    PeerConnected {
        /// Transport identity.
        id: I,
        /// Peer address, used as the displayed identity in relayed lines.
        addr: SocketAddr,
    },

    /// One complete, trimmed frame was decoded from the identity.
    LineReceived {
        /// Transport identity.
        id: I,
        /// Frame text without the newline terminator.
        line: String,
    },

    /// The identity's input could not be decoded (invalid UTF-8, oversized
    /// frame). A protocol violation: the session is dropped silently.
    DecodeFailed {
        /// Transport identity.
        id: I,
    },

    /// Transport-level loss (EOF, reset, closed socket). The datagram
    /// transport never produces this for inbound peers; its only teardown
    /// paths are the QUIT frame and a failed outbound send.
    PeerDisconnected {
        /// Transport identity.
        id: I,
    },
}

/// Actions the driver asks the runtime to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayAction<I> {
    /// Send one notice to a single session.
    Send {
        /// Target identity.
        id: I,
        /// Notice to deliver.
        notice: ServerNotice,
    },

    /// Deliver one notice to every currently REGISTERED session.
    ///
    /// The runtime resolves recipients via [`RelayDriver::registered_ids`]
    /// under the same lock it handled the event with, so the snapshot
    /// reflects this event's registry mutations. A write failure on one
    /// recipient must not abort delivery to the rest.
    Broadcast {
        /// Notice to deliver.
        notice: ServerNotice,
        /// Identity to skip, if any (the message origin).
        exclude: Option<I>,
    },

    /// Close the identity's transport endpoint. The registry entry is
    /// already gone; the stream runtime closes the connection, the datagram
    /// runtime has nothing to close.
    DropPeer {
        /// Identity to drop.
        id: I,
    },
}

/// The relay state machine.
///
/// Owns the session registry exclusively. All registry mutation happens
/// through [`RelayDriver::handle`] on the runtime's single scheduling
/// context (or behind its one driver lock).
#[derive(Debug, Default)]
pub struct RelayDriver<I> {
    registry: SessionRegistry<I>,
}

impl<I: Copy + Eq + Hash + Debug> RelayDriver<I> {
    /// Create a driver with an empty registry.
    pub fn new() -> Self {
        Self { registry: SessionRegistry::new() }
    }

    /// Apply one event and return the actions it produces.
    pub fn handle(&mut self, event: RelayEvent<I>) -> Vec<RelayAction<I>> {
        match event {
            RelayEvent::PeerConnected { id, addr } => {
                if self.registry.contact(id, addr) {
                    tracing::debug!(?id, %addr, "peer connected");
                }
                Vec::new()
            },
            RelayEvent::LineReceived { id, line } => self.on_line(id, &line),
            RelayEvent::DecodeFailed { id } => self.drop_silently(id, "undecodable frame"),
            RelayEvent::PeerDisconnected { id } => self.on_disconnect(id),
        }
    }

    /// Snapshot of all currently REGISTERED identities, for broadcast
    /// fan-out.
    pub fn registered_ids(&self) -> Vec<I> {
        self.registry.registered_ids()
    }

    /// Whether an identity currently holds a REGISTERED session.
    pub fn is_registered(&self, id: I) -> bool {
        self.registry.is_registered(id)
    }

    /// Number of tracked sessions, registered or not.
    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    fn on_line(&mut self, id: I, line: &str) -> Vec<RelayAction<I>> {
        if line.is_empty() {
            return Vec::new();
        }

        // Frames from an identity torn down earlier in the same batch
        // (e.g. bytes queued behind a QUIT) have no session to act on.
        let Some(session) = self.registry.get(id) else {
            tracing::debug!(?id, "frame from unknown identity ignored");
            return Vec::new();
        };
        let registered = session.registered();
        let addr = session.addr;

        match ClientFrame::parse(line) {
            ClientFrame::Register { name } => {
                if registered {
                    // Re-registration is a no-op: the name binds once.
                    tracing::debug!(?id, "duplicate registration ignored");
                    return Vec::new();
                }
                if validate_display_name(&name).is_err() {
                    tracing::warn!(?id, %addr, "invalid display name, dropping peer");
                    return self.drop_silently(id, "invalid display name");
                }

                self.registry.promote(id, &name);
                tracing::info!(?id, %addr, name, "peer registered");
                vec![
                    RelayAction::Send { id, notice: ServerNotice::Welcome { name: name.clone() } },
                    RelayAction::Broadcast {
                        notice: ServerNotice::Joined { name },
                        exclude: Some(id),
                    },
                ]
            },

            ClientFrame::Quit => {
                if registered {
                    self.terminate(id)
                } else {
                    // QUIT before registration is not a handshake.
                    self.drop_silently(id, "termination before registration")
                }
            },

            ClientFrame::Chat { text } => {
                if registered {
                    // `registered` implies the name is present.
                    let name = self
                        .registry
                        .get(id)
                        .and_then(|s| s.display_name.clone())
                        .unwrap_or_default();
                    vec![RelayAction::Broadcast {
                        notice: ServerNotice::Relay { name, origin: addr, text },
                        exclude: Some(id),
                    }]
                } else {
                    self.drop_silently(id, "payload before registration")
                }
            },
        }
    }

    fn on_disconnect(&mut self, id: I) -> Vec<RelayAction<I>> {
        let Some(session) = self.registry.remove(id) else {
            // Already torn down (quit raced the transport loss).
            return Vec::new();
        };

        match session.display_name {
            Some(name) => {
                tracing::info!(?id, addr = %session.addr, name, "peer disconnected");
                vec![RelayAction::Broadcast { notice: ServerNotice::Left { name }, exclude: None }]
            },
            None => {
                tracing::debug!(?id, addr = %session.addr, "unregistered peer disconnected");
                Vec::new()
            },
        }
    }

    /// Explicit termination of a registered session: remove, announce, drop.
    fn terminate(&mut self, id: I) -> Vec<RelayAction<I>> {
        let Some(session) = self.registry.remove(id) else {
            return Vec::new();
        };
        let name = session.display_name.unwrap_or_default();
        tracing::info!(?id, addr = %session.addr, name, "peer quit");
        vec![
            RelayAction::Broadcast { notice: ServerNotice::Left { name }, exclude: None },
            RelayAction::DropPeer { id },
        ]
    }

    /// Protocol-violation teardown: remove the session, nothing broadcast.
    fn drop_silently(&mut self, id: I, reason: &str) -> Vec<RelayAction<I>> {
        if self.registry.remove(id).is_some() {
            tracing::warn!(?id, reason, "protocol violation, session dropped");
            vec![RelayAction::DropPeer { id }]
        } else {
            Vec::new()
        }
    }
}
