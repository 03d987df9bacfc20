//! Session registry: identity → participant session.
//!
//! An identity maps to at most one session. Removal is idempotent - the
//! teardown path may be triggered twice (an explicit quit racing a transport
//! loss) and must take effect exactly once.

use std::{collections::HashMap, hash::Hash, net::SocketAddr};

/// State of one participant.
///
/// Registration state is encoded in `display_name`: `None` is UNREGISTERED,
/// `Some` is REGISTERED. The terminal state is removal from the registry.
#[derive(Debug, Clone)]
pub struct ParticipantSession {
    /// Peer address, shown as the identity in relayed lines.
    pub addr: SocketAddr,
    /// Display name, assigned exactly once at registration.
    pub display_name: Option<String>,
}

impl ParticipantSession {
    /// Create a new unregistered session.
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, display_name: None }
    }

    /// Whether the session has completed the registration handshake.
    pub fn registered(&self) -> bool {
        self.display_name.is_some()
    }
}

/// Registry of participant sessions, keyed by transport identity.
#[derive(Debug)]
pub struct SessionRegistry<I> {
    sessions: HashMap<I, ParticipantSession>,
}

impl<I> Default for SessionRegistry<I> {
    fn default() -> Self {
        Self { sessions: HashMap::new() }
    }
}

impl<I: Copy + Eq + Hash> SessionRegistry<I> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record first contact from an identity.
    ///
    /// Returns `false` (and changes nothing) if the identity already has a
    /// session. Idempotent so the datagram runtime can report contact on
    /// every packet.
    pub fn contact(&mut self, id: I, addr: SocketAddr) -> bool {
        if self.sessions.contains_key(&id) {
            return false;
        }
        self.sessions.insert(id, ParticipantSession::new(addr));
        true
    }

    /// Promote a session to REGISTERED with the given display name.
    ///
    /// Returns `false` if the identity is unknown or already registered:
    /// the display name is assigned exactly once.
    pub fn promote(&mut self, id: I, name: &str) -> bool {
        match self.sessions.get_mut(&id) {
            Some(session) if session.display_name.is_none() => {
                session.display_name = Some(name.to_string());
                true
            },
            _ => false,
        }
    }

    /// Session record for an identity, if any.
    pub fn get(&self, id: I) -> Option<&ParticipantSession> {
        self.sessions.get(&id)
    }

    /// Whether an identity has a REGISTERED session.
    pub fn is_registered(&self, id: I) -> bool {
        self.sessions.get(&id).is_some_and(ParticipantSession::registered)
    }

    /// Remove a session. Idempotent: returns `None` if already removed.
    pub fn remove(&mut self, id: I) -> Option<ParticipantSession> {
        self.sessions.remove(&id)
    }

    /// Snapshot of all currently REGISTERED identities.
    pub fn registered_ids(&self) -> Vec<I> {
        self.sessions.iter().filter(|(_, s)| s.registered()).map(|(id, _)| *id).collect()
    }

    /// Total number of sessions, registered or not.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn contact_creates_unregistered_session() {
        let mut registry = SessionRegistry::new();

        assert!(registry.contact(1u64, addr(1000)));
        assert!(!registry.get(1).unwrap().registered());
        assert!(!registry.is_registered(1));
    }

    #[test]
    fn contact_is_idempotent() {
        let mut registry = SessionRegistry::new();

        assert!(registry.contact(1u64, addr(1000)));
        registry.promote(1, "Ana");
        assert!(!registry.contact(1, addr(2000)));

        // The original record survives repeated contact.
        assert_eq!(registry.get(1).unwrap().addr, addr(1000));
        assert!(registry.is_registered(1));
    }

    #[test]
    fn promote_assigns_name_exactly_once() {
        let mut registry = SessionRegistry::new();
        registry.contact(1u64, addr(1000));

        assert!(registry.promote(1, "Ana"));
        assert!(!registry.promote(1, "Eve"));
        assert_eq!(registry.get(1).unwrap().display_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn promote_unknown_identity_fails() {
        let mut registry: SessionRegistry<u64> = SessionRegistry::new();
        assert!(!registry.promote(7, "Ana"));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut registry = SessionRegistry::new();
        registry.contact(1u64, addr(1000));

        assert!(registry.remove(1).is_some());
        assert!(registry.remove(1).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn registered_ids_excludes_unregistered() {
        let mut registry = SessionRegistry::new();
        registry.contact(1u64, addr(1000));
        registry.contact(2u64, addr(2000));
        registry.contact(3u64, addr(3000));
        registry.promote(1, "Ana");
        registry.promote(3, "Bo");

        let mut ids = registry.registered_ids();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn datagram_identities_key_by_address() {
        let mut registry = SessionRegistry::new();
        registry.contact(addr(1000), addr(1000));
        registry.contact(addr(2000), addr(2000));

        assert_eq!(registry.len(), 2);
        assert!(registry.remove(addr(1000)).is_some());
        assert!(registry.get(addr(2000)).is_some());
    }
}
