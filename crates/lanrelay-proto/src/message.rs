//! Frame classification and notice formatting.
//!
//! Client frames are classified by sniffing a fixed control prefix: a frame
//! starting with `__USERNAME__:` is a registration attempt, the bare keyword
//! `QUIT` is a termination, anything else is a chat payload. Deliberately a
//! two-state parser, not a command grammar.

use std::{fmt, net::SocketAddr};

use crate::errors::{ProtocolError, Result};

/// Control prefix binding an identity to a display name.
pub const REGISTER_PREFIX: &str = "__USERNAME__:";

/// Reserved termination keyword frame.
///
/// Client-local shortcuts (`/quit`, `/exit`) are translated to this frame by
/// the client session; they never appear on the wire themselves.
pub const QUIT_FRAME: &str = "QUIT";

/// Minimum display-name length in characters.
pub const MIN_NAME_LEN: usize = 1;

/// Maximum display-name length in characters.
pub const MAX_NAME_LEN: usize = 15;

/// Check that a display name is within the permitted 1–15 character range.
///
/// # Errors
///
/// [`ProtocolError::InvalidName`] if the name is empty or too long.
pub fn validate_display_name(name: &str) -> Result<()> {
    let len = name.chars().count();
    if (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        Ok(())
    } else {
        Err(ProtocolError::InvalidName { len })
    }
}

/// One decoded client frame.
///
/// Parsing never fails: an unrecognized frame is a chat payload by
/// definition. Whether a payload is acceptable in the sender's current
/// registration state is the relay driver's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// Registration handshake carrying the requested display name.
    ///
    /// The name is not validated here; the driver validates it so an invalid
    /// name can be treated as a protocol violation on that identity.
    Register {
        /// Requested display name, as sent.
        name: String,
    },

    /// Termination frame.
    Quit,

    /// Free-text chat payload.
    Chat {
        /// Payload text, already trimmed by the codec.
        text: String,
    },
}

impl ClientFrame {
    /// Classify one trimmed frame.
    pub fn parse(line: &str) -> Self {
        if let Some(name) = line.strip_prefix(REGISTER_PREFIX) {
            Self::Register { name: name.to_string() }
        } else if line == QUIT_FRAME {
            Self::Quit
        } else {
            Self::Chat { text: line.to_string() }
        }
    }

    /// Encode for the wire, newline terminator included.
    pub fn to_wire(&self) -> String {
        match self {
            Self::Register { name } => format!("{REGISTER_PREFIX}{name}\n"),
            Self::Quit => format!("{QUIT_FRAME}\n"),
            Self::Chat { text } => format!("{text}\n"),
        }
    }
}

/// One server-to-client notice.
///
/// `Display` produces the exact wire text without the newline terminator;
/// [`ServerNotice::to_wire`] appends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerNotice {
    /// Sent once, only to the newly registered peer.
    Welcome {
        /// The peer's accepted display name.
        name: String,
    },

    /// Broadcast when a peer registers.
    Joined {
        /// Display name of the new participant.
        name: String,
    },

    /// Broadcast when a registered peer terminates or is lost.
    Left {
        /// Display name of the departed participant.
        name: String,
    },

    /// A relayed chat payload.
    Relay {
        /// Sender's display name.
        name: String,
        /// Sender's peer address, shown as `host:port`.
        origin: SocketAddr,
        /// The chat text.
        text: String,
    },
}

impl ServerNotice {
    /// Encode for the wire, newline terminator included.
    pub fn to_wire(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for ServerNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Welcome { name } => write!(f, "Welcome, {name}!"),
            Self::Joined { name } => write!(f, "*** {name} joined the chat. ***"),
            Self::Left { name } => write!(f, "*** {name} left the chat. ***"),
            Self::Relay { name, origin, text } => write!(f, "[{name} {origin}] {text}"),
        }
    }
}
