//! Wire protocol for the lanrelay chat relay.
//!
//! The protocol is UTF-8 text, one frame per newline. Clients send three
//! frame kinds: a registration control frame (`__USERNAME__:<name>`), a
//! termination keyword (`QUIT`), and free-text chat payloads. The server
//! sends formatted notices (welcome, joined, left) and relayed chat lines.
//!
//! This crate is pure data handling: framing ([`LineCodec`],
//! [`split_datagram`]), frame classification ([`ClientFrame`]), notice
//! formatting ([`ServerNotice`]), and validation. No I/O.

pub mod codec;
pub mod errors;
pub mod message;

pub use codec::{LineCodec, MAX_FRAME_LEN, split_datagram};
pub use errors::ProtocolError;
pub use message::{
    ClientFrame, MAX_NAME_LEN, MIN_NAME_LEN, QUIT_FRAME, REGISTER_PREFIX, ServerNotice,
    validate_display_name,
};
