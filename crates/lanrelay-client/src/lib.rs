//! Symmetric chat client for the lanrelay relay.
//!
//! [`ClientTransport`] opens the chosen transport (TCP with frame
//! reassembly, or a connected UDP socket). [`ClientSession`] performs the
//! registration handshake and then runs two independent suspension points
//! concurrently: forwarding local input as payload frames and rendering
//! inbound frames as [`ClientEvent`]s. Local input arrives over an `mpsc`
//! channel so a blocking reader (stdin) can live on its own thread and
//! never touch the transport directly.

pub mod session;
pub mod transport;

pub use session::{ClientEvent, ClientSession, is_quit_command};
pub use transport::{ClientError, ClientTransport};
