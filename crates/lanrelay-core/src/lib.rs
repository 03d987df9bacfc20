//! Transport-agnostic relay logic for the lanrelay chat relay.
//!
//! The [`RelayDriver`] follows an event/action pattern: the runtime feeds it
//! events (peer contact, decoded frames, transport loss) and executes the
//! actions it returns (send, broadcast, drop). The driver performs no I/O
//! and holds the only mutable registry state, so a single-task runtime needs
//! no locking and a multi-task runtime needs exactly one lock around the
//! driver.
//!
//! The driver is generic over the identity key: the stream runtime keys
//! sessions by a runtime-assigned connection id, the datagram runtime by the
//! packet source address.

pub mod driver;
pub mod registry;

pub use driver::{RelayAction, RelayDriver, RelayEvent};
pub use registry::{ParticipantSession, SessionRegistry};
