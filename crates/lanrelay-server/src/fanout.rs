//! Action resolution: relay actions → concrete per-recipient deliveries.
//!
//! Resolution must happen while the driver is still held (or on the task
//! that owns it) so broadcast recipients come from the same registry
//! snapshot the event mutated. The transports then perform the writes with
//! no driver access at all.

use std::hash::Hash;

use lanrelay_core::{RelayAction, RelayDriver};

/// One concrete delivery step for a transport to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Delivery<I> {
    /// Write one newline-terminated line to a single recipient.
    Line {
        /// Recipient identity.
        id: I,
        /// Wire text, newline included.
        line: String,
    },

    /// Close the recipient's endpoint (stream transport only; the datagram
    /// transport has no connection to close).
    Close {
        /// Identity to close.
        id: I,
    },
}

/// Expand actions into deliveries against the driver's current registry
/// snapshot.
pub(crate) fn resolve<I: Copy + Eq + Hash + std::fmt::Debug>(
    driver: &RelayDriver<I>,
    actions: Vec<RelayAction<I>>,
) -> Vec<Delivery<I>> {
    let mut deliveries = Vec::new();

    for action in actions {
        match action {
            RelayAction::Send { id, notice } => {
                deliveries.push(Delivery::Line { id, line: notice.to_wire() });
            },
            RelayAction::Broadcast { notice, exclude } => {
                let line = notice.to_wire();
                for id in driver.registered_ids() {
                    if Some(id) != exclude {
                        deliveries.push(Delivery::Line { id, line: line.clone() });
                    }
                }
            },
            RelayAction::DropPeer { id } => deliveries.push(Delivery::Close { id }),
        }
    }

    deliveries
}
