//! Client session: registration handshake, then two concurrent waits.
//!
//! After sending the registration frame the session selects over local
//! input and inbound frames, so broadcasts keep rendering while the user is
//! typing. Local quit shortcuts (`/quit`, `/exit`) are translated to the
//! wire QUIT frame; they never travel as-is. Transport loss from the server
//! surfaces [`ClientEvent::Disconnected`] and stops both waits.

use lanrelay_proto::ClientFrame;
use tokio::sync::mpsc;

use crate::transport::{ClientError, ClientTransport};

/// Events the session emits for the front end to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Transport is open and the registration frame has been sent.
    Connected {
        /// The display name we registered with.
        name: String,
    },

    /// One inbound frame (notice or relayed chat line).
    Message(String),

    /// The server closed the connection; the session is over.
    Disconnected,
}

/// Whether a local input line is a quit shortcut.
pub fn is_quit_command(text: &str) -> bool {
    text.eq_ignore_ascii_case("/quit") || text.eq_ignore_ascii_case("/exit")
}

/// One client session over an open transport.
pub struct ClientSession {
    transport: ClientTransport,
    name: String,
}

impl ClientSession {
    /// Wrap an open transport with a display name to register.
    pub fn new(transport: ClientTransport, name: impl Into<String>) -> Self {
        Self { transport, name: name.into() }
    }

    /// Run the session until quit or server loss.
    ///
    /// `input` carries local lines from a front-end worker (e.g. a blocking
    /// stdin thread); `events` receives everything to render. The input
    /// worker never touches the transport - its only handoff is this
    /// channel. Closing the input channel behaves like `/quit`.
    pub async fn run(
        mut self,
        mut input: mpsc::UnboundedReceiver<String>,
        events: mpsc::UnboundedSender<ClientEvent>,
    ) -> Result<(), ClientError> {
        self.transport.send(&ClientFrame::Register { name: self.name.clone() }).await?;
        let _ = events.send(ClientEvent::Connected { name: self.name.clone() });

        loop {
            tokio::select! {
                inbound = self.transport.recv() => match inbound? {
                    Some(line) => {
                        let _ = events.send(ClientEvent::Message(line));
                    },
                    None => {
                        tracing::info!("server closed the connection");
                        let _ = events.send(ClientEvent::Disconnected);
                        break;
                    },
                },
                local = input.recv() => {
                    let text = local.unwrap_or_else(|| "/quit".to_string());
                    let text = text.trim();

                    if is_quit_command(text) {
                        self.transport.send(&ClientFrame::Quit).await?;
                        break;
                    }
                    if !text.is_empty() {
                        self.transport.send(&ClientFrame::Chat { text: text.to_string() }).await?;
                    }
                },
            }
        }

        Ok(())
    }
}
