//! Stream transport: TCP listener and per-connection tasks.
//!
//! One task per accepted connection feeds the shared relay driver; a
//! companion writer task owns the write half and drains a per-session
//! channel. All registry mutation goes through the single driver lock, so
//! the driver itself needs no further synchronization.
//!
//! Teardown is idempotent: an explicit QUIT removes the connection handle
//! and wakes the reader, whose exit path reports `PeerDisconnected` - a
//! no-op if the driver already removed the session.

use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use bytes::BytesMut;
use lanrelay_core::{RelayDriver, RelayEvent};
use lanrelay_proto::LineCodec;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpListener, TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::{Mutex, Notify, mpsc},
};

use crate::{
    error::ServerError,
    fanout::{self, Delivery},
};

/// Opaque per-connection identity for the stream transport.
type ConnectionId = u64;

/// Outbound side of one connection.
struct ConnectionHandle {
    /// Lines queued for the writer task, newline included.
    outbound: mpsc::UnboundedSender<String>,
    /// Wakes the reader so a dropped peer's connection actually closes.
    shutdown: Arc<Notify>,
}

/// State shared by all connection tasks.
struct SharedState {
    /// The relay driver; the single place registry state mutates.
    driver: Mutex<RelayDriver<ConnectionId>>,
    /// Connection id → outbound handle.
    connections: Mutex<HashMap<ConnectionId, ConnectionHandle>>,
}

impl SharedState {
    fn new() -> Self {
        Self { driver: Mutex::new(RelayDriver::new()), connections: Mutex::new(HashMap::new()) }
    }
}

/// Accept connections until the process exits.
pub(crate) async fn run(listener: TcpListener) -> Result<(), ServerError> {
    let state = Arc::new(SharedState::new());
    let next_id = AtomicU64::new(1);

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let id = next_id.fetch_add(1, Ordering::Relaxed);
                let state = Arc::clone(&state);
                tokio::spawn(connection_task(id, stream, peer, state));
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to accept connection");
            },
        }
    }
}

/// Drive one connection from accept to teardown.
async fn connection_task(
    id: ConnectionId,
    stream: TcpStream,
    peer: SocketAddr,
    state: Arc<SharedState>,
) {
    tracing::info!(id, %peer, "client connected");

    let (read_half, write_half) = stream.into_split();
    let (tx, rx) = mpsc::unbounded_channel();
    let shutdown = Arc::new(Notify::new());

    state
        .connections
        .lock()
        .await
        .insert(id, ConnectionHandle { outbound: tx, shutdown: Arc::clone(&shutdown) });
    tokio::spawn(write_loop(id, write_half, rx, Arc::clone(&state)));

    dispatch(&state, RelayEvent::PeerConnected { id, addr: peer }).await;

    read_loop(id, read_half, &shutdown, &state).await;

    remove_handle(&state, id).await;
    dispatch(&state, RelayEvent::PeerDisconnected { id }).await;
    tracing::info!(id, %peer, "client disconnected");
}

/// Read chunks, reassemble frames, feed the driver.
async fn read_loop(
    id: ConnectionId,
    mut read_half: OwnedReadHalf,
    shutdown: &Notify,
    state: &SharedState,
) {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::with_capacity(4096);

    loop {
        tokio::select! {
            () = shutdown.notified() => break,
            result = read_half.read_buf(&mut buf) => match result {
                Ok(0) => break,
                Ok(_) => {
                    let frames = match codec.decode(&buf) {
                        Ok(frames) => frames,
                        Err(e) => {
                            tracing::warn!(id, error = %e, "undecodable input");
                            remove_handle(state, id).await;
                            dispatch(state, RelayEvent::DecodeFailed { id }).await;
                            break;
                        },
                    };
                    buf.clear();
                    for line in frames {
                        dispatch(state, RelayEvent::LineReceived { id, line }).await;
                    }
                },
                Err(e) => {
                    tracing::debug!(id, error = %e, "read error");
                    break;
                },
            },
        }
    }
}

/// Drain the outbound channel onto the socket.
///
/// A failed write is a broken recipient: the session is torn down through
/// the normal termination path and the loop ends. When the channel closes
/// (handle removed), dropping the write half sends FIN.
async fn write_loop(
    id: ConnectionId,
    mut write_half: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<String>,
    state: Arc<SharedState>,
) {
    while let Some(line) = rx.recv().await {
        if let Err(e) = write_half.write_all(line.as_bytes()).await {
            tracing::debug!(id, error = %e, "write failed, tearing session down");
            remove_handle(&state, id).await;
            dispatch(&state, RelayEvent::PeerDisconnected { id }).await;
            break;
        }
    }
}

/// Remove a connection handle and wake its reader. Idempotent.
async fn remove_handle(state: &SharedState, id: ConnectionId) {
    if let Some(handle) = state.connections.lock().await.remove(&id) {
        handle.shutdown.notify_one();
    }
}

/// Feed one event to the driver and execute everything it causes.
///
/// Runs a worklist: a recipient whose channel is gone fails its delivery,
/// gets torn down, and the resulting "left" broadcast is processed in the
/// same call. Fan-out never aborts early - every delivery in a batch is
/// attempted before failures are handled.
async fn dispatch(state: &SharedState, event: RelayEvent<ConnectionId>) {
    let mut events = VecDeque::from([event]);

    while let Some(event) = events.pop_front() {
        let deliveries = {
            let mut driver = state.driver.lock().await;
            let actions = driver.handle(event);
            fanout::resolve(&driver, actions)
        };

        let mut failed = Vec::new();
        {
            let mut connections = state.connections.lock().await;
            for delivery in deliveries {
                match delivery {
                    Delivery::Line { id, line } => {
                        if let Some(handle) = connections.get(&id) {
                            if handle.outbound.send(line).is_err() {
                                failed.push(id);
                            }
                        }
                    },
                    Delivery::Close { id } => {
                        if let Some(handle) = connections.remove(&id) {
                            handle.shutdown.notify_one();
                        }
                    },
                }
            }
            for &id in &failed {
                if let Some(handle) = connections.remove(&id) {
                    handle.shutdown.notify_one();
                }
            }
        }

        for id in failed {
            events.push_back(RelayEvent::PeerDisconnected { id });
        }
    }
}
