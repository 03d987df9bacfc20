//! lanrelay client binary.
//!
//! # Usage
//!
//! ```bash
//! lanrelay-client --name Alice --server 127.0.0.1:49152
//! lanrelay-client --name Bob --server 127.0.0.1:49152 --transport udp
//! ```
//!
//! Type to chat; `/quit` or `/exit` leaves.

// The conversation renders on stdout; that is this binary's entire UI.
#![allow(clippy::print_stdout)]

use std::io::BufRead;

use clap::{Parser, ValueEnum};
use lanrelay_client::{ClientEvent, ClientSession, ClientTransport};
use lanrelay_proto::validate_display_name;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Transport selection on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum TransportArg {
    /// Connection-oriented stream transport.
    Tcp,
    /// Connectionless datagram transport.
    Udp,
}

/// Validate the display name at the edge, before touching the network.
fn parse_name(value: &str) -> Result<String, String> {
    let name = value.trim().to_string();
    validate_display_name(&name).map_err(|e| e.to_string())?;
    Ok(name)
}

/// lanrelay chat client
#[derive(Parser, Debug)]
#[command(name = "lanrelay-client")]
#[command(about = "LAN chat client")]
#[command(version)]
struct Args {
    /// Display name (1-15 characters)
    #[arg(short, long, value_parser = parse_name)]
    name: String,

    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:49152")]
    server: String,

    /// Transport to use
    #[arg(short, long, value_enum, default_value_t = TransportArg::Tcp)]
    transport: TransportArg,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let transport = match args.transport {
        TransportArg::Tcp => ClientTransport::connect_tcp(&args.server).await?,
        TransportArg::Udp => ClientTransport::connect_udp(&args.server).await?,
    };

    // Blocking stdin reads cannot share the cooperative scheduler: a
    // dedicated thread reads lines and only hands them back over the
    // channel. Dropping the sender (stdin EOF) acts like /quit.
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if input_tx.send(line).is_err() {
                break;
            }
        }
    });

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let renderer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                ClientEvent::Connected { name } => {
                    println!("--- Connected as {name}. Type /quit or /exit to leave. ---");
                },
                ClientEvent::Message(line) => println!("{line}"),
                ClientEvent::Disconnected => {
                    println!("--- The server closed the connection. ---");
                },
            }
        }
    });

    let session = ClientSession::new(transport, args.name);
    let result = session.run(input_rx, event_tx).await;

    // The session dropped its event sender; the renderer drains and exits.
    renderer.await?;
    result?;

    Ok(())
}
