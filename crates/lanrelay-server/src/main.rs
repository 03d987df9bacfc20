//! lanrelay server binary.
//!
//! # Usage
//!
//! ```bash
//! # TCP relay on the default port
//! lanrelay-server --bind 127.0.0.1:49152
//!
//! # UDP relay
//! lanrelay-server --bind 127.0.0.1:49152 --transport udp
//! ```

use clap::{Parser, ValueEnum};
use lanrelay_server::{Server, ServerConfig, TransportKind};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Transport selection on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum TransportArg {
    /// Connection-oriented stream transport.
    Tcp,
    /// Connectionless datagram transport.
    Udp,
}

impl From<TransportArg> for TransportKind {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Tcp => Self::Tcp,
            TransportArg::Udp => Self::Udp,
        }
    }
}

/// lanrelay chat relay server
#[derive(Parser, Debug)]
#[command(name = "lanrelay-server")]
#[command(about = "LAN chat relay server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1:49152")]
    bind: String,

    /// Transport to serve
    #[arg(short, long, value_enum, default_value_t = TransportArg::Tcp)]
    transport: TransportArg,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("lanrelay server starting");

    let config = ServerConfig { bind_address: args.bind, transport: args.transport.into() };
    let server = Server::bind(config).await?;

    tracing::info!(
        "Server listening on {} ({:?})",
        server.local_addr()?,
        args.transport,
    );

    server.run().await?;

    Ok(())
}
