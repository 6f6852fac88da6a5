//! Streams a `.mes` record file to a connected (TCP) or handshaken (UDP)
//! peer.
//!
//! ```text
//! $ mes-send --proto tcp --endpoint 0.0.0.0:9000 recording.mes
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use mes_transport::{sender, Protocol, SenderConfig, StopHandle};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProtoArg {
    Tcp,
    Udp,
}

/// Sends a `.mes` record file to a single receiver.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Which transport to listen on.
    #[arg(long, value_enum, default_value_t = ProtoArg::Tcp)]
    proto: ProtoArg,

    /// Local endpoint to bind, e.g. `0.0.0.0:9000`.
    #[arg(long)]
    endpoint: String,

    /// The `.mes` file to stream.
    file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let protocol = match args.proto {
        ProtoArg::Tcp => Protocol::Tcp,
        ProtoArg::Udp => Protocol::Udp,
    };

    let config = SenderConfig::new(protocol, args.endpoint, args.file);
    let stop = StopHandle::new();

    sender::run(&config, &stop).context("sender failed")?;
    Ok(())
}
