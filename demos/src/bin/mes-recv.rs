//! Connects to (TCP) or handshakes with (UDP) a sender and writes the
//! received `.mes` record file to disk.
//!
//! ```text
//! $ mes-recv --proto tcp --endpoint 0.0.0.0:0 127.0.0.1:9000 received.mes
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use mes_transport::{receiver, Protocol, ReceiverConfig, StopHandle};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProtoArg {
    Tcp,
    Udp,
}

/// Receives a `.mes` record file from a single sender.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Which transport to connect with.
    #[arg(long, value_enum, default_value_t = ProtoArg::Tcp)]
    proto: ProtoArg,

    /// Local endpoint and, for UDP, the remote peer, e.g.
    /// `0.0.0.0:0 127.0.0.1:9000`.
    #[arg(long)]
    endpoint: String,

    /// Where to write the received file.
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let protocol = match args.proto {
        ProtoArg::Tcp => Protocol::Tcp,
        ProtoArg::Udp => Protocol::Udp,
    };

    let config = ReceiverConfig::new(protocol, args.endpoint, args.output);
    let stop = StopHandle::new();

    receiver::run(&config, &stop).context("receiver failed")?;
    Ok(())
}
