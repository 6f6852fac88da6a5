//! The receiver state machine (the "client" role in the original
//! vocabulary): connects or completes the UDP handshake, then drives the
//! transfer by requesting one record at a time and persisting each to disk
//! as it arrives.
//!
//! Grounded in `C_Client.cpp`'s `work()`/`writeHeader()`/`writePacket()`/`openFile()`.

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::time::Duration;

use crate::codec::{self, Command, CommandTag, NetPacket};
use crate::config::ReceiverConfig;
use crate::error::TransferError;
use crate::handshake;
use crate::lifecycle::StopHandle;
use crate::record::PacketFileHeader;
use crate::socket::{Protocol, TcpTransport, Transport, UdpTransport, BUF_SIZE};

const SETUP_IDLE: Duration = Duration::from_millis(1000);
const IO_IDLE: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Setup,
    Connect,
    SendPacket,
    RecvPacket,
    ParseComand,
    WriteHeader,
    WritePacket,
    Finish,
}

/// Drives one receiver transfer to completion or until `stop` is requested.
/// Blocks the calling thread; intended to be run on a dedicated worker.
pub fn run(config: &ReceiverConfig, stop: &StopHandle) -> Result<(), TransferError> {
    match config.protocol {
        Protocol::Tcp => run_with(TcpTransport::new("receiver"), config, stop),
        Protocol::Udp => run_with(UdpTransport::new("receiver"), config, stop),
    }
}

fn run_with<T: Transport>(
    mut transport: T,
    config: &ReceiverConfig,
    stop: &StopHandle,
) -> Result<(), TransferError> {
    let sink = &config.sink;
    let mut state = State::Setup;
    let mut recv_buf = vec![0u8; BUF_SIZE];
    let mut last_packet: Option<NetPacket> = None;

    let mut out_file: Option<std::fs::File> = None;
    let mut recv_counter: u64 = 0;

    while stop.is_running() {
        let prev_state = state;

        state = match state {
            State::Setup => match transport.setup(&config.endpoint) {
                Ok(()) => {
                    sink.append("receiver: socket setup complete");
                    State::Connect
                }
                Err(e) => {
                    log::warn!("receiver: socket setup error: {e}");
                    State::Setup
                }
            },
            State::Connect => match transport.connect() {
                Ok(()) => {
                    if matches!(config.protocol, Protocol::Udp) {
                        match handshake::initiate(&mut transport, handshake::DEFAULT_APPROVE_COUNT) {
                            Ok(()) => {
                                sink.append("receiver: connected");
                                State::SendPacket
                            }
                            Err(e) => {
                                log::warn!("receiver: handshake error: {e}");
                                State::Connect
                            }
                        }
                    } else {
                        sink.append("receiver: connected");
                        State::SendPacket
                    }
                }
                Err(_) => State::Connect,
            },
            State::SendPacket => {
                let packet = NetPacket::empty(CommandTag::DataReqt);
                match transport.send(&codec::encode(&packet)) {
                    Ok(()) => State::RecvPacket,
                    Err(_) => State::SendPacket,
                }
            }
            State::RecvPacket => match transport.recv(&mut recv_buf) {
                Ok(n) => match codec::decode(&recv_buf[..n]) {
                    Ok(packet) => {
                        recv_counter += 1;
                        last_packet = Some(packet);
                        State::ParseComand
                    }
                    Err(_) => State::RecvPacket,
                },
                Err(_) => State::RecvPacket,
            },
            State::ParseComand => {
                let packet = last_packet
                    .as_ref()
                    .expect("ParseComand without a received packet");
                if packet.command() == Command::Finish {
                    sink.append("receiver: finish packet was received");
                    State::Finish
                } else if recv_counter == 1 {
                    State::WriteHeader
                } else {
                    State::WritePacket
                }
            }
            State::WriteHeader => {
                match open_output(&config.output_path) {
                    Ok(file) => {
                        sink.append("receiver: file open status: true");
                        out_file = file;
                    }
                    Err(e) => {
                        log::warn!("receiver: error while opening file: {e}");
                        out_file = None;
                    }
                }

                if let (Some(file), Some(packet)) = (out_file.as_mut(), last_packet.as_ref()) {
                    let n = PacketFileHeader::SIZE.min(packet.data.len());
                    if let Err(e) = file.write_all(&packet.data[..n]) {
                        log::warn!("receiver: error while writing file header: {e}");
                    }
                } else {
                    log::warn!("receiver: error while opening file");
                }
                State::SendPacket
            }
            State::WritePacket => {
                if let (Some(file), Some(packet)) = (out_file.as_mut(), last_packet.as_ref()) {
                    sink.append(&format!(
                        "receiver: received packet #{} with size: {}",
                        recv_counter - 1,
                        packet.data.len()
                    ));
                    if let Err(e) = file.write_all(&packet.data) {
                        log::warn!("receiver: error while writing packet: {e}");
                    }
                }
                State::SendPacket
            }
            State::Finish => {
                sink.append("receiver: stopped");
                if let Some(mut file) = out_file.take() {
                    let _ = file.flush();
                }
                transport.close();
                return Ok(());
            }
        };

        if state == prev_state {
            let sleep_time = match state {
                State::Setup | State::Connect => SETUP_IDLE,
                _ => IO_IDLE,
            };
            std::thread::sleep(sleep_time);
        }
    }

    transport.close();
    sink.append("receiver: stopped");
    Ok(())
}

/// Opens `path` for writing: truncates any existing content, then reopens
/// in append mode and seeks back to the start, mirroring `openFile`'s
/// truncate-then-reopen-append pattern.
fn open_output(path: &std::path::Path) -> std::io::Result<Option<std::fs::File>> {
    OpenOptions::new().write(true).create(true).truncate(true).open(path)?;

    let mut file = OpenOptions::new().append(true).open(path)?;
    file.seek(SeekFrom::Start(0))?;
    Ok(Some(file))
}
