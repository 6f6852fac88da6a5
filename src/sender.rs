//! The sender state machine (the "server" role in the original vocabulary):
//! accepts or binds a socket, hands off to the UDP handshake when needed,
//! then answers each `DataReqt` with the file header followed by one record
//! at a time, paced to approximate the original recording's timing.
//!
//! Grounded in `C_Server.cpp`'s `work()`/`processPacket()`/`loadFile()`.

use std::fs::File;
use std::io::Read;
use std::time::Duration;

use crate::codec::{self, Command, CommandTag, NetPacket};
use crate::config::SenderConfig;
use crate::error::TransferError;
use crate::handshake;
use crate::index::Index;
use crate::lifecycle::StopHandle;
use crate::record::PacketFileHeader;
use crate::socket::{Protocol, TcpTransport, Transport, UdpTransport, BUF_SIZE};

const SETUP_IDLE: Duration = Duration::from_millis(1000);
const IO_IDLE: Duration = Duration::from_millis(10);
const DRAIN_DELAY: Duration = Duration::from_millis(50);
/// The pacing subroutine never lets consecutive records "arrive" faster
/// than this, mirroring `processPacket`'s `nonNullDelay`.
const MIN_PACING_DELAY: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Setup,
    Connect,
    RecvPacket,
    ParsePacket,
    LoadFile,
    SendHeader,
    SendPacket,
    Finish,
}

/// Computes how long to sleep between sending record `idx - 1` and record
/// `idx`, given the previous record's timestamp. Mirrors `processPacket`'s
/// delay computation exactly: if the delta since the previous record is
/// under 10ms, add a flat 10ms on top of it; otherwise sleep exactly the
/// delta, uncapped.
fn pacing_delay(prev_time_ms: u32, this_time_ms: u32) -> Duration {
    let delta = this_time_ms.saturating_sub(prev_time_ms);
    let delta = Duration::from_millis(delta as u64);
    if delta < MIN_PACING_DELAY {
        delta + MIN_PACING_DELAY
    } else {
        delta
    }
}

/// Drives one sender transfer to completion or until `stop` is requested.
/// Blocks the calling thread; intended to be run on a dedicated worker.
pub fn run(config: &SenderConfig, stop: &StopHandle) -> Result<(), TransferError> {
    match config.protocol {
        Protocol::Tcp => run_with(TcpTransport::new("sender"), config, stop),
        Protocol::Udp => run_with(UdpTransport::new("sender"), config, stop),
    }
}

fn run_with<T: Transport>(
    mut transport: T,
    config: &SenderConfig,
    stop: &StopHandle,
) -> Result<(), TransferError> {
    let sink = &config.sink;
    let mut state = State::Setup;
    let mut recv_buf = vec![0u8; BUF_SIZE];

    let mut file_buf: Vec<u8> = Vec::new();
    let mut index: Option<Index> = None;
    let mut header_is_sent = false;
    let mut packet_idx: u32 = 0;
    let mut prev_time: u32 = 0;
    let mut last_packet: Option<NetPacket> = None;

    while stop.is_running() {
        let prev_state = state;
        let mut slept_inline = false;

        state = match state {
            State::Setup => {
                match transport.setup(&config.endpoint) {
                    Ok(()) => {
                        sink.append("sender: socket setup complete");
                        State::Connect
                    }
                    Err(e) => {
                        log::warn!("sender: socket setup error: {e}");
                        State::Setup
                    }
                }
            }
            State::Connect => match transport.connect() {
                Ok(()) => {
                    if matches!(config.protocol, Protocol::Udp) {
                        match handshake::respond(&mut transport) {
                            Ok(()) => {
                                sink.append("sender: connected");
                                State::RecvPacket
                            }
                            Err(e) => {
                                log::warn!("sender: handshake error: {e}");
                                State::Connect
                            }
                        }
                    } else {
                        sink.append("sender: connected");
                        State::RecvPacket
                    }
                }
                Err(_) => State::Connect,
            },
            State::RecvPacket => match transport.recv(&mut recv_buf) {
                Ok(n) => match codec::decode(&recv_buf[..n]) {
                    Ok(packet) => {
                        last_packet = Some(packet);
                        State::ParsePacket
                    }
                    Err(_) => State::RecvPacket,
                },
                Err(_) => State::RecvPacket,
            },
            State::ParsePacket => {
                let packet = last_packet.as_ref().expect("ParsePacket without a received packet");
                if packet.command() == Command::Data {
                    if !header_is_sent {
                        State::LoadFile
                    } else {
                        State::SendPacket
                    }
                } else {
                    State::RecvPacket
                }
            }
            State::LoadFile => {
                // loadFile() is called unconditionally and SendHeader is
                // entered regardless of indexing success: a known source
                // bug, preserved here rather than silently fixed (see
                // SPEC_FULL.md's "do NOT silently fix" list).
                match File::open(&config.file_path) {
                    Ok(mut f) => {
                        file_buf.clear();
                        if let Err(e) = f.read_to_end(&mut file_buf) {
                            log::warn!("sender: failed to read file: {e}");
                        }
                        match Index::build(&file_buf) {
                            Ok(idx) => {
                                sink.append("sender: file indexed");
                                index = Some(idx);
                            }
                            Err(e) => {
                                log::warn!("sender: problem with indexing file: {e}");
                            }
                        }
                    }
                    Err(e) => log::warn!("sender: failed to open file: {e}"),
                }
                State::SendHeader
            }
            State::SendHeader => {
                let header_range = index
                    .as_ref()
                    .map(Index::header_range)
                    .unwrap_or(0..PacketFileHeader::SIZE.min(file_buf.len()));
                let payload = file_buf
                    .get(header_range)
                    .map(|s| s.to_vec())
                    .unwrap_or_default();
                let packet = NetPacket::with_data(CommandTag::DataResp, payload);
                match transport.send(&codec::encode(&packet)) {
                    Ok(()) => {
                        header_is_sent = true;
                        State::RecvPacket
                    }
                    Err(_) => State::SendHeader,
                }
            }
            State::SendPacket => {
                let count = index.as_ref().map(Index::packet_count).unwrap_or(0);
                if packet_idx < count {
                    let idx = index.as_ref().expect("count > 0 implies an index");
                    match idx.packet_header(packet_idx as usize, &file_buf) {
                        Some(record_header) => {
                            let range = idx.packet_range(packet_idx as usize).unwrap_or(0..0);

                            // Sleep first, then send: the pacing delay for record i
                            // must elapse before record i is put on the wire, not
                            // after (see processPacket()'s step order).
                            let delay = pacing_delay(prev_time, record_header.time);
                            std::thread::sleep(delay);
                            slept_inline = true;
                            prev_time = record_header.time;

                            let payload = file_buf[range].to_vec();
                            let packet = NetPacket::with_data(CommandTag::DataResp, payload);
                            match transport.send(&codec::encode(&packet)) {
                                Ok(()) => {
                                    sink.append(&format!("sender: sent packet #{packet_idx}"));
                                    packet_idx += 1;
                                    State::SendPacket
                                }
                                Err(_) => {
                                    log::warn!("sender: packet at index {packet_idx} is not sent");
                                    State::RecvPacket
                                }
                            }
                        }
                        None => {
                            log::warn!("sender: packet at index {packet_idx} has no header");
                            State::RecvPacket
                        }
                    }
                } else {
                    State::Finish
                }
            }
            State::Finish => {
                let packet = NetPacket::empty(CommandTag::FileSent);
                if transport.send(&codec::encode(&packet)).is_ok() {
                    std::thread::sleep(DRAIN_DELAY);
                    sink.append("sender: file is sent");
                    transport.close();
                    return Ok(());
                }
                State::Finish
            }
        };

        if state == prev_state && !slept_inline {
            let sleep_time = match state {
                State::Setup | State::Connect => SETUP_IDLE,
                _ => IO_IDLE,
            };
            std::thread::sleep(sleep_time);
        }
    }

    transport.close();
    sink.append("sender: stopped");
    Ok(())
}
