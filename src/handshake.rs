//! The UDP session handshake: since UDP has no connection setup of its own,
//! the receiver (initiator) and sender (responder) exchange a quorum of
//! echo request/response envelopes before record streaming begins.
//!
//! Grounded in `C_Client.cpp::udpConHandler` (initiator) and
//! `C_Server.cpp::udpConHandler` (responder) in the original implementation.
//! Neither side is cancellable once the handshake starts, and neither caps
//! the number of attempts — both are known limitations carried over
//! unchanged (see the "do NOT silently fix" list in `SPEC_FULL.md`).

use std::time::Duration;

use crate::codec::{self, CommandTag, NetPacket};
use crate::error::SocketError;
use crate::socket::{Transport, BUF_SIZE};

/// Idle delay between handshake attempts, on both sides.
const IDLE: Duration = Duration::from_millis(100);

/// Default number of echo exchanges the initiator requires before declaring
/// the session up.
pub const DEFAULT_APPROVE_COUNT: u8 = 3;

/// Runs the initiator side of the handshake (the receiver's role): sends
/// `EchoReqt` carrying `approve_count`, then waits for `approve_count`
/// `EchoResp` replies, resending `EchoReqt` between waits. Blocks until the
/// quorum is reached; there is no attempt cap.
pub fn initiate<T: Transport>(transport: &mut T, approve_count: u8) -> Result<(), SocketError> {
    let mut confirmed = 0u8;
    let mut buf = [0u8; BUF_SIZE];

    while confirmed < approve_count {
        let reqt = NetPacket::with_data(CommandTag::EchoReqt, vec![approve_count]);
        if transport.send(&codec::encode(&reqt)).is_err() {
            std::thread::sleep(IDLE);
            continue;
        }

        match transport.recv(&mut buf) {
            Ok(n) => {
                if let Ok(packet) = codec::decode(&buf[..n]) {
                    if packet.tag() == Some(CommandTag::EchoResp) {
                        confirmed += 1;
                        log::debug!("handshake: received echo {confirmed}/{approve_count}");
                        continue;
                    }
                }
                std::thread::sleep(IDLE);
            }
            Err(_) => std::thread::sleep(IDLE),
        }
    }

    log::info!("handshake: connected after {confirmed} echoes");
    Ok(())
}

/// Runs the responder side of the handshake (the sender's role): waits for
/// an `EchoReqt`, reads the desired approve count from its payload's first
/// byte, then replies with bare `EchoResp` envelopes until it has sent that
/// many. Blocks until the quorum is reached; there is no attempt cap.
pub fn respond<T: Transport>(transport: &mut T) -> Result<(), SocketError> {
    let mut buf = [0u8; BUF_SIZE];
    let approve_count = loop {
        match transport.recv(&mut buf) {
            Ok(n) => {
                if let Ok(packet) = codec::decode(&buf[..n]) {
                    if packet.tag() == Some(CommandTag::EchoReqt) {
                        break packet.data.first().copied().unwrap_or(DEFAULT_APPROVE_COUNT);
                    }
                }
                std::thread::sleep(IDLE);
            }
            Err(_) => std::thread::sleep(IDLE),
        }
    };

    let mut sent = 0u8;
    while sent < approve_count {
        if transport
            .send(&codec::encode(&NetPacket::empty(CommandTag::EchoResp)))
            .is_err()
        {
            std::thread::sleep(IDLE);
            continue;
        }
        sent += 1;
        log::debug!("handshake: sent echo {sent}/{approve_count}");
        std::thread::sleep(IDLE);
    }

    log::info!("handshake: connected after sending {sent} echoes");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::UdpTransport;
    use rand::Rng;

    fn free_port() -> u16 {
        rand::rng().random_range(20000..60000)
    }

    #[test]
    fn handshake_reaches_quorum_on_loopback() {
        let server_port = free_port();
        let client_port = free_port();

        let mut responder = UdpTransport::new("sender");
        responder
            .setup(&format!("127.0.0.1:{server_port}"))
            .unwrap();

        let mut initiator = UdpTransport::new("receiver");
        initiator
            .setup(&format!(
                "127.0.0.1:{client_port} 127.0.0.1:{server_port}"
            ))
            .unwrap();

        let responder_thread = std::thread::spawn(move || {
            respond(&mut responder).unwrap();
        });

        initiate(&mut initiator, 3).unwrap();
        responder_thread.join().unwrap();
    }
}
