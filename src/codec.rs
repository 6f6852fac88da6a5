//! The wire envelope: a 2-byte big-endian command tag followed by a raw
//! payload, with no length prefix. Framing on TCP relies on one envelope
//! fitting in a single `recv()` into [`crate::socket::BUF_SIZE`] (see the
//! design notes in `SPEC_FULL.md` about the fragility of this assumption);
//! framing on UDP relies on datagram boundaries.

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use enum_primitive_derive::Primitive;
use num_traits::FromPrimitive as _;
use std::io::Cursor;

use crate::error::ProtocolError;

/// The command tag carried by a [`NetPacket`]'s `Head` field.
#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Primitive)]
pub enum CommandTag {
    /// Receiver asks the sender for the next chunk (file header or record).
    DataReqt = 0x0001,
    /// Sender's reply carrying the file header or one record.
    DataResp = 0x0002,
    /// UDP handshake: receiver announces the approve count it wants.
    EchoReqt = 0x0010,
    /// UDP handshake: sender's echo reply.
    EchoResp = 0x0011,
    /// Sender announces that the whole file has been sent.
    FileSent = 0x00FF,
}

/// The logical command a received envelope represents: a projection of
/// `Head` down to the three things either state machine reacts to directly.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command {
    /// A `DataReqt`/`DataResp` exchange is in progress.
    Data,
    /// The sender has finished transmitting (`FileSent`).
    Finish,
    /// An unrecognized tag, or one out of place on this connection (e.g. a
    /// stray handshake tag after the handshake completed). Both state
    /// machines simply ignore it and stay in their current recv state.
    Invalid,
}

/// A decoded or to-be-encoded wire envelope. `head` is the raw 16-bit tag
/// value as it appeared on the wire; [`NetPacket::tag`] resolves it to a
/// known [`CommandTag`] when possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetPacket {
    head: u16,
    /// The payload bytes following the tag.
    pub data: Vec<u8>,
}

impl NetPacket {
    /// Builds an envelope with no payload.
    pub fn empty(head: CommandTag) -> Self {
        NetPacket {
            head: head as u16,
            data: Vec::new(),
        }
    }

    /// Builds an envelope carrying `data`.
    pub fn with_data(head: CommandTag, data: Vec<u8>) -> Self {
        NetPacket {
            head: head as u16,
            data,
        }
    }

    /// The raw `Head` value as it appears on the wire.
    pub fn raw_head(&self) -> u16 {
        self.head
    }

    /// Resolves the raw tag to a known [`CommandTag`], or `None` if the wire
    /// value doesn't correspond to any variant.
    pub fn tag(&self) -> Option<CommandTag> {
        CommandTag::from_u16(self.head)
    }

    /// Projects the tag down to the logical [`Command`] both state machines
    /// act on. `DataReqt` and `DataResp` both project to [`Command::Data`];
    /// anything else, known or not, projects to [`Command::Invalid`] except
    /// `FileSent`.
    pub fn command(&self) -> Command {
        match self.tag() {
            Some(CommandTag::DataReqt) | Some(CommandTag::DataResp) => Command::Data,
            Some(CommandTag::FileSent) => Command::Finish,
            _ => Command::Invalid,
        }
    }
}

/// Encodes `packet` into its wire representation: 2 big-endian bytes of
/// `Head`, followed by `Data` verbatim.
pub fn encode(packet: &NetPacket) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + packet.data.len());
    // infallible: writing to a Vec never fails.
    buf.write_u16::<NetworkEndian>(packet.head).unwrap();
    buf.extend_from_slice(&packet.data);
    buf
}

/// Decodes a wire envelope from `buf`. `buf` is expected to contain exactly
/// one envelope (see the framing caveat on this module). A `Head` value not
/// matching any [`CommandTag`] decodes successfully; its [`NetPacket::tag`]
/// is `None` and its [`NetPacket::command`] is [`Command::Invalid`].
pub fn decode(buf: &[u8]) -> Result<NetPacket, ProtocolError> {
    if buf.len() < 2 {
        return Err(ProtocolError::Truncated(buf.len()));
    }

    let head = Cursor::new(buf).read_u16::<NetworkEndian>()?;
    let data = buf[2..].to_vec();

    Ok(NetPacket { head, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn encode_data_reqt_with_no_payload() {
        let packet = NetPacket::empty(CommandTag::DataReqt);
        assert_eq!(encode(&packet), vec![0x00, 0x01]);
    }

    #[test]
    fn decode_file_sent() {
        let packet = decode(&[0x00, 0xFF]).unwrap();
        assert_eq!(packet.tag(), Some(CommandTag::FileSent));
        assert!(packet.data.is_empty());
        assert_eq!(packet.command(), Command::Finish);
    }

    #[test]
    fn round_trip_with_payload() {
        let packet = NetPacket::with_data(CommandTag::DataResp, vec![1, 2, 3, 4]);
        let encoded = encode(&packet);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn truncated_buffer_is_an_error() {
        assert!(matches!(decode(&[0x00]), Err(ProtocolError::Truncated(1))));
        assert!(matches!(decode(&[]), Err(ProtocolError::Truncated(0))));
    }

    #[test]
    fn unknown_head_decodes_as_invalid_command() {
        let packet = decode(&[0x12, 0x34]).unwrap();
        assert_eq!(packet.tag(), None);
        assert_eq!(packet.command(), Command::Invalid);
    }

    #[test]
    fn data_and_finish_project_correctly() {
        assert_eq!(
            NetPacket::empty(CommandTag::DataReqt).command(),
            Command::Data
        );
        assert_eq!(
            NetPacket::empty(CommandTag::DataResp).command(),
            Command::Data
        );
        assert_eq!(
            NetPacket::empty(CommandTag::FileSent).command(),
            Command::Finish
        );
    }
}
