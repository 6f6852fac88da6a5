//! Typed errors for each layer of the transport: wire framing, the record-file
//! indexer, and the socket abstraction.

use thiserror::Error;

/// Errors raised while encoding or decoding the wire envelope.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A buffer was too short to contain even the 2-byte `Head` field.
    #[error("buffer too short to contain a packet head: {0} bytes")]
    Truncated(usize),
    /// An I/O error occurred while reading or writing an envelope.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while indexing a record file.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The stream could not be read into memory.
    #[error("failed to read stream into buffer: {0}")]
    Io(#[from] std::io::Error),
    /// The buffer is shorter than a file header.
    #[error("buffer ({0} bytes) is shorter than a file header ({1} bytes)")]
    ShortHeader(usize, usize),
    /// A record's cumulative byte range would run past the end of the buffer.
    #[error("record {index} overruns buffer: cumulative offset {offset} exceeds buffer size {buffer_size}")]
    Overrun {
        /// Index of the offending record.
        index: usize,
        /// Cumulative byte offset that would result.
        offset: usize,
        /// Size of the in-memory buffer.
        buffer_size: usize,
    },
}

/// Errors raised while parsing an endpoint configuration string.
#[derive(Error, Debug)]
pub enum EndpointError {
    /// The configuration string contained no endpoints.
    #[error("configuration string is empty")]
    Empty,
    /// More than two endpoints were given.
    #[error("configuration string names {0} endpoints, at most 2 are supported")]
    TooManyEndpoints(usize),
    /// An endpoint token had no `:` separator.
    #[error("endpoint {0:?} is missing a ':' port separator")]
    MissingPort(String),
    /// The port could not be parsed as a `u16`.
    #[error("invalid port in endpoint {0:?}: {1}")]
    InvalidPort(String, std::num::ParseIntError),
}

/// Errors raised by the socket abstraction.
#[derive(Error, Debug)]
pub enum SocketError {
    /// The configuration string could not be parsed.
    #[error("invalid endpoint configuration: {0}")]
    Endpoint(#[from] EndpointError),
    /// An I/O error occurred during a socket operation.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A send accepted fewer bytes than were given to it.
    #[error("short write: sent {sent} of {total} bytes")]
    ShortWrite {
        /// Bytes actually accepted by the OS.
        sent: usize,
        /// Bytes that were supposed to be sent.
        total: usize,
    },
    /// The peer closed its end of the connection.
    #[error("connection closed by peer")]
    ConnectionClosed,
}

/// The top-level error a transfer can fail with, composed from the
/// lower-level errors of each layer.
#[derive(Error, Debug)]
pub enum TransferError {
    /// A framing/codec error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// An indexer error.
    #[error(transparent)]
    Index(#[from] IndexError),
    /// A socket-layer error.
    #[error(transparent)]
    Socket(#[from] SocketError),
    /// A plain I/O error not otherwise classified (e.g. opening the output file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
