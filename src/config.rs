//! Bundles the parameters a caller needs to start a sender or receiver, so
//! they are not required to hand-construct a socket and indexer themselves.
//! An ergonomic layer over the raw state machines in [`crate::sender`] and
//! [`crate::receiver`].

use std::path::PathBuf;
use std::sync::Arc;

use crate::log_sink::{LogCrateSink, LogSink};
use crate::socket::Protocol;

/// Parameters for a sender (the "server" role in the original vocabulary):
/// which protocol and endpoint to listen on, and which file to stream.
#[derive(Clone)]
pub struct SenderConfig {
    /// TCP or UDP.
    pub protocol: Protocol,
    /// The endpoint configuration string (see [`crate::endpoint`]).
    pub endpoint: String,
    /// Path to the `.mes` file to stream.
    pub file_path: PathBuf,
    /// Where diagnostic lines are published.
    pub sink: Arc<dyn LogSink>,
}

impl std::fmt::Debug for SenderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenderConfig")
            .field("protocol", &self.protocol)
            .field("endpoint", &self.endpoint)
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

impl SenderConfig {
    /// Builds a config with the default [`LogCrateSink`].
    pub fn new(protocol: Protocol, endpoint: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        SenderConfig {
            protocol,
            endpoint: endpoint.into(),
            file_path: file_path.into(),
            sink: Arc::new(LogCrateSink),
        }
    }

    /// Returns `self` with a different log sink.
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }
}

/// Parameters for a receiver (the "client" role): which protocol and
/// endpoint to connect to, and where to write the received file.
#[derive(Clone)]
pub struct ReceiverConfig {
    /// TCP or UDP.
    pub protocol: Protocol,
    /// The endpoint configuration string (see [`crate::endpoint`]).
    pub endpoint: String,
    /// Path the received file is written to.
    pub output_path: PathBuf,
    /// Where diagnostic lines are published.
    pub sink: Arc<dyn LogSink>,
}

impl std::fmt::Debug for ReceiverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverConfig")
            .field("protocol", &self.protocol)
            .field("endpoint", &self.endpoint)
            .field("output_path", &self.output_path)
            .finish_non_exhaustive()
    }
}

impl ReceiverConfig {
    /// Builds a config with the default [`LogCrateSink`].
    pub fn new(
        protocol: Protocol,
        endpoint: impl Into<String>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        ReceiverConfig {
            protocol,
            endpoint: endpoint.into(),
            output_path: output_path.into(),
            sink: Arc::new(LogCrateSink),
        }
    }

    /// Returns `self` with a different log sink.
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }
}
