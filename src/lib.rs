//! A record-file transport engine: streams a time-stamped binary record
//! file from a sender to a receiver over TCP or UDP, including a hand-rolled
//! session handshake for UDP and pacing that approximates the original
//! recording's timing.

#![warn(
    anonymous_parameters,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    single_use_lifetimes,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_qualifications,
    variant_size_differences
)]

pub mod codec;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod handshake;
pub mod index;
pub mod lifecycle;
pub mod log_sink;
pub mod receiver;
pub mod record;
pub mod sender;
pub mod socket;

pub use config::{ReceiverConfig, SenderConfig};
pub use error::TransferError;
pub use lifecycle::StopHandle;
pub use log_sink::LogSink;
pub use socket::Protocol;
