//! Parses the configuration strings that describe one or two socket
//! endpoints and a blocking mode.
//!
//! Grammar (informal):
//!
//! ```text
//! config := endpoint (WS endpoint)? (WS "mode=" ("blocking"|"nonblocking"))?
//! endpoint := addr ":" port
//! ```
//!
//! A single endpoint describes a server (listening) bind address; two
//! endpoints describe a client, with the first naming the local bind and the
//! second the remote peer. The blocking mode, when given, applies to every
//! endpoint in the string.

use crate::error::EndpointError;

/// Whether a socket should block on I/O calls or return immediately.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SocketMode {
    /// I/O calls block until they can complete.
    Blocking,
    /// I/O calls return immediately, signaling "would block" as needed.
    NonBlocking,
}

impl Default for SocketMode {
    fn default() -> Self {
        SocketMode::Blocking
    }
}

/// A single parsed endpoint: an address, a port, and the blocking mode that
/// applies to the socket using it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// The textual address, e.g. `"127.0.0.1"`.
    pub addr: String,
    /// The port number.
    pub port: u16,
    /// The blocking mode in effect for this endpoint.
    pub mode: SocketMode,
}

/// Whether a configuration string names one endpoint (server/listener) or
/// two (client: local then peer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointConfig {
    /// A single local bind address.
    Server(Endpoint),
    /// A local bind address and a remote peer address.
    Client(Endpoint, Endpoint),
}

impl EndpointConfig {
    /// The local endpoint to bind: the only one for `Server`, the first for
    /// `Client`.
    pub fn local(&self) -> &Endpoint {
        match self {
            EndpointConfig::Server(e) => e,
            EndpointConfig::Client(local, _) => local,
        }
    }

    /// The remote peer endpoint, if this is a client configuration.
    pub fn peer(&self) -> Option<&Endpoint> {
        match self {
            EndpointConfig::Server(_) => None,
            EndpointConfig::Client(_, peer) => Some(peer),
        }
    }
}

/// Parses a configuration string into one or two endpoints and a blocking
/// mode. The mode, if present anywhere in the string, applies to all
/// endpoints named by it.
pub fn parse(config: &str) -> Result<EndpointConfig, EndpointError> {
    let mode = if config.contains("nonblocking") {
        SocketMode::NonBlocking
    } else {
        SocketMode::Blocking
    };

    // Anything from the first occurrence of "mode" onward is the mode
    // clause, not an endpoint.
    let addr_part = match config.find("mode") {
        Some(idx) => &config[..idx],
        None => config,
    };

    let tokens: Vec<&str> = addr_part.split_whitespace().collect();
    if tokens.is_empty() {
        return Err(EndpointError::Empty);
    }
    if tokens.len() > 2 {
        return Err(EndpointError::TooManyEndpoints(tokens.len()));
    }

    let mut endpoints = Vec::with_capacity(tokens.len());
    for token in tokens {
        endpoints.push(parse_one(token, mode)?);
    }

    if endpoints.len() == 1 {
        Ok(EndpointConfig::Server(endpoints.remove(0)))
    } else {
        let peer = endpoints.remove(1);
        let local = endpoints.remove(0);
        Ok(EndpointConfig::Client(local, peer))
    }
}

fn parse_one(token: &str, mode: SocketMode) -> Result<Endpoint, EndpointError> {
    let (addr, port_str) = token
        .rsplit_once(':')
        .ok_or_else(|| EndpointError::MissingPort(token.to_string()))?;

    let port: u16 = port_str
        .parse()
        .map_err(|e| EndpointError::InvalidPort(token.to_string(), e))?;

    Ok(Endpoint {
        addr: addr.to_string(),
        port,
        mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_endpoint_defaults_to_blocking_server() {
        let cfg = parse("127.0.0.1:9000").unwrap();
        match cfg {
            EndpointConfig::Server(e) => {
                assert_eq!(e.addr, "127.0.0.1");
                assert_eq!(e.port, 9000);
                assert_eq!(e.mode, SocketMode::Blocking);
            }
            _ => panic!("expected a server config"),
        }
    }

    #[test]
    fn two_endpoints_parse_as_client() {
        let cfg = parse("127.0.0.1:9000 127.0.0.1:9001").unwrap();
        match cfg {
            EndpointConfig::Client(local, peer) => {
                assert_eq!(local.port, 9000);
                assert_eq!(peer.port, 9001);
            }
            _ => panic!("expected a client config"),
        }
    }

    #[test]
    fn nonblocking_mode_applies_to_all_endpoints() {
        let cfg = parse("127.0.0.1:9000 127.0.0.1:9001 mode=nonblocking").unwrap();
        match cfg {
            EndpointConfig::Client(local, peer) => {
                assert_eq!(local.mode, SocketMode::NonBlocking);
                assert_eq!(peer.mode, SocketMode::NonBlocking);
            }
            _ => panic!("expected a client config"),
        }
    }

    #[test]
    fn missing_port_is_an_error() {
        assert!(matches!(
            parse("127.0.0.1"),
            Err(EndpointError::MissingPort(_))
        ));
    }

    #[test]
    fn three_endpoints_is_an_error() {
        assert!(matches!(
            parse("a:1 b:2 c:3"),
            Err(EndpointError::TooManyEndpoints(3))
        ));
    }

    #[test]
    fn empty_string_is_an_error() {
        assert!(matches!(parse(""), Err(EndpointError::Empty)));
    }
}
