//! A uniform socket abstraction over TCP and UDP, covering setup, the
//! client/server role split, and send/recv.
//!
//! This flattens the three-level inheritance of the source implementation
//! (`I_Socket` ← `C_Socket` ← `{C_TcpSocket, C_UdpSocket}`) into a single
//! [`Transport`] trait with two implementations sharing a setup helper —
//! see the design notes in `SPEC_FULL.md`. Built on `std::net` rather than
//! an event-driven reactor crate, since the per-endpoint
//! [`SocketMode::NonBlocking`]/[`SocketMode::Blocking`] split this transport
//! needs cannot be expressed by an always-non-blocking socket type; see
//! `DESIGN.md` for that dependency decision. Binding, `SO_REUSEADDR`, the
//! TCP server role's zeroed send buffer, and the TCP client role's
//! bind-before-connect all go through `socket2`, since `std::net` exposes
//! none of them.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::time::Duration;

use socket2::{Domain, SockRef, Socket, Type};

use crate::endpoint::{self, EndpointConfig, SocketMode};
use crate::error::SocketError;

/// Listen backlog passed to `listen()` for the TCP server role.
const LISTEN_BACKLOG: i32 = 128;

/// Builds a TCP listener bound to `addr`, with `SO_REUSEADDR` set before
/// bind (`std::net::TcpListener` offers no way to set socket options prior
/// to binding).
fn bind_tcp_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    Ok(socket.into())
}

/// Binds a TCP socket to `local` (with `SO_REUSEADDR`) and connects it to
/// `peer`, so the client role's local endpoint from the configuration
/// string is actually honored rather than left to an OS-chosen ephemeral
/// port (`TcpStream::connect` alone cannot bind a specific local address).
fn bind_and_connect_tcp(local: SocketAddr, peer: SocketAddr) -> std::io::Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(local), Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&local.into())?;
    socket.connect(&peer.into())?;
    Ok(socket.into())
}

/// Binds a UDP socket to `addr` with `SO_REUSEADDR` set before bind.
fn bind_udp_socket(addr: SocketAddr) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    Ok(socket.into())
}

/// Receive/send buffer size shared by both transports. Large enough to hold
/// one envelope carrying a file header or a single record, assuming the
/// one-envelope-per-`recv` framing this protocol relies on (see the TCP
/// framing design note in `SPEC_FULL.md`).
pub const BUF_SIZE: usize = 8 * 1024;

/// Which protocol a [`Transport`] speaks.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Protocol {
    /// Connection-oriented, reliable, ordered.
    Tcp,
    /// Connectionless; reliability and ordering are not provided by the
    /// transport and must be negotiated at the application layer (see
    /// [`crate::handshake`]).
    Udp,
}

/// Whether a socket is acting as the connection acceptor (one endpoint
/// configured) or initiator (two endpoints configured).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SocketRole {
    /// Binds and listens/receives on its only configured endpoint.
    Server,
    /// Binds its first endpoint locally and connects to its second.
    Client,
}

/// Operations common to both transports: open, configure, connect,
/// exchange bytes, and close. Mirrors the original `I_Socket` interface,
/// flattened to one trait instead of an inheritance chain.
pub trait Transport {
    /// Parses `config`, binds the local endpoint, and remembers the peer
    /// endpoint if this is a client.
    fn setup(&mut self, config: &str) -> Result<(), SocketError>;

    /// Establishes the connection: for TCP, `connect()` (client) or
    /// `listen()`+`accept()` (server); for UDP, a no-op (use
    /// [`crate::handshake`] to negotiate a session).
    fn connect(&mut self) -> Result<(), SocketError>;

    /// Sends `buf` in its entirety. A short write is reported as
    /// [`SocketError::ShortWrite`], matching the source's all-or-nothing
    /// send contract.
    fn send(&mut self, buf: &[u8]) -> Result<(), SocketError>;

    /// Receives into `buf`, returning the number of bytes read. A
    /// zero-length read is reported as [`SocketError::ConnectionClosed`].
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, SocketError>;

    /// Releases the socket. Idempotent.
    fn close(&mut self);

    /// A human-readable label for log lines, e.g. `"[sender 0.0.0.0:9000]"`.
    fn name(&self) -> String;
}

fn parse_role(config: &str) -> Result<(EndpointConfig, SocketRole), SocketError> {
    let parsed = endpoint::parse(config)?;
    let role = match parsed {
        EndpointConfig::Server(_) => SocketRole::Server,
        EndpointConfig::Client(..) => SocketRole::Client,
    };
    Ok((parsed, role))
}

fn socket_addr(addr: &str, port: u16) -> Result<SocketAddr, SocketError> {
    format!("{addr}:{port}")
        .parse()
        .map_err(|_| SocketError::Endpoint(crate::error::EndpointError::MissingPort(addr.into())))
}

/// A TCP [`Transport`]. Holds a listener while acting as a server (until a
/// client is accepted) and the live stream once connected.
#[derive(Debug, Default)]
pub struct TcpTransport {
    label: String,
    role: Option<SocketRole>,
    listener: Option<TcpListener>,
    stream: Option<TcpStream>,
    /// The client role's local endpoint to bind before connecting; unused
    /// for the server role, which binds straight to a listener in `setup`.
    local: Option<SocketAddr>,
    peer: Option<SocketAddr>,
    mode: SocketMode,
}

impl TcpTransport {
    /// Creates an unconfigured TCP transport; `label` is used in [`Transport::name`].
    pub fn new(label: impl Into<String>) -> Self {
        TcpTransport {
            label: label.into(),
            ..Default::default()
        }
    }
}

impl Transport for TcpTransport {
    fn setup(&mut self, config: &str) -> Result<(), SocketError> {
        let (parsed, role) = parse_role(config)?;
        let local = parsed.local();
        self.mode = local.mode;
        self.role = Some(role);

        let addr = socket_addr(&local.addr, local.port)?;

        self.peer = match parsed.peer() {
            Some(peer) => Some(socket_addr(&peer.addr, peer.port)?),
            None => None,
        };

        match role {
            SocketRole::Server => {
                let listener = bind_tcp_listener(addr)?;
                listener.set_nonblocking(self.mode == SocketMode::NonBlocking)?;
                log::debug!("{}binding done", self.name_prefix(&addr));
                self.listener = Some(listener);
                self.local = None;
            }
            SocketRole::Client => {
                // The connection itself is made in connect(); setup() only
                // records the local address to bind from, so the bind and
                // the connect happen on the same underlying socket.
                self.local = Some(addr);
            }
        }

        Ok(())
    }

    fn connect(&mut self) -> Result<(), SocketError> {
        match self.role {
            Some(SocketRole::Client) => {
                let local = self.local.expect("client role always has a local endpoint after setup");
                let peer = self
                    .peer
                    .expect("client role always has a peer endpoint after setup");
                let stream = bind_and_connect_tcp(local, peer)?;
                stream.set_nonblocking(self.mode == SocketMode::NonBlocking)?;
                let _ = stream.set_linger(Some(Duration::from_secs(1)));
                self.stream = Some(stream);
                Ok(())
            }
            Some(SocketRole::Server) => {
                let listener = self.listener.as_ref().expect("setup() called before connect()");
                match listener.accept() {
                    Ok((stream, _addr)) => {
                        stream.set_nonblocking(self.mode == SocketMode::NonBlocking)?;
                        stream.set_nodelay(true)?;
                        let _ = stream.set_linger(Some(Duration::from_secs(1)));
                        // Zero send buffer, per the original server role's
                        // socket options; std::net exposes no setter for
                        // this, so borrow the fd via socket2 without taking
                        // ownership of it.
                        let _ = SockRef::from(&stream).set_send_buffer_size(0);
                        self.stream = Some(stream);
                        Ok(())
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        log::debug!("{}no pending connections", self.name());
                        Err(SocketError::Io(e))
                    }
                    Err(e) => Err(SocketError::Io(e)),
                }
            }
            None => Err(SocketError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "setup() was not called",
            ))),
        }
    }

    fn send(&mut self, buf: &[u8]) -> Result<(), SocketError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or(SocketError::ConnectionClosed)?;
        let sent = stream.write(buf)?;
        if sent != buf.len() {
            return Err(SocketError::ShortWrite {
                sent,
                total: buf.len(),
            });
        }
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, SocketError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or(SocketError::ConnectionClosed)?;
        let n = stream.read(buf)?;
        if n == 0 {
            log::debug!("{}recv: connection closed", self.name());
            return Err(SocketError::ConnectionClosed);
        }
        Ok(n)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        self.listener = None;
    }

    fn name(&self) -> String {
        let addr = self
            .stream
            .as_ref()
            .and_then(|s| s.local_addr().ok())
            .or_else(|| self.listener.as_ref().and_then(|l| l.local_addr().ok()))
            .or(self.local);
        match addr {
            Some(addr) => format!("[{} {addr}] ", self.label),
            None => format!("[{}] ", self.label),
        }
    }
}

impl TcpTransport {
    fn name_prefix(&self, addr: &SocketAddr) -> String {
        format!("[{} {}] ", self.label, addr)
    }
}

/// A UDP [`Transport`]. The peer address for a server role is learned from
/// the first datagram received (`recvfrom` populates it), matching the
/// source's `C_UdpSocket::recv`.
#[derive(Debug, Default)]
pub struct UdpTransport {
    label: String,
    role: Option<SocketRole>,
    socket: Option<UdpSocket>,
    peer: Option<SocketAddr>,
    mode: SocketMode,
}

impl UdpTransport {
    /// Creates an unconfigured UDP transport; `label` is used in [`Transport::name`].
    pub fn new(label: impl Into<String>) -> Self {
        UdpTransport {
            label: label.into(),
            ..Default::default()
        }
    }

    /// The peer address learned (client: from configuration; server: from
    /// the first received datagram), if any.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl Transport for UdpTransport {
    fn setup(&mut self, config: &str) -> Result<(), SocketError> {
        let (parsed, role) = parse_role(config)?;
        let local = parsed.local();
        self.mode = local.mode;
        self.role = Some(role);

        let addr = socket_addr(&local.addr, local.port)?;
        let socket = bind_udp_socket(addr)?;
        socket.set_nonblocking(self.mode == SocketMode::NonBlocking)?;
        self.socket = Some(socket);

        if let Some(peer) = parsed.peer() {
            self.peer = Some(socket_addr(&peer.addr, peer.port)?);
        }

        Ok(())
    }

    fn connect(&mut self) -> Result<(), SocketError> {
        // UDP is connectionless; session establishment is handled by the
        // application-level handshake in crate::handshake.
        Ok(())
    }

    fn send(&mut self, buf: &[u8]) -> Result<(), SocketError> {
        let socket = self.socket.as_ref().ok_or(SocketError::ConnectionClosed)?;
        let peer = self.peer.ok_or(SocketError::ConnectionClosed)?;
        let sent = socket.send_to(buf, peer)?;
        if sent != buf.len() {
            return Err(SocketError::ShortWrite {
                sent,
                total: buf.len(),
            });
        }
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, SocketError> {
        let socket = self.socket.as_ref().ok_or(SocketError::ConnectionClosed)?;
        let (n, from) = socket.recv_from(buf)?;
        self.peer = Some(from);
        if n == 0 {
            log::debug!("{}recv: connection closed", self.name());
            return Err(SocketError::ConnectionClosed);
        }
        Ok(n)
    }

    fn close(&mut self) {
        self.socket = None;
    }

    fn name(&self) -> String {
        match self.socket.as_ref().and_then(|s| s.local_addr().ok()) {
            Some(addr) => format!("[{} {addr}] ", self.label),
            None => format!("[{}] ", self.label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    /// Picks a high port at random so concurrent test runs don't collide on
    /// a fixed loopback address.
    fn free_port() -> u16 {
        rand::rng().random_range(20000..60000)
    }

    #[test]
    fn tcp_client_server_loopback_exchange() {
        let server_port = free_port();
        let mut server = TcpTransport::new("server");
        server
            .setup(&format!("127.0.0.1:{server_port}"))
            .unwrap();

        let mut client = TcpTransport::new("client");
        client
            .setup(&format!("127.0.0.1:0 127.0.0.1:{server_port}"))
            .unwrap();

        let accepted = std::thread::spawn(move || {
            server.connect().unwrap();
            let mut buf = [0u8; BUF_SIZE];
            let n = server.recv(&mut buf).unwrap();
            assert_eq!(&buf[..n], b"ping");
            server.send(b"pong").unwrap();
        });

        client.connect().unwrap();
        client.send(b"ping").unwrap();
        let mut buf = [0u8; BUF_SIZE];
        let n = client.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"pong");

        accepted.join().unwrap();
    }

    #[test]
    fn udp_server_learns_peer_from_recv() {
        let server_port = free_port();
        let client_port = free_port();

        let mut server = UdpTransport::new("server");
        server.setup(&format!("127.0.0.1:{server_port}")).unwrap();
        assert!(server.peer_addr().is_none());

        let mut client = UdpTransport::new("client");
        client
            .setup(&format!(
                "127.0.0.1:{client_port} 127.0.0.1:{server_port}"
            ))
            .unwrap();

        client.send(b"hello").unwrap();

        let mut buf = [0u8; BUF_SIZE];
        let n = server.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
        assert!(server.peer_addr().is_some());
    }
}
