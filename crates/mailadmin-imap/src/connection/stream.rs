//! Transports for IMAP connections.
//!
//! The session talks to a [`Transport`]; whether bytes travel in plaintext
//! or through TLS is decided when the transport is created (or upgraded by
//! STARTTLS) and is invisible to the layers above.

#![allow(clippy::missing_errors_doc)]

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, StreamOwned};
use tracing::debug;

use super::config::{Config, Security};
use crate::{Error, Result};

/// Size of a single socket read.
const READ_CHUNK_SIZE: usize = 8192;

/// A connected byte stream to an IMAP server.
pub trait Transport: Send {
    /// Writes all of `data`.
    ///
    /// Fails with [`Error::ShortWrite`] if the socket stops accepting bytes.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Blocks until at least one chunk arrives or `timeout` elapses.
    ///
    /// Fails with [`Error::Timeout`] on elapse.
    fn receive(&mut self, timeout: Duration) -> Result<Vec<u8>>;

    /// Performs a TLS handshake over this connection (STARTTLS).
    fn start_tls(self: Box<Self>, server_name: &str, timeout: Duration)
    -> Result<Box<dyn Transport>>;

    /// Returns true if the stream is TLS-encrypted.
    fn is_encrypted(&self) -> bool;

    /// Shuts the connection down. Never fails.
    fn close(&mut self);

    /// Drops the connection without a graceful protocol shutdown.
    ///
    /// Used after a timeout, when the peer cannot be expected to read
    /// anything more.
    fn abort(&mut self) {
        self.close();
    }
}

/// Opens transports for a configuration.
pub trait Connector: Send {
    /// Connects to the configured server, with immediate TLS for implicit mode.
    fn connect(&self, config: &Config) -> Result<Box<dyn Transport>>;
}

/// Connector over `std::net::TcpStream`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(&self, config: &Config) -> Result<Box<dyn Transport>> {
        let tcp = connect_tcp(config)?;
        match config.security {
            Security::Implicit => Ok(Box::new(TlsTransport::handshake(
                tcp,
                config.verify_name(),
                config.connect_timeout,
            )?)),
            Security::Unsecured | Security::StartTls => Ok(Box::new(PlainTransport::new(tcp))),
        }
    }
}

/// Resolves the host and connects to the first acceptable address.
fn connect_tcp(config: &Config) -> Result<TcpStream> {
    let addrs: Vec<SocketAddr> = (config.host.as_str(), config.port)
        .to_socket_addrs()?
        .filter(|addr| config.ip_preference.accepts(addr))
        .collect();

    if addrs.is_empty() {
        return Err(Error::Config(format!(
            "{} has no address matching {:?}",
            config.host, config.ip_preference
        )));
    }

    let mut last_error = None;
    for addr in addrs {
        debug!(%addr, "connecting");
        match TcpStream::connect_timeout(&addr, config.connect_timeout) {
            Ok(tcp) => {
                tcp.set_nodelay(true)?;
                return Ok(tcp);
            }
            Err(e) if is_timeout(&e) => last_error = Some(Error::Timeout(config.connect_timeout)),
            Err(e) => last_error = Some(Error::Io(e)),
        }
    }

    Err(last_error.unwrap_or(Error::Timeout(config.connect_timeout)))
}

/// Plaintext TCP transport.
#[derive(Debug)]
pub struct PlainTransport {
    stream: TcpStream,
}

impl PlainTransport {
    /// Wraps a connected TCP stream.
    #[must_use]
    pub const fn new(stream: TcpStream) -> Self {
        Self { stream }
    }
}

impl Transport for PlainTransport {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        write_exact(&mut self.stream, data).map_err(socket_error)
    }

    fn receive(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        self.stream.set_read_timeout(Some(clamp(timeout)))?;
        read_chunk(&mut self.stream).map_err(|e| read_error(e, timeout))
    }

    fn start_tls(
        self: Box<Self>,
        server_name: &str,
        timeout: Duration,
    ) -> Result<Box<dyn Transport>> {
        let tls = TlsTransport::handshake(self.stream, server_name, timeout)?;
        Ok(Box::new(tls))
    }

    fn is_encrypted(&self) -> bool {
        false
    }

    fn close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// TLS-encrypted transport.
pub struct TlsTransport {
    stream: StreamOwned<ClientConnection, TcpStream>,
}

impl TlsTransport {
    /// Runs the client handshake over `tcp`, verifying `server_name`.
    ///
    /// The handshake is completed before returning so certificate failures
    /// surface here rather than on the first read.
    pub fn handshake(mut tcp: TcpStream, server_name: &str, timeout: Duration) -> Result<Self> {
        let name = ServerName::try_from(server_name.to_string())
            .map_err(|e| Error::Config(format!("invalid TLS server name {server_name:?}: {e}")))?;
        let mut conn = ClientConnection::new(create_tls_config(), name)?;

        tcp.set_read_timeout(Some(clamp(timeout)))?;
        tcp.set_write_timeout(Some(clamp(timeout)))?;
        while conn.is_handshaking() {
            conn.complete_io(&mut tcp)
                .map_err(|e| handshake_error(e, timeout))?;
        }
        debug!(server_name, "TLS established");

        Ok(Self {
            stream: StreamOwned::new(conn, tcp),
        })
    }
}

impl std::fmt::Debug for TlsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsTransport")
            .field("peer", &self.stream.sock.peer_addr().ok())
            .finish_non_exhaustive()
    }
}

impl Transport for TlsTransport {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        write_exact(&mut self.stream, data).map_err(tls_error)
    }

    fn receive(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        self.stream.sock.set_read_timeout(Some(clamp(timeout)))?;
        read_chunk(&mut self.stream).map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => Error::Encryption(e.to_string()),
            _ => read_error(e, timeout),
        })
    }

    fn start_tls(
        self: Box<Self>,
        _server_name: &str,
        _timeout: Duration,
    ) -> Result<Box<dyn Transport>> {
        Err(Error::InvalidState("Stream is already TLS".to_string()))
    }

    fn is_encrypted(&self) -> bool {
        true
    }

    fn close(&mut self) {
        self.stream.conn.send_close_notify();
        let _ = self.stream.conn.complete_io(&mut self.stream.sock);
        self.abort();
    }

    fn abort(&mut self) {
        let _ = self.stream.sock.shutdown(Shutdown::Both);
    }
}

/// Creates a TLS client configuration with the webpki root certificates.
#[must_use]
pub fn create_tls_config() -> Arc<ClientConfig> {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
}

/// Writes every byte, reporting how far a stalled write got.
fn write_exact<W: Write>(writer: &mut W, data: &[u8]) -> std::result::Result<(), WriteError> {
    let mut written = 0;
    while written < data.len() {
        match writer.write(&data[written..]) {
            Ok(0) => {
                return Err(WriteError::Short {
                    written,
                    expected: data.len(),
                });
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(WriteError::Io(e)),
        }
    }
    writer.flush().map_err(WriteError::Io)
}

enum WriteError {
    Short { written: usize, expected: usize },
    Io(io::Error),
}

fn socket_error(e: WriteError) -> Error {
    match e {
        WriteError::Short { written, expected } => Error::ShortWrite { written, expected },
        WriteError::Io(e) => Error::Io(e),
    }
}

/// Like [`socket_error`], but rustls reports protocol failures as `InvalidData`.
fn tls_error(e: WriteError) -> Error {
    match e {
        WriteError::Io(e) if e.kind() == io::ErrorKind::InvalidData => {
            Error::Encryption(e.to_string())
        }
        other => socket_error(other),
    }
}

/// Reads one chunk; a closed connection is an error, not an empty chunk.
fn read_chunk<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                ));
            }
            Ok(n) => {
                buf.truncate(n);
                return Ok(buf);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

fn read_error(e: io::Error, timeout: Duration) -> Error {
    if is_timeout(&e) {
        Error::Timeout(timeout)
    } else {
        Error::Io(e)
    }
}

fn handshake_error(e: io::Error, timeout: Duration) -> Error {
    match e.kind() {
        _ if is_timeout(&e) => Error::Timeout(timeout),
        io::ErrorKind::InvalidData => Error::Encryption(e.to_string()),
        io::ErrorKind::UnexpectedEof => {
            Error::Encryption("connection closed during TLS handshake".to_string())
        }
        _ => Error::Io(e),
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

/// Socket timeouts of zero mean "block forever"; never pass one.
fn clamp(timeout: Duration) -> Duration {
    timeout.max(Duration::from_millis(1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::connection::IpPreference;
    use std::net::TcpListener;

    struct Stalled {
        accept: usize,
    }

    impl Write for Stalled {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.accept);
            self.accept -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_create_tls_config() {
        let config = create_tls_config();
        assert!(Arc::strong_count(&config) >= 1);
    }

    #[test]
    fn test_short_write_reported() {
        let mut writer = Stalled { accept: 3 };
        let err = socket_error(write_exact(&mut writer, b"a0000000001 LOGOUT\r\n").unwrap_err());
        assert!(matches!(
            err,
            Error::ShortWrite {
                written: 3,
                expected: 20
            }
        ));
    }

    #[test]
    fn test_full_write() {
        let mut writer = Stalled { accept: 64 };
        assert!(write_exact(&mut writer, b"a0000000001 LOGOUT\r\n").is_ok());
    }

    #[test]
    fn test_read_chunk_eof() {
        let mut empty: &[u8] = b"";
        let err = read_chunk(&mut empty).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_plain_receive_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = std::thread::spawn(move || {
            let (conn, _) = listener.accept().unwrap();
            std::thread::sleep(Duration::from_millis(500));
            drop(conn);
        });

        let mut transport = PlainTransport::new(TcpStream::connect(addr).unwrap());
        let err = transport.receive(Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        transport.close();
    }

    #[test]
    fn test_plain_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            conn.write_all(b"* OK ready\r\n").unwrap();
            let mut buf = [0u8; 64];
            let n = conn.read(&mut buf).unwrap();
            buf[..n].to_vec()
        });

        let mut transport = PlainTransport::new(TcpStream::connect(addr).unwrap());
        let greeting = transport.receive(Duration::from_secs(5)).unwrap();
        assert_eq!(greeting, b"* OK ready\r\n");
        transport.send(b"a0000000001 LOGOUT\r\n").unwrap();
        assert_eq!(server.join().unwrap(), b"a0000000001 LOGOUT\r\n");
        assert!(!transport.is_encrypted());
    }

    #[test]
    fn test_connect_refused_is_socket_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = Config::builder("127.0.0.1")
            .port(port)
            .security(Security::Unsecured)
            .build();
        let err = TcpConnector.connect(&config).err().unwrap();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_ip_preference_without_match() {
        let config = Config::builder("127.0.0.1")
            .port(143)
            .ip_preference(IpPreference::V6)
            .build();
        let err = TcpConnector.connect(&config).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
