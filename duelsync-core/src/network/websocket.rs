// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! WebSocket Transport
//!
//! Real transport implementation using tungstenite for WebSocket connections.
//! Supports both native-tls and rustls TLS backends.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

#[cfg(all(feature = "network-native-tls", not(feature = "network-rustls")))]
use native_tls::TlsConnector;

#[cfg(feature = "network-rustls")]
use rustls::pki_types::ServerName;
#[cfg(feature = "network-rustls")]
use std::sync::Arc;

use tracing::debug;
use tungstenite::client::IntoClientRequest;
use tungstenite::handshake::HandshakeError;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};
use url::Url;

use super::error::NetworkError;
use super::transport::{Transport, TransportConfig, TransportResult};

/// Control frames skipped in one `receive` before yielding to the caller.
const MAX_CONTROL_FRAMES_PER_RECEIVE: usize = 32;

/// WebSocket transport for the match server.
///
/// Supports both ws:// (plaintext) and wss:// (TLS) connections.
///
/// # Example
///
/// ```ignore
/// use duelsync_core::network::{Transport, TransportConfig, WebSocketTransport};
///
/// let mut transport = WebSocketTransport::new();
/// let url = url::Url::parse("wss://duels.example.com/ws/42/alice")?;
/// transport.connect(&url, &TransportConfig::default())?;
/// ```
pub struct WebSocketTransport {
    socket: Option<WebSocket<MaybeTlsStream<TcpStream>>>,
    /// Second handle on the TCP socket, for adjusting timeouts after the
    /// TLS layer has taken ownership of the stream.
    tcp: Option<TcpStream>,
}

impl WebSocketTransport {
    /// Creates a new WebSocket transport.
    pub fn new() -> Self {
        WebSocketTransport {
            socket: None,
            tcp: None,
        }
    }

    /// Splits a WebSocket URL into host, port, and whether TLS is needed.
    fn endpoint_parts(url: &Url) -> Result<(String, u16, bool), NetworkError> {
        let is_tls = match url.scheme() {
            "wss" => true,
            "ws" => false,
            other => {
                return Err(NetworkError::ConnectionFailed(format!(
                    "Invalid URL scheme (expected ws:// or wss://): {}",
                    other
                )))
            }
        };

        let host = url
            .host_str()
            .ok_or_else(|| NetworkError::ConnectionFailed("URL has no host".into()))?
            .to_string();
        let port = url
            .port_or_known_default()
            .unwrap_or(if is_tls { 443 } else { 80 });

        Ok((host, port, is_tls))
    }

    fn resolve(host: &str, port: u16) -> Result<SocketAddr, NetworkError> {
        (host, port)
            .to_socket_addrs()
            .map_err(|e| NetworkError::ConnectionFailed(format!("DNS lookup failed: {}", e)))?
            .next()
            .ok_or_else(|| NetworkError::ConnectionFailed(format!("No address for {}", host)))
    }

    fn set_timeouts(
        tcp: &TcpStream,
        read: Duration,
        write: Duration,
    ) -> Result<(), NetworkError> {
        tcp.set_read_timeout(Some(read))
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;
        tcp.set_write_timeout(Some(write))
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))
    }

    /// Create a TLS stream using native-tls
    #[cfg(all(feature = "network-native-tls", not(feature = "network-rustls")))]
    fn create_tls_stream(
        host: &str,
        tcp_stream: TcpStream,
    ) -> Result<MaybeTlsStream<TcpStream>, NetworkError> {
        let connector = TlsConnector::new()
            .map_err(|e| NetworkError::ConnectionFailed(format!("TLS error: {}", e)))?;
        let tls_stream = connector
            .connect(host, tcp_stream)
            .map_err(|e| NetworkError::ConnectionFailed(format!("TLS handshake failed: {}", e)))?;
        Ok(MaybeTlsStream::NativeTls(tls_stream))
    }

    /// Create a TLS stream using rustls
    #[cfg(feature = "network-rustls")]
    fn create_tls_stream(
        host: &str,
        tcp_stream: TcpStream,
    ) -> Result<MaybeTlsStream<TcpStream>, NetworkError> {
        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let server_name: ServerName<'_> = host.try_into().map_err(|_| {
            NetworkError::ConnectionFailed(format!("Invalid server name: {}", host))
        })?;

        let tls_conn = rustls::ClientConnection::new(Arc::new(config), server_name.to_owned())
            .map_err(|e| NetworkError::ConnectionFailed(format!("TLS setup failed: {}", e)))?;

        Ok(MaybeTlsStream::Rustls(rustls::StreamOwned::new(
            tls_conn, tcp_stream,
        )))
    }

    fn teardown(&mut self) {
        self.socket = None;
        self.tcp = None;
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

impl Transport for WebSocketTransport {
    fn connect(&mut self, url: &Url, config: &TransportConfig) -> TransportResult<()> {
        if self.socket.is_some() {
            return Ok(());
        }

        let deadline = Instant::now() + config.handshake_timeout;
        let (host, port, is_tls) = Self::endpoint_parts(url)?;
        let addr = Self::resolve(&host, port)?;

        let tcp_stream =
            TcpStream::connect_timeout(&addr, config.handshake_timeout).map_err(|e| {
                if is_timeout(&e) {
                    NetworkError::Timeout
                } else {
                    NetworkError::ConnectionFailed(e.to_string())
                }
            })?;
        let _ = tcp_stream.set_nodelay(true);

        // TLS and the upgrade request share whatever time is left
        let remaining = deadline
            .saturating_duration_since(Instant::now())
            .max(Duration::from_millis(1));
        Self::set_timeouts(&tcp_stream, remaining, remaining)?;
        let tcp_handle = tcp_stream
            .try_clone()
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        let stream: MaybeTlsStream<TcpStream> = if is_tls {
            Self::create_tls_stream(&host, tcp_stream)?
        } else {
            MaybeTlsStream::Plain(tcp_stream)
        };

        let request = url.as_str().into_client_request().map_err(|e| {
            NetworkError::ConnectionFailed(format!("Invalid WebSocket request: {}", e))
        })?;

        let (socket, _response) = tungstenite::client(request, stream).map_err(|e| match e {
            HandshakeError::Interrupted(_) => NetworkError::Timeout,
            HandshakeError::Failure(tungstenite::Error::Io(ref io)) if is_timeout(io) => {
                NetworkError::Timeout
            }
            HandshakeError::Failure(e) => {
                NetworkError::ConnectionFailed(format!("WebSocket handshake failed: {}", e))
            }
        })?;

        Self::set_timeouts(&tcp_handle, config.read_timeout, config.write_timeout)?;
        debug!(%url, "websocket open");

        self.socket = Some(socket);
        self.tcp = Some(tcp_handle);
        Ok(())
    }

    fn disconnect(&mut self) -> TransportResult<()> {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None); // Ignore errors on close
            let _ = socket.flush();
        }
        self.tcp = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    fn send(&mut self, frame: &str) -> TransportResult<()> {
        let socket = self.socket.as_mut().ok_or(NetworkError::NotConnected)?;

        match socket.send(Message::Text(frame.to_string())) {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                self.teardown();
                Err(NetworkError::ConnectionClosed)
            }
            Err(e) => {
                self.teardown();
                Err(NetworkError::SendFailed(e.to_string()))
            }
        }
    }

    fn receive(&mut self) -> TransportResult<Option<String>> {
        let socket = self.socket.as_mut().ok_or(NetworkError::NotConnected)?;

        // Control frames are answered here; keep reading until a data
        // frame or an idle read.
        for _ in 0..MAX_CONTROL_FRAMES_PER_RECEIVE {
            match socket.read() {
                Ok(Message::Text(text)) => return Ok(Some(text)),
                Ok(Message::Binary(data)) => {
                    return String::from_utf8(data).map(Some).map_err(|_| {
                        NetworkError::InvalidMessage("Binary frame is not valid UTF-8".into())
                    })
                }
                Ok(Message::Ping(_)) => {
                    // tungstenite queues the pong; push it out now
                    let _ = socket.flush();
                }
                Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Ok(Message::Close(_)) => {
                    let _ = socket.flush();
                    self.teardown();
                    return Err(NetworkError::ConnectionClosed);
                }
                Err(tungstenite::Error::Io(ref e)) if is_timeout(e) => return Ok(None),
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    self.teardown();
                    return Err(NetworkError::ConnectionClosed);
                }
                Err(e) => {
                    self.teardown();
                    return Err(NetworkError::ReceiveFailed(e.to_string()));
                }
            }
        }
        Ok(None)
    }
}

// INLINE_TEST_REQUIRED: Tests private endpoint_parts function for URL handling
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parts_wss_default_port() {
        let url = Url::parse("wss://duels.example.com/ws/1/a").unwrap();
        let (host, port, is_tls) = WebSocketTransport::endpoint_parts(&url).unwrap();
        assert_eq!(host, "duels.example.com");
        assert_eq!(port, 443);
        assert!(is_tls);
    }

    #[test]
    fn test_endpoint_parts_ws_explicit_port() {
        let url = Url::parse("ws://localhost:8080/ws/1/a").unwrap();
        let (host, port, is_tls) = WebSocketTransport::endpoint_parts(&url).unwrap();
        assert_eq!(host, "localhost");
        assert_eq!(port, 8080);
        assert!(!is_tls);
    }

    #[test]
    fn test_endpoint_parts_invalid_scheme() {
        let url = Url::parse("http://example.com").unwrap();
        assert!(WebSocketTransport::endpoint_parts(&url).is_err());
    }

    #[test]
    fn test_new_transport_closed() {
        let transport = WebSocketTransport::new();
        assert!(!transport.is_open());
    }

    #[test]
    fn test_send_without_connect_fails() {
        let mut transport = WebSocketTransport::new();
        let result = transport.send(r#"{"type":"test","data":{}}"#);
        assert!(matches!(result, Err(NetworkError::NotConnected)));
    }

    #[test]
    fn test_receive_without_connect_fails() {
        let mut transport = WebSocketTransport::new();
        assert!(matches!(
            transport.receive(),
            Err(NetworkError::NotConnected)
        ));
    }

    #[test]
    fn test_disconnect_when_not_connected_ok() {
        let mut transport = WebSocketTransport::new();
        assert!(transport.disconnect().is_ok());
        assert!(!transport.is_open());
    }

    #[test]
    fn test_connect_refused_is_an_error() {
        // Bind then drop a listener so the port is very likely closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut transport = WebSocketTransport::new();
        let url = Url::parse(&format!("ws://127.0.0.1:{}/ws/g/p", port)).unwrap();
        let config = TransportConfig {
            handshake_timeout: Duration::from_millis(500),
            ..Default::default()
        };

        assert!(transport.connect(&url, &config).is_err());
        assert!(!transport.is_open());
    }

    #[test]
    fn test_receive_reads_past_control_frames() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let frame = r#"{"type":"round_started","data":{}}"#;

        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            ws.send(Message::Ping(b"hb".to_vec())).unwrap();
            ws.send(Message::Pong(Vec::new())).unwrap();
            ws.send(Message::Text(frame.to_string())).unwrap();
            // Wait for the client's pong or close
            let _ = ws.read();
        });

        let mut transport = WebSocketTransport::new();
        let url = Url::parse(&format!("ws://127.0.0.1:{}/ws/g/p", port)).unwrap();
        let config = TransportConfig {
            handshake_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        transport.connect(&url, &config).unwrap();

        assert_eq!(transport.receive().unwrap().as_deref(), Some(frame));

        let _ = transport.disconnect();
        server.join().unwrap();
    }
}
