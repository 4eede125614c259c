use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, instrument};

use crate::error::{constants, ProtocolError, Result};
use crate::utils::timeout::with_timeout;

/// One short-lived connection to a Votifier server.
///
/// Generic over the byte stream so the protocol code can run over anything
/// that reads and writes; [`Connection::connect`] opens the TCP flavour.
/// The stream is released when the connection is dropped, so every exit path
/// closes the socket even without an explicit [`Connection::close`].
pub struct Connection<S = TcpStream> {
    stream: S,
    peer: String,
    bytes_sent: u64,
    bytes_received: u64,
}

impl Connection<TcpStream> {
    /// Open a TCP connection to `host:port`
    #[instrument(skip(timeout))]
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let stream = match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ProtocolError::Connection {
                    addr,
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(ProtocolError::Connection {
                    addr,
                    reason: constants::ERR_CONNECT_TIMEOUT.into(),
                })
            }
        };
        stream.set_nodelay(true).ok();

        debug!(peer = %addr, "Connected");
        Ok(Self::new(stream, addr))
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already-open stream
    pub fn new(stream: S, peer: impl Into<String>) -> Self {
        Self {
            stream,
            peer: peer.into(),
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    /// Write all of `data`, returning how many bytes went out
    pub async fn send(&mut self, data: &[u8]) -> Result<usize> {
        self.stream
            .write_all(data)
            .await
            .map_err(|e| ProtocolError::SendFailed(e.to_string()))?;
        self.stream
            .flush()
            .await
            .map_err(|e| ProtocolError::SendFailed(e.to_string()))?;

        self.bytes_sent += data.len() as u64;
        debug!(peer = %self.peer, bytes = data.len(), "Sent");
        Ok(data.len())
    }

    /// Read once, up to `max_bytes`.
    ///
    /// Returns an empty buffer if the peer closed the connection and
    /// `ProtocolError::Timeout` if nothing arrived within `timeout`.
    pub async fn receive(&mut self, max_bytes: usize, timeout: Duration) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_bytes];
        let stream = &mut self.stream;
        let n = with_timeout(timeout, async {
            Ok::<_, ProtocolError>(stream.read(&mut buf).await?)
        })
        .await?;
        buf.truncate(n);

        self.bytes_received += n as u64;
        debug!(peer = %self.peer, bytes = n, "Received");
        Ok(buf)
    }

    /// Shut the write side down and release the stream
    pub async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!(peer = %self.peer, error = %e, "Shutdown after close failed");
        }
        debug!(peer = %self.peer, "Connection closed");
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn receive_reads_at_most_max_bytes() {
        let (client, mut server) = duplex(1024);
        let mut conn = Connection::new(client, "test");

        server.write_all(b"VOTIFIER 2.0 abc123\n").await.unwrap();
        let got = conn.receive(8, Duration::from_secs(1)).await.unwrap();
        assert_eq!(got, b"VOTIFIER");
        assert_eq!(conn.bytes_received(), 8);
    }

    #[tokio::test]
    async fn receive_times_out() {
        let (client, _server) = duplex(64);
        let mut conn = Connection::new(client, "test");

        let result = conn.receive(64, Duration::from_millis(30)).await;
        assert!(matches!(result, Err(ProtocolError::Timeout)));
    }

    #[tokio::test]
    async fn receive_after_peer_close_is_empty() {
        let (client, server) = duplex(64);
        drop(server);
        let mut conn = Connection::new(client, "test");

        let got = conn.receive(64, Duration::from_secs(1)).await.unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn send_and_close() {
        let (client, mut server) = duplex(64);
        let mut conn = Connection::new(client, "test");
        assert_eq!(conn.peer(), "test");

        assert_eq!(conn.send(b"hello").await.unwrap(), 5);
        assert_eq!(conn.bytes_sent(), 5);
        conn.close().await;

        let mut received = Vec::new();
        server.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"hello");
    }

    #[tokio::test]
    async fn connect_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = Connection::connect("127.0.0.1", port, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ProtocolError::Connection { .. })));
    }
}
