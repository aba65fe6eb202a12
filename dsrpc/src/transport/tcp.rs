//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! TCP transport implementation.
//!
//! Wraps Tokio's `TcpStream` for both the connecting and the accepting side.

use crate::transport::{
    Address, Transport, TransportConfig, TransportError, TransportId, TransportMetadata, TCP_SCHEME,
};
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, instrument};

/// A TCP connection.
pub struct TcpTransport {
    stream: TcpStream,
    metadata: TransportMetadata,
}

impl TcpTransport {
    /// Wraps an established stream.
    ///
    /// # Errors
    ///
    /// Fails if the socket addresses cannot be read or `nodelay` cannot be set.
    pub fn from_stream(stream: TcpStream, nodelay: bool) -> io::Result<Self> {
        let id = TransportId::next();
        let local_addr = stream.local_addr()?;
        let peer_addr = stream.peer_addr()?;
        stream.set_nodelay(nodelay)?;
        debug!(transport_id = %id, %local_addr, %peer_addr, "created TCP transport");

        let metadata = TransportMetadata::new(id, TCP_SCHEME)
            .with_local_addr(local_addr)
            .with_peer_addr(peer_addr);
        Ok(Self { stream, metadata })
    }

    /// Connects to `address`, giving up after `config.connect_timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectionFailed`] if the peer refuses or is
    /// unreachable and [`TransportError::Timeout`] if the attempt takes too long.
    #[instrument(skip_all, fields(address = %address))]
    pub async fn connect(address: &Address, config: &TransportConfig) -> Result<Self, TransportError> {
        let authority = address.authority();
        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&authority))
            .await
            .map_err(|_| TransportError::Timeout {
                duration: config.connect_timeout,
            })?
            .map_err(|e| {
                error!("failed to connect: {}", e);
                TransportError::ConnectionFailed {
                    address: address.to_string(),
                    source: e,
                }
            })?;
        info!("TCP connection established");
        Self::from_stream(stream, config.nodelay).map_err(|source| TransportError::Io { source })
    }

    /// Binds a listener on `address`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::BindFailed`] if the address is unavailable.
    #[instrument(skip_all, fields(address = %address))]
    pub async fn bind(address: &Address) -> Result<TcpListener, TransportError> {
        let listener = TcpListener::bind(address.authority()).await.map_err(|e| {
            error!("failed to bind: {}", e);
            TransportError::BindFailed {
                address: address.to_string(),
                source: e,
            }
        })?;
        info!("TCP listener bound");
        Ok(listener)
    }

    /// Accepts the next inbound connection on `listener`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if accepting fails.
    pub async fn accept(listener: &TcpListener, nodelay: bool) -> Result<(Self, SocketAddr), TransportError> {
        let (stream, peer_addr) = listener
            .accept()
            .await
            .map_err(|source| TransportError::Io { source })?;
        debug!(%peer_addr, "accepted TCP connection");
        let transport =
            Self::from_stream(stream, nodelay).map_err(|source| TransportError::Io { source })?;
        Ok((transport, peer_addr))
    }

    /// Returns the local socket address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    /// Returns the peer socket address.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    /// Returns whether Nagle's algorithm is disabled.
    pub fn nodelay(&self) -> io::Result<bool> {
        self.stream.nodelay()
    }
}

impl Transport for TcpTransport {
    fn metadata(&self) -> &TransportMetadata {
        &self.metadata
    }
}

impl AsyncRead for TcpTransport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for TcpTransport {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn loopback() -> Address {
        "tcp://127.0.0.1:0".parse().unwrap()
    }

    #[tokio::test]
    async fn test_connect_and_exchange() {
        let listener = TcpTransport::bind(&loopback()).await.unwrap();
        let server_addr = Address::tcp(listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (mut transport, _) = TcpTransport::accept(&listener, true).await.unwrap();
            let mut buf = [0u8; 5];
            transport.read_exact(&mut buf).await.unwrap();
            transport.write_all(&buf).await.unwrap();
        });

        let mut client = TcpTransport::connect(&server_addr, &TransportConfig::default())
            .await
            .unwrap();
        assert!(client.nodelay().unwrap());
        assert_eq!(client.metadata().transport_type, "tcp");
        client.write_all(b"hello").await.unwrap();
        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpTransport::bind(&loopback()).await.unwrap();
        let addr = Address::tcp(listener.local_addr().unwrap());
        drop(listener);

        let result = TcpTransport::connect(&addr, &TransportConfig::default()).await;
        assert!(matches!(result, Err(TransportError::ConnectionFailed { .. })));
    }
}
