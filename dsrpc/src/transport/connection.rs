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

//! Framed, queue-driven connections.
//!
//! A [`Connection`] owns two tasks:
//!
//! - the **writer** drains an unbounded queue of already-framed payloads and
//!   is the only code that writes to the socket, so frames leave in the order
//!   [`Connection::send`] accepted them;
//! - the **reader** feeds socket reads through the [`WireCodec`], hands each
//!   complete frame to the [`FrameListener`] and, when the connection ends for
//!   any reason, reports it through [`FrameListener::on_closed`] exactly once.
//!
//! A corrupt frame or an I/O failure closes only the affected connection.

use crate::serialization::WireCodec;
use crate::transport::{FrameListener, Transport, TransportError, TransportId, TransportMetadata};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, trace, warn};

/// A framed connection to a peer.
pub struct Connection {
    metadata: TransportMetadata,
    codec: Arc<dyn WireCodec>,
    listener: Arc<dyn FrameListener>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    closed: AtomicBool,
    close_reason: Mutex<Option<TransportError>>,
    shutdown: watch::Sender<bool>,
}

impl Connection {
    /// Starts the reader and writer tasks for `transport`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<T: Transport>(
        transport: T,
        codec: Arc<dyn WireCodec>,
        listener: Arc<dyn FrameListener>,
        read_buffer_size: usize,
    ) -> Arc<Self> {
        let metadata = transport.metadata().clone();
        let (reader, writer) = tokio::io::split(transport);
        let (outbound, queue) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);

        let connection = Arc::new(Self {
            metadata,
            codec,
            listener,
            outbound,
            closed: AtomicBool::new(false),
            close_reason: Mutex::new(None),
            shutdown,
        });
        debug!(transport_id = %connection.id(), peer = ?connection.peer_addr(), "connection started");

        tokio::spawn(write_loop(
            connection.clone(),
            writer,
            queue,
            connection.shutdown.subscribe(),
        ));
        tokio::spawn(read_loop(
            connection.clone(),
            reader,
            connection.shutdown.subscribe(),
            read_buffer_size.max(1),
        ));
        connection
    }

    /// Returns the transport id.
    pub fn id(&self) -> TransportId {
        self.metadata.id
    }

    /// Returns the transport metadata.
    pub fn metadata(&self) -> &TransportMetadata {
        &self.metadata
    }

    /// Returns the peer's socket address, if known.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.metadata.peer_addr
    }

    /// Returns `true` once the connection has started closing.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Frames `payload` and queues it for writing. Never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] if the connection is closed and
    /// [`TransportError::FrameTooLarge`] if the payload exceeds the codec's
    /// maximum. A rejected payload does not affect the connection.
    pub fn send(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let mut framed = Vec::new();
        self.codec.encode(&payload, &mut framed)?;
        self.outbound
            .send(framed)
            .map_err(|_| TransportError::Closed)
    }

    /// Closes the connection gracefully. Idempotent.
    ///
    /// Frames already queued are still written before the socket's write half
    /// is shut down.
    pub fn close(&self) {
        if self.begin_close(None) {
            debug!(transport_id = %self.id(), "connection closing");
        }
    }

    /// Records the first close reason and signals both tasks.
    fn begin_close(&self, error: Option<TransportError>) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        *self.close_reason.lock() = error;
        self.shutdown.send_replace(true);
        true
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.metadata.id)
            .field("peer_addr", &self.metadata.peer_addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn read_loop<R>(
    connection: Arc<Connection>,
    mut reader: R,
    mut shutdown: watch::Receiver<bool>,
    read_buffer_size: usize,
) where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(read_buffer_size);
    let mut chunk = vec![0u8; read_buffer_size];

    'read: while !connection.is_closed() {
        let read = tokio::select! {
            _ = shutdown.changed() => break 'read,
            read = reader.read(&mut chunk) => read,
        };
        match read {
            Ok(0) => {
                let error = (!buffer.is_empty()).then(|| TransportError::ConnectionLost {
                    reason: format!("peer closed with {} bytes of a partial frame", buffer.len()),
                    source: None,
                });
                connection.begin_close(error);
            }
            Ok(n) => {
                trace!(transport_id = %connection.id(), bytes = n, "read");
                buffer.extend_from_slice(&chunk[..n]);
                loop {
                    match connection.codec.decode(&mut buffer) {
                        Ok(Some(frame)) => {
                            if connection.is_closed() {
                                break 'read;
                            }
                            connection.listener.on_frame(&connection, frame);
                        }
                        Ok(None) => break,
                        Err(e) => {
                            error!(transport_id = %connection.id(), "closing connection: {}", e);
                            connection.begin_close(Some(e));
                            break 'read;
                        }
                    }
                }
            }
            Err(e) => {
                connection.begin_close(Some(TransportError::ReadFailed { source: e }));
            }
        }
    }

    let reason = connection.close_reason.lock().take();
    match &reason {
        Some(e) => warn!(transport_id = %connection.id(), "connection closed: {}", e),
        None => debug!(transport_id = %connection.id(), "connection closed"),
    }
    connection.listener.on_closed(&connection, reason);
}

async fn write_loop<W>(
    connection: Arc<Connection>,
    mut writer: W,
    mut queue: mpsc::UnboundedReceiver<Vec<u8>>,
    mut shutdown: watch::Receiver<bool>,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::select! {
            biased;
            frame = queue.recv() => frame,
            _ = shutdown.changed() => None,
        };
        let Some(frame) = frame else {
            break;
        };
        if let Err(e) = write_batch(&mut writer, frame, &mut queue).await {
            connection.begin_close(Some(TransportError::WriteFailed { source: e }));
            return;
        }
    }

    // Graceful close: flush whatever was accepted before closing.
    while let Ok(frame) = queue.try_recv() {
        if writer.write_all(&frame).await.is_err() {
            return;
        }
    }
    let _ = writer.flush().await;
    let _ = writer.shutdown().await;
}

/// Writes `first` and every frame queued behind it, then flushes once.
async fn write_batch<W>(
    writer: &mut W,
    first: Vec<u8>,
    queue: &mut mpsc::UnboundedReceiver<Vec<u8>>,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&first).await?;
    while let Ok(frame) = queue.try_recv() {
        writer.write_all(&frame).await?;
    }
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::LengthPrefixedCodec;
    use crate::transport::{Address, TcpTransport, TransportConfig};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::mpsc::UnboundedSender;

    struct Recorder {
        frames: UnboundedSender<Vec<u8>>,
        closes: AtomicUsize,
        closed: UnboundedSender<Option<String>>,
    }

    impl FrameListener for Recorder {
        fn on_frame(&self, _connection: &Arc<Connection>, frame: Vec<u8>) {
            let _ = self.frames.send(frame);
        }

        fn on_closed(&self, _connection: &Arc<Connection>, error: Option<TransportError>) {
            self.closes.fetch_add(1, Ordering::SeqCst);
            let _ = self.closed.send(error.map(|e| e.to_string()));
        }
    }

    fn recorder() -> (
        Arc<Recorder>,
        mpsc::UnboundedReceiver<Vec<u8>>,
        mpsc::UnboundedReceiver<Option<String>>,
    ) {
        let (frames, frames_rx) = mpsc::unbounded_channel();
        let (closed, closed_rx) = mpsc::unbounded_channel();
        let recorder = Arc::new(Recorder {
            frames,
            closes: AtomicUsize::new(0),
            closed,
        });
        (recorder, frames_rx, closed_rx)
    }

    async fn pair() -> (TcpTransport, TcpTransport) {
        let listener = TcpTransport::bind(&"tcp://127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = Address::tcp(listener.local_addr().unwrap());
        let accept = tokio::spawn(async move { TcpTransport::accept(&listener, true).await });
        let client = TcpTransport::connect(&addr, &TransportConfig::default())
            .await
            .unwrap();
        let (server, _) = accept.await.unwrap().unwrap();
        (client, server)
    }

    fn codec() -> Arc<dyn WireCodec> {
        Arc::new(LengthPrefixedCodec::new(1024))
    }

    #[tokio::test]
    async fn test_frames_arrive_in_send_order() {
        let (client, server) = pair().await;
        let (client_listener, _, _) = recorder();
        let (server_listener, mut frames, _) = recorder();
        let sender = Connection::spawn(client, codec(), client_listener, 16);
        let _receiver = Connection::spawn(server, codec(), server_listener, 16);

        for i in 0..100u32 {
            sender.send(i.to_be_bytes().to_vec()).unwrap();
        }
        for i in 0..100u32 {
            assert_eq!(frames.recv().await.unwrap(), i.to_be_bytes().to_vec());
        }
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_reported_once() {
        let (client, server) = pair().await;
        let (client_listener, _, mut client_closed) = recorder();
        let (server_listener, _, mut server_closed) = recorder();
        let connection = Connection::spawn(client, codec(), client_listener.clone(), 64);
        let _peer = Connection::spawn(server, codec(), server_listener, 64);

        connection.close();
        connection.close();
        assert_eq!(client_closed.recv().await.unwrap(), None);
        assert_eq!(server_closed.recv().await.unwrap(), None);
        assert!(matches!(connection.send(vec![1]), Err(TransportError::Closed)));

        tokio::task::yield_now().await;
        assert_eq!(client_listener.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_oversized_frame_closes_receiver() {
        let (mut client, server) = pair().await;
        let (server_listener, mut frames, mut closed) = recorder();
        let _receiver = Connection::spawn(server, codec(), server_listener, 64);

        client.write_all(&u32::MAX.to_be_bytes()).await.unwrap();
        let reason = closed.recv().await.unwrap().unwrap();
        assert!(reason.contains("exceeds maximum"));
        assert!(frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_rejects_oversized_payload_without_closing() {
        let (client, server) = pair().await;
        let (client_listener, _, _) = recorder();
        let (server_listener, mut frames, _) = recorder();
        let sender = Connection::spawn(client, codec(), client_listener, 64);
        let _receiver = Connection::spawn(server, codec(), server_listener, 64);

        assert!(matches!(
            sender.send(vec![0; 2048]),
            Err(TransportError::FrameTooLarge { .. })
        ));
        sender.send(b"ok".to_vec()).unwrap();
        assert_eq!(frames.recv().await.unwrap(), b"ok".to_vec());
        assert!(!sender.is_closed());
    }
}
