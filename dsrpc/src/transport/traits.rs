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

//! Transport trait definitions.

use crate::transport::{Connection, TransportError, TransportMetadata};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

/// A bidirectional byte stream to a peer.
///
/// Transports are raw streams; framing is applied on top by a
/// [`WireCodec`](crate::serialization::WireCodec) inside a [`Connection`],
/// which splits the stream and shuts down its write half on close.
pub trait Transport: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static {
    /// Returns metadata about this transport.
    fn metadata(&self) -> &TransportMetadata;
}

/// Receives frames and closure notifications from a [`Connection`].
///
/// Both callbacks run on the connection's reader task. `on_frame` must not
/// block; long work belongs in a spawned task. `on_closed` fires exactly once
/// per connection, after which no further frames are delivered.
pub trait FrameListener: Send + Sync + 'static {
    /// A complete frame arrived.
    fn on_frame(&self, connection: &Arc<Connection>, frame: Vec<u8>);

    /// The connection closed. `error` is `None` for a graceful close by
    /// either side.
    fn on_closed(&self, connection: &Arc<Connection>, error: Option<TransportError>);
}
