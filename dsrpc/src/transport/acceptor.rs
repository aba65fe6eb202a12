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

//! Opening connections by address.

use crate::serialization::{LengthPrefixedCodec, WireCodec};
use crate::transport::{
    Address, Connection, FrameListener, TcpTransport, TransportConfig, TransportError, TCP_SCHEME,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, instrument};

fn codec_for(config: &TransportConfig) -> Arc<dyn WireCodec> {
    Arc::new(LengthPrefixedCodec::new(config.max_frame_size))
}

fn ensure_supported(address: &Address) -> Result<(), TransportError> {
    if address.scheme() == TCP_SCHEME {
        Ok(())
    } else {
        Err(TransportError::UnsupportedScheme {
            scheme: address.scheme().to_string(),
        })
    }
}

/// Opens a framed connection to `address`.
///
/// # Errors
///
/// Returns [`TransportError::UnsupportedScheme`] for schemes without a
/// transport, and the transport's connect error otherwise.
pub async fn connect(
    address: &Address,
    config: &TransportConfig,
    listener: Arc<dyn FrameListener>,
) -> Result<Arc<Connection>, TransportError> {
    ensure_supported(address)?;
    let transport = TcpTransport::connect(address, config).await?;
    Ok(Connection::spawn(
        transport,
        codec_for(config),
        listener,
        config.read_buffer_size,
    ))
}

/// Listens on `address`.
///
/// # Errors
///
/// Returns [`TransportError::UnsupportedScheme`] for schemes without a
/// transport and [`TransportError::BindFailed`] if the address is unavailable.
pub async fn listen(address: &Address, config: &TransportConfig) -> Result<Acceptor, TransportError> {
    ensure_supported(address)?;
    let listener = TcpTransport::bind(address).await?;
    let local = listener
        .local_addr()
        .map_err(|source| TransportError::Io { source })?;
    Ok(Acceptor {
        listener,
        local_address: Address::tcp(local),
        config: config.clone(),
    })
}

/// Accepts inbound connections on a bound address.
#[derive(Debug)]
pub struct Acceptor {
    listener: TcpListener,
    local_address: Address,
    config: TransportConfig,
}

impl Acceptor {
    /// The address actually bound, with the real port if `0` was requested.
    pub fn local_address(&self) -> &Address {
        &self.local_address
    }

    /// Waits for the next peer and starts a connection that reports to
    /// `listener`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if accepting fails. The acceptor stays
    /// usable afterwards.
    #[instrument(skip_all, fields(address = %self.local_address))]
    pub async fn accept(
        &self,
        listener: Arc<dyn FrameListener>,
    ) -> Result<Arc<Connection>, TransportError> {
        let (transport, peer_addr) = TcpTransport::accept(&self.listener, self.config.nodelay).await?;
        info!(%peer_addr, "accepted connection");
        Ok(Connection::spawn(
            transport,
            codec_for(&self.config),
            listener,
            self.config.read_buffer_size,
        ))
    }
}
