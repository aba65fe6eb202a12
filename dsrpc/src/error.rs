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

//! Top-level error type for DSRPC.
//!
//! Each layer has its own error type; [`DsrpcError`] composes them so
//! applications can use one type with `?` across layers:
//!
//! 1. **Transport** ([`TransportError`]): connection failures. They fail the
//!    pending calls of the affected connection and nothing else.
//! 2. **Serialization** ([`SerializationError`], [`DeserializationError`]):
//!    payloads that cannot be encoded or decoded.
//! 3. **Invocation** ([`InvokeError`]): remote faults, timeouts and
//!    registration conflicts.
//! 4. **Discovery** ([`FilterError`], [`EndpointError`]): malformed filters
//!    and endpoint registry failures.
//!
//! # Examples
//!
//! ```rust
//! use dsrpc::DsrpcError;
//! use dsrpc::filter::Filter;
//! use dsrpc::transport::TransportError;
//!
//! let error: DsrpcError = TransportError::Closed.into();
//! assert!(error.is_transport_error());
//!
//! let error: DsrpcError = Filter::parse("(a=b").unwrap_err().into();
//! assert!(!error.is_recoverable());
//! ```

use crate::endpoint::EndpointError;
use crate::filter::FilterError;
use crate::serialization::{DeserializationError, SerializationError};
use crate::service::InvokeError;
use crate::transport::TransportError;
use thiserror::Error;

/// Any error raised by this crate.
#[derive(Debug, Error)]
pub enum DsrpcError {
    /// A connection-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A payload could not be encoded.
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// A payload could not be decoded.
    #[error(transparent)]
    Deserialization(#[from] DeserializationError),

    /// A call or registration failed.
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    /// A filter string was malformed.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// The endpoint registry or discovery failed.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

impl DsrpcError {
    /// Returns `true` if this is a connection-level failure, directly or as
    /// the cause of a failed call.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            DsrpcError::Transport(_)
                | DsrpcError::Invoke(InvokeError::Transport(_) | InvokeError::ConnectionClosed)
        )
    }

    /// Returns `true` if the remote service raised a fault.
    pub fn is_fault(&self) -> bool {
        matches!(self, DsrpcError::Invoke(InvokeError::Fault(_)))
    }

    /// Returns `true` if repeating the operation may succeed.
    ///
    /// Nothing in this crate retries on its own; this tells callers which
    /// failures are worth retrying.
    pub fn is_recoverable(&self) -> bool {
        match self {
            DsrpcError::Transport(e) => e.is_recoverable(),
            DsrpcError::Invoke(e) => e.is_recoverable(),
            DsrpcError::Endpoint(e) => e.is_recoverable(),
            DsrpcError::Serialization(_)
            | DsrpcError::Deserialization(_)
            | DsrpcError::Filter(_) => false,
        }
    }
}
