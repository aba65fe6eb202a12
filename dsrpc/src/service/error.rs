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

//! Errors raised by invokers and calls.

use crate::protocol::Fault;
use crate::serialization::{DeserializationError, SerializationError};
use crate::transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Failure of a remote call or an invoker operation.
///
/// # Examples
///
/// ```rust
/// use dsrpc::protocol::Fault;
/// use dsrpc::service::InvokeError;
///
/// let error = InvokeError::from(Fault::new("NoSuchMethod", "f(string)"));
/// assert_eq!(error.fault().map(|f| f.class.as_str()), Some("NoSuchMethod"));
/// assert!(!error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The remote side answered with a fault, including dispatch faults
    /// such as `UnknownService` and `NoSuchMethod`.
    #[error("remote fault: {0}")]
    Fault(#[from] Fault),

    /// No response arrived before the call's deadline.
    #[error("call timed out after {duration:?}")]
    Timeout {
        /// The deadline that elapsed.
        duration: Duration,
    },

    /// The connection failed or closed while the call was outstanding.
    #[error("connection closed before a response arrived")]
    ConnectionClosed,

    /// A service is already registered under this id.
    #[error("service '{service_id}' is already registered")]
    AlreadyRegistered {
        /// The contested id.
        service_id: String,
    },

    /// No strategy is registered under this name.
    #[error("unknown serialization strategy '{name}'")]
    UnknownStrategy {
        /// The requested name.
        name: String,
    },

    /// The connection could not be established or used.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The request could not be encoded.
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// The response could not be decoded.
    #[error(transparent)]
    Deserialization(#[from] DeserializationError),
}

impl InvokeError {
    /// Returns the remote fault, if this is one.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            InvokeError::Fault(fault) => Some(fault),
            _ => None,
        }
    }

    /// Returns `true` for timeouts.
    pub const fn is_timeout(&self) -> bool {
        matches!(self, InvokeError::Timeout { .. })
    }

    /// Returns `true` if issuing the call again may succeed.
    ///
    /// Nothing is retried automatically.
    pub fn is_recoverable(&self) -> bool {
        match self {
            InvokeError::Timeout { .. } | InvokeError::ConnectionClosed => true,
            InvokeError::Transport(e) => e.is_recoverable(),
            InvokeError::Fault(_)
            | InvokeError::AlreadyRegistered { .. }
            | InvokeError::UnknownStrategy { .. }
            | InvokeError::Serialization(_)
            | InvokeError::Deserialization(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability() {
        assert!(InvokeError::ConnectionClosed.is_recoverable());
        assert!(InvokeError::Timeout { duration: Duration::from_secs(1) }.is_recoverable());
        assert!(!InvokeError::UnknownStrategy { name: "xml".into() }.is_recoverable());
        assert!(!InvokeError::Transport(TransportError::Closed).is_recoverable());
    }

    #[test]
    fn test_display() {
        let error = InvokeError::AlreadyRegistered { service_id: "calc".into() };
        assert_eq!(error.to_string(), "service 'calc' is already registered");
        let error = InvokeError::from(Fault::application("boom"));
        assert_eq!(error.to_string(), "remote fault: Application: boom");
    }
}
