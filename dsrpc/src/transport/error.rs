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

//! Transport layer error types.
//!
//! Transport errors are the lowest level of the error hierarchy. A transport
//! error on an established connection closes that connection, fails every
//! call pending on it and is reported to the connection's
//! [`FrameListener`](super::FrameListener); it never reaches unrelated
//! connections or the accept loop.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by addresses, listeners and connections.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not establish a connection.
    #[error("failed to connect to {address}: {source}")]
    ConnectionFailed {
        /// Target address.
        address: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An established connection ended unexpectedly.
    #[error("connection lost: {reason}")]
    ConnectionLost {
        /// What happened.
        reason: String,
        /// Underlying I/O error, if any.
        #[source]
        source: Option<io::Error>,
    },

    /// Reading from the socket failed.
    #[error("read failed: {source}")]
    ReadFailed {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Writing to the socket failed.
    #[error("write failed: {source}")]
    WriteFailed {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An operation exceeded its time limit.
    #[error("operation timed out after {duration:?}")]
    Timeout {
        /// The limit that elapsed.
        duration: Duration,
    },

    /// A frame length exceeded the configured maximum.
    #[error("frame of {size} bytes exceeds maximum of {max} bytes")]
    FrameTooLarge {
        /// Announced or actual payload size.
        size: u64,
        /// Configured maximum.
        max: u32,
    },

    /// The address scheme has no transport.
    #[error("unsupported address scheme '{scheme}'")]
    UnsupportedScheme {
        /// The scheme as written.
        scheme: String,
    },

    /// The address could not be parsed.
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress {
        /// The address as written.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Configuration values are inconsistent.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// What is wrong.
        reason: String,
    },

    /// The connection or listener has been closed.
    #[error("transport is closed")]
    Closed,

    /// Could not listen on the address.
    #[error("failed to bind to {address}: {source}")]
    BindFailed {
        /// Requested address.
        address: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Any other I/O error.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    /// Returns `true` if retrying the operation (or reconnecting) may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            TransportError::ConnectionFailed { .. }
            | TransportError::ConnectionLost { .. }
            | TransportError::Timeout { .. } => true,

            TransportError::ReadFailed { source }
            | TransportError::WriteFailed { source }
            | TransportError::Io { source } => matches!(
                source.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),

            TransportError::FrameTooLarge { .. }
            | TransportError::UnsupportedScheme { .. }
            | TransportError::InvalidAddress { .. }
            | TransportError::InvalidConfiguration { .. }
            | TransportError::Closed
            | TransportError::BindFailed { .. } => false,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => TransportError::ConnectionLost {
                reason: source.to_string(),
                source: Some(source),
            },
            _ => TransportError::Io { source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let lost = TransportError::ConnectionLost {
            reason: "reset".into(),
            source: None,
        };
        assert!(lost.is_recoverable());

        let corrupt = TransportError::FrameTooLarge { size: 1 << 30, max: 1024 };
        assert!(!corrupt.is_recoverable());

        let scheme = TransportError::UnsupportedScheme { scheme: "udp".into() };
        assert!(!scheme.is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert!(matches!(TransportError::from(reset), TransportError::ConnectionLost { .. }));

        let other = io::Error::other("other");
        assert!(matches!(TransportError::from(other), TransportError::Io { .. }));
    }

    #[test]
    fn test_display() {
        let error = TransportError::FrameTooLarge { size: 20, max: 10 };
        assert_eq!(error.to_string(), "frame of 20 bytes exceeds maximum of 10 bytes");
    }
}
