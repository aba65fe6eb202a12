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

//! `scheme://host:port` addresses.

use crate::transport::TransportError;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Scheme of the built-in TCP transport.
pub const TCP_SCHEME: &str = "tcp";

/// A transport address of the form `scheme://host:port`.
///
/// Parsing only checks the syntax; whether a transport exists for the scheme
/// is decided when connecting or listening.
///
/// # Examples
///
/// ```rust
/// use dsrpc::transport::Address;
///
/// let address: Address = "tcp://127.0.0.1:9000".parse().unwrap();
/// assert_eq!(address.scheme(), "tcp");
/// assert_eq!(address.port(), 9000);
/// assert_eq!(address.to_string(), "tcp://127.0.0.1:9000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    scheme: String,
    host: String,
    port: u16,
}

impl Address {
    /// Creates an address from its parts.
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into().to_ascii_lowercase(),
            host: host.into(),
            port,
        }
    }

    /// Creates a `tcp://` address for a socket address.
    pub fn tcp(addr: SocketAddr) -> Self {
        Self::new(TCP_SCHEME, addr.ip().to_string(), addr.port())
    }

    /// The scheme, lower-cased.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The host name or IP literal, without IPv6 brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns `host:port` in the form socket APIs accept.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority())
    }
}

impl FromStr for Address {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TransportError::InvalidAddress {
            address: s.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, authority) = s
            .split_once("://")
            .ok_or_else(|| invalid("expected scheme://host:port"))?;
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-') {
            return Err(invalid("malformed scheme"));
        }
        let authority = authority.trim_end_matches('/');

        let (host, port) = if let Some(rest) = authority.strip_prefix('[') {
            let (host, port) = rest
                .split_once("]:")
                .ok_or_else(|| invalid("malformed IPv6 host"))?;
            (host, port)
        } else {
            authority
                .rsplit_once(':')
                .ok_or_else(|| invalid("missing port"))?
        };
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
        Ok(Address::new(scheme, host, port))
    }
}
