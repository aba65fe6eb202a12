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

use crate::transport::TransportConfig;
use std::time::Duration;

/// Settings for a [`ClientInvoker`](crate::client::ClientInvoker).
///
/// # Examples
///
/// ```rust
/// use dsrpc::client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig {
///     call_timeout: Duration::from_secs(5),
///     ..Default::default()
/// };
/// assert!(config.transport.nodelay);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Deadline for calls that do not pass their own, measured from the
    /// moment the request is queued.
    ///
    /// Default: 30 seconds
    pub call_timeout: Duration,

    /// Settings for outbound connections.
    pub transport: TransportConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            transport: TransportConfig::default(),
        }
    }
}
