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

//! Connection-level settings.

use crate::serialization::MAX_FRAME_SIZE;
use std::time::Duration;

/// Settings applied to every connection a client or server opens.
///
/// # Examples
///
/// ```rust
/// use dsrpc::transport::TransportConfig;
/// use std::time::Duration;
///
/// let config = TransportConfig {
///     connect_timeout: Duration::from_secs(2),
///     ..Default::default()
/// };
/// assert_eq!(config.max_frame_size, 16 * 1024 * 1024);
/// ```
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Largest frame payload accepted or sent, in bytes.
    ///
    /// Default: 16 MiB
    pub max_frame_size: u32,

    /// Time allowed for establishing an outbound connection.
    ///
    /// Default: 10 seconds
    pub connect_timeout: Duration,

    /// Disable Nagle's algorithm on TCP sockets.
    ///
    /// Default: true
    pub nodelay: bool,

    /// Size of the buffer used for each socket read.
    ///
    /// Default: 8 KiB
    pub read_buffer_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
            connect_timeout: Duration::from_secs(10),
            nodelay: true,
            read_buffer_size: 8 * 1024,
        }
    }
}
