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

/// Settings for a [`ServerInvoker`](crate::server::ServerInvoker).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Settings for accepted connections.
    pub transport: TransportConfig,

    /// Pause after a failed accept before trying again.
    ///
    /// Default: 100 milliseconds
    pub accept_backoff: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            accept_backoff: Duration::from_millis(100),
        }
    }
}
