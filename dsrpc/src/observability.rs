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

//! Observability support.
//!
//! Both invokers keep an [`InvocationMetrics`] instance, reachable through
//! their `metrics()` accessor. Logging goes through `tracing` everywhere; the
//! crate never installs a subscriber.
//!
//! # Metrics Integration
//!
//! With the `observability` feature enabled, every counter is also exported
//! through the `metrics` crate under the `dsrpc.` prefix:
//!
//! ```toml
//! [dependencies]
//! dsrpc = { version = "0.1", features = ["observability"] }
//! ```

mod metrics;

pub use self::metrics::{InvocationMetrics, MetricsSnapshot};
