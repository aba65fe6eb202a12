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

//! Serialization layer.
//!
//! # Overview
//!
//! - **[`framing`]**: the [`WireCodec`] that cuts a byte stream into frames
//! - **[`Serializer`]**: serde formats ([`PostcardSerializer`], [`JsonSerializer`])
//! - **[`Strategy`]**: named encodings for call payloads, looked up at runtime
//!   through a [`StrategyRegistry`]
//! - **Error types**: [`SerializationError`] and [`DeserializationError`]
//!
//! # Strategies
//!
//! | Name        | Type               | Encoding                                 |
//! |-------------|--------------------|------------------------------------------|
//! | `"default"` | [`PostcardStrategy`] | postcard, tagged values                |
//! | `"json"`    | [`JsonStrategy`]   | JSON, tagged values (`json` feature)     |
//! | `"schema"`  | [`SchemaStrategy`] | postcard scalars laid out by signature   |
//!
//! Tagged strategies carry every argument's runtime type, which is what
//! overload resolution on the server needs. The schema strategy trades that
//! for smaller payloads and only works for methods with a unique name.
//!
//! # Examples
//!
//! ```rust
//! use dsrpc::protocol::Request;
//! use dsrpc::serialization::{NoSchema, StrategyRegistry};
//! use dsrpc::value::Value;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let strategies = StrategyRegistry::default();
//! let strategy = strategies.get("default").ok_or("missing")?;
//!
//! let request = Request::new("calculator", "add", vec![Value::I32(1), Value::I32(2)]);
//! let bytes = strategy.encode_request(&request, None)?;
//! assert_eq!(strategy.decode_request(&bytes, &NoSchema)?, request);
//! # Ok(())
//! # }
//! ```

mod error;
pub mod framing;
#[cfg(feature = "json")]
mod json;
mod postcard;
mod registry;
mod schema;
mod tagged;
mod traits;

pub use error::{DeserializationError, SerializationError};
pub use framing::{LengthPrefixedCodec, WireCodec, MAX_FRAME_SIZE};
#[cfg(feature = "json")]
pub use json::{JsonSerializer, JsonStrategy, JSON_STRATEGY};
pub use self::postcard::{PostcardSerializer, PostcardStrategy, DEFAULT_STRATEGY};
pub use registry::StrategyRegistry;
pub use schema::{SchemaStrategy, SCHEMA_STRATEGY};
pub use tagged::TaggedStrategy;
pub use traits::{NoSchema, SchemaSource, Serializer, Strategy};
