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

//! Serialization trait definitions.
//!
//! Two layers of abstraction live here:
//!
//! - [`Serializer`]: a serde format (postcard, JSON). Generic over the value
//!   being encoded, so it is used through concrete types.
//! - [`Strategy`]: an object-safe, named payload encoding for calls. The
//!   server answers with whatever strategy a request names, so strategies are
//!   looked up at runtime from a [`StrategyRegistry`](super::StrategyRegistry).

use crate::protocol::{Outcome, Request};
use crate::serialization::{DeserializationError, SerializationError};
use crate::value::ValueType;

/// A serde data format.
///
/// # Examples
///
/// ```rust
/// use dsrpc::serialization::{PostcardSerializer, Serializer};
/// use dsrpc::value::Value;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let serializer = PostcardSerializer::default();
/// let bytes = serializer.serialize(&Value::I32(42))?;
/// let decoded: Value = serializer.deserialize(&bytes)?;
/// assert_eq!(decoded, Value::I32(42));
/// # Ok(())
/// # }
/// ```
pub trait Serializer: Send + Sync + 'static {
    /// Serializes a value to bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`SerializationError`] if the format rejects the value.
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized;

    /// Deserializes a value from bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`DeserializationError`] for malformed or truncated input.
    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned;

    /// Returns the format name, e.g. `"postcard"`.
    fn name(&self) -> &'static str;
}

/// Declared parameter types of a remote method, as known to the server.
///
/// Untagged strategies cannot decode arguments without knowing their types;
/// the server implements this to expose the signatures of its registered
/// services.
pub trait SchemaSource: Send + Sync {
    /// Returns the parameter types of `method` on `service_id`.
    ///
    /// Returns `None` if the service is unknown, the method does not exist, or
    /// the name is overloaded.
    fn parameter_types(&self, service_id: &str, method: &str) -> Option<Vec<ValueType>>;
}

/// A schema source that knows no signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSchema;

impl SchemaSource for NoSchema {
    fn parameter_types(&self, _service_id: &str, _method: &str) -> Option<Vec<ValueType>> {
        None
    }
}

/// A named encoding for request and response bodies.
///
/// Request and response of one call always use the same strategy: the client
/// encodes with the strategy its method declares, names it in the envelope,
/// and the server answers with that strategy.
pub trait Strategy: Send + Sync + 'static {
    /// The name carried in message envelopes.
    fn name(&self) -> &str;

    /// Encodes a request.
    ///
    /// `params` holds the declared parameter types of the target method when
    /// the caller knows them.
    ///
    /// # Errors
    ///
    /// Returns a [`SerializationError`] if the request cannot be encoded.
    fn encode_request(
        &self,
        request: &Request,
        params: Option<&[ValueType]>,
    ) -> Result<Vec<u8>, SerializationError>;

    /// Decodes a request, consulting `schema` for declared parameter types.
    ///
    /// # Errors
    ///
    /// Returns a [`DeserializationError`] for malformed input.
    fn decode_request(
        &self,
        bytes: &[u8],
        schema: &dyn SchemaSource,
    ) -> Result<Request, DeserializationError>;

    /// Encodes the outcome of a call.
    ///
    /// `returns` is the declared return type of the method that produced it.
    ///
    /// # Errors
    ///
    /// Returns a [`SerializationError`] if the outcome cannot be encoded.
    fn encode_response(
        &self,
        outcome: &Outcome,
        returns: Option<&ValueType>,
    ) -> Result<Vec<u8>, SerializationError>;

    /// Decodes the outcome of a call.
    ///
    /// # Errors
    ///
    /// Returns a [`DeserializationError`] for malformed input.
    fn decode_response(
        &self,
        bytes: &[u8],
        returns: Option<&ValueType>,
    ) -> Result<Outcome, DeserializationError>;
}
