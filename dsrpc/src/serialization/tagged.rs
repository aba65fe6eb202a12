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

//! Strategies that encode the self-describing [`Value`] tree with a serde format.

use crate::protocol::{Outcome, Request};
use crate::serialization::{
    DeserializationError, SchemaSource, SerializationError, Serializer, Strategy,
};
use crate::value::ValueType;

/// A [`Strategy`] that writes requests and outcomes as tagged values using any
/// [`Serializer`].
///
/// Decoded results are coerced to the declared return type when the caller
/// supplies one.
///
/// [`Value`]: crate::value::Value
#[derive(Debug, Clone)]
pub struct TaggedStrategy<S> {
    name: String,
    serializer: S,
}

impl<S: Serializer> TaggedStrategy<S> {
    /// Creates a strategy registered under `name`.
    pub fn new(name: impl Into<String>, serializer: S) -> Self {
        Self {
            name: name.into(),
            serializer,
        }
    }
}

impl<S: Serializer> Strategy for TaggedStrategy<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn encode_request(
        &self,
        request: &Request,
        _params: Option<&[ValueType]>,
    ) -> Result<Vec<u8>, SerializationError> {
        self.serializer.serialize(request)
    }

    fn decode_request(
        &self,
        bytes: &[u8],
        _schema: &dyn SchemaSource,
    ) -> Result<Request, DeserializationError> {
        self.serializer.deserialize(bytes)
    }

    fn encode_response(
        &self,
        outcome: &Outcome,
        _returns: Option<&ValueType>,
    ) -> Result<Vec<u8>, SerializationError> {
        self.serializer.serialize(outcome)
    }

    fn decode_response(
        &self,
        bytes: &[u8],
        returns: Option<&ValueType>,
    ) -> Result<Outcome, DeserializationError> {
        let outcome: Outcome = self.serializer.deserialize(bytes)?;
        match (outcome, returns) {
            (Ok(value), Some(returns)) => value
                .coerce(returns)
                .map(Ok)
                .map_err(|e| DeserializationError::with_source("unexpected result type", e)),
            (outcome, _) => Ok(outcome),
        }
    }
}
