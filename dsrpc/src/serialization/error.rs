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

//! Errors raised while encoding or decoding envelopes and call payloads.

use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// A value could not be encoded.
///
/// Raised by serialization strategies when a request or outcome cannot be
/// turned into bytes, for example when an argument does not fit the declared
/// parameter type under the `"schema"` strategy.
///
/// # Examples
///
/// ```rust
/// use dsrpc::serialization::SerializationError;
///
/// let error = SerializationError::new("argument 0 is not assignable to i32");
/// assert!(error.to_string().contains("argument 0"));
/// ```
#[derive(Debug, Error)]
#[error("failed to encode: {message}")]
pub struct SerializationError {
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

/// Bytes could not be decoded.
///
/// Raised for truncated or corrupt payloads, for envelopes that do not parse,
/// and for `"schema"` payloads whose target method has no usable signature.
#[derive(Debug, Error)]
#[error("failed to decode: {message}")]
pub struct DeserializationError {
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

macro_rules! constructors {
    ($ty:ident) => {
        impl $ty {
            /// Creates an error with a message.
            pub fn new(message: impl Into<String>) -> Self {
                Self {
                    message: message.into(),
                    source: None,
                }
            }

            /// Creates an error with a message and an underlying cause.
            pub fn with_source(
                message: impl Into<String>,
                source: impl std::error::Error + Send + Sync + 'static,
            ) -> Self {
                Self {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }

            /// The message, without the cause.
            pub fn message(&self) -> &str {
                &self.message
            }
        }
    };
}

constructors!(SerializationError);
constructors!(DeserializationError);

impl From<postcard::Error> for SerializationError {
    fn from(err: postcard::Error) -> Self {
        Self::with_source(format!("postcard: {err}"), err)
    }
}

impl From<postcard::Error> for DeserializationError {
    fn from(err: postcard::Error) -> Self {
        Self::with_source(format!("postcard: {err}"), err)
    }
}

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(format!("json: {err}"), err)
    }
}

impl From<serde_json::Error> for DeserializationError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(format!("json: {err}"), err)
    }
}
