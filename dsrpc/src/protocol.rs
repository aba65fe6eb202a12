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

//! Message envelope and call payloads.
//!
//! Each frame on a connection carries one postcard-encoded [`Message`]. The
//! envelope names the strategy used for its body so that the receiving side
//! can decode the [`Request`] or [`Outcome`] inside.

use crate::serialization::{
    DeserializationError, PostcardSerializer, SerializationError, Serializer,
};
use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};

/// Direction of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// Client to server.
    Request,
    /// Server to client.
    Response,
}

/// The envelope carried in every frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Matches a response to its request. Never 0.
    pub correlation_id: u64,
    /// Request or response.
    pub kind: MessageKind,
    /// Name of the strategy that encoded `body`.
    pub strategy: String,
    /// Strategy-encoded request or outcome.
    pub body: Vec<u8>,
}

impl Message {
    /// Creates a request envelope.
    pub fn request(correlation_id: u64, strategy: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            correlation_id,
            kind: MessageKind::Request,
            strategy: strategy.into(),
            body,
        }
    }

    /// Creates a response envelope.
    pub fn response(correlation_id: u64, strategy: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            correlation_id,
            kind: MessageKind::Response,
            strategy: strategy.into(),
            body,
        }
    }

    /// Encodes the envelope.
    ///
    /// # Errors
    ///
    /// Returns a [`SerializationError`] if postcard rejects the envelope.
    pub fn encode(&self) -> Result<Vec<u8>, SerializationError> {
        PostcardSerializer::default().serialize(self)
    }

    /// Decodes an envelope from a frame.
    ///
    /// # Errors
    ///
    /// Returns a [`DeserializationError`] if the frame is not an envelope.
    pub fn decode(frame: &[u8]) -> Result<Self, DeserializationError> {
        PostcardSerializer::default().deserialize(frame)
    }
}

/// A remote method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Identifies the service registration on the server.
    pub service_id: String,
    /// Method name; overloads are resolved from the argument types.
    pub method: String,
    /// Ordered arguments.
    pub args: Vec<Value>,
}

impl Request {
    /// Creates a request.
    pub fn new(service_id: impl Into<String>, method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            service_id: service_id.into(),
            method: method.into(),
            args,
        }
    }

    /// Returns the runtime types of the arguments.
    pub fn arg_types(&self) -> Vec<ValueType> {
        self.args.iter().map(Value::value_type).collect()
    }
}

/// A classified remote failure.
///
/// The `class` string identifies the kind of failure across process
/// boundaries; the constants on this type name the ones the runtime raises
/// itself. Service implementations are free to use their own classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{class}: {message}")]
pub struct Fault {
    /// Failure classification.
    pub class: String,
    /// Human-readable detail.
    pub message: String,
}

impl Fault {
    /// No service is registered under the requested id.
    pub const UNKNOWN_SERVICE: &'static str = "UnknownService";
    /// No method accepts the name and argument types of the request.
    pub const NO_SUCH_METHOD: &'static str = "NoSuchMethod";
    /// The request body could not be decoded.
    pub const MALFORMED_REQUEST: &'static str = "MalformedRequest";
    /// The service factory could not provide an instance.
    pub const SERVICE_UNAVAILABLE: &'static str = "ServiceUnavailable";
    /// The target method panicked.
    pub const PANIC: &'static str = "Panic";
    /// Generic failure raised by a service method.
    pub const APPLICATION: &'static str = "Application";

    /// Creates a fault.
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
        }
    }

    /// Creates an `Application` fault.
    pub fn application(message: impl Into<String>) -> Self {
        Self::new(Self::APPLICATION, message)
    }

    /// Creates an `UnknownService` fault.
    pub fn unknown_service(service_id: &str) -> Self {
        Self::new(Self::UNKNOWN_SERVICE, format!("no service registered as '{service_id}'"))
    }

    /// Returns `true` if the fault has the given class.
    pub fn is(&self, class: &str) -> bool {
        self.class == class
    }
}

/// Result of a remote call as carried in a response.
pub type Outcome = Result<Value, Fault>;
