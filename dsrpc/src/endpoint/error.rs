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

//! Error types for the endpoint layer.

use crate::filter::FilterError;
use crate::service::InvokeError;
use thiserror::Error;

/// Errors raised by endpoint descriptions, discovery and the registry.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// A mandatory attribute is absent or has the wrong kind.
    #[error("endpoint attribute '{attribute}' is missing or invalid: {reason}")]
    InvalidAttribute {
        /// The attribute key.
        attribute: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An interest filter could not be parsed.
    #[error(transparent)]
    InvalidFilter(#[from] FilterError),

    /// The server invoker has no listening address to advertise.
    #[error("the server invoker is not bound to an address")]
    NotBound,

    /// No export with this id exists.
    #[error("endpoint '{endpoint_id}' is not exported by this registry")]
    NotExported {
        /// The endpoint id.
        endpoint_id: String,
    },

    /// The discovery collaborator rejected an announcement or retraction.
    #[error("discovery failed: {reason}")]
    Discovery {
        /// Description of the failure.
        reason: String,
    },

    /// Registering with the server invoker failed.
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    /// A description could not be encoded or decoded as JSON.
    #[error("endpoint description encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl EndpointError {
    pub(crate) fn invalid(attribute: &str, reason: impl Into<String>) -> Self {
        EndpointError::InvalidAttribute {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if repeating the operation may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            EndpointError::Discovery { .. } => true,
            EndpointError::Invoke(e) => e.is_recoverable(),
            _ => false,
        }
    }
}
