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

//! Postcard format and the `"default"` strategy.
//!
//! Postcard is a compact, deterministic binary format. It encodes message
//! envelopes and, through [`PostcardStrategy`], the tagged [`Value`] trees of
//! requests and responses.
//!
//! [`Value`]: crate::value::Value

use crate::serialization::{DeserializationError, SerializationError, Serializer, TaggedStrategy};

/// Name of the postcard-backed strategy.
pub const DEFAULT_STRATEGY: &str = "default";

/// Postcard serializer with an optional input size limit.
///
/// # Examples
///
/// ```rust
/// use dsrpc::serialization::{PostcardSerializer, Serializer};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let serializer = PostcardSerializer::new().with_max_size(1024);
/// let bytes = serializer.serialize(&(1u8, "two"))?;
/// let (one, two): (u8, String) = serializer.deserialize(&bytes)?;
/// assert_eq!((one, two.as_str()), (1, "two"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct PostcardSerializer {
    max_size: Option<usize>,
}

impl PostcardSerializer {
    /// Creates a serializer without a size limit.
    pub fn new() -> Self {
        Self { max_size: None }
    }

    /// Rejects inputs larger than `max_size` bytes when deserializing.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }
}

impl Serializer for PostcardSerializer {
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        Ok(postcard::to_allocvec(value)?)
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned,
    {
        if let Some(max_size) = self.max_size {
            if bytes.len() > max_size {
                return Err(DeserializationError::new(format!(
                    "Data size {} exceeds maximum allowed size {}",
                    bytes.len(),
                    max_size
                )));
            }
        }
        Ok(postcard::from_bytes(bytes)?)
    }

    fn name(&self) -> &'static str {
        "postcard"
    }
}

/// The `"default"` strategy: postcard over tagged values.
///
/// Every argument carries its runtime type, so requests decode without a
/// schema and overload resolution sees the caller's exact types.
pub type PostcardStrategy = TaggedStrategy<PostcardSerializer>;

impl Default for PostcardStrategy {
    fn default() -> Self {
        TaggedStrategy::new(DEFAULT_STRATEGY, PostcardSerializer::default())
    }
}
