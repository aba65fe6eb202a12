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

//! JSON format and the `"json"` strategy.

use crate::serialization::{DeserializationError, SerializationError, Serializer, TaggedStrategy};

/// Name of the JSON-backed strategy.
pub const JSON_STRATEGY: &str = "json";

/// JSON serializer.
///
/// Human-readable and therefore handy when inspecting traffic or talking to
/// peers written in other languages. Larger and slower than postcard.
///
/// # Examples
///
/// ```rust
/// use dsrpc::serialization::{JsonSerializer, Serializer};
/// use dsrpc::value::Value;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let serializer = JsonSerializer::default();
/// let bytes = serializer.serialize(&Value::I32(7))?;
/// assert_eq!(String::from_utf8(bytes)?, r#"{"I32":7}"#);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned,
    {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

/// The `"json"` strategy: JSON over tagged values.
pub type JsonStrategy = TaggedStrategy<JsonSerializer>;

impl Default for JsonStrategy {
    fn default() -> Self {
        TaggedStrategy::new(JSON_STRATEGY, JsonSerializer::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Request;
    use crate::serialization::{NoSchema, Strategy};
    use crate::value::{Value, ValueType};

    #[test]
    fn test_strategy_request() {
        let strategy = JsonStrategy::default();
        assert_eq!(strategy.name(), "json");

        let request = Request::new(
            "svc",
            "concat",
            vec![Value::from("a"), Value::array(ValueType::String, vec![Value::from("b")])],
        );
        let bytes = strategy.encode_request(&request, None).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("concat"));
        assert_eq!(strategy.decode_request(&bytes, &NoSchema).unwrap(), request);
    }

    #[test]
    fn test_strategy_coerces_result() {
        let strategy = JsonStrategy::default();
        let bytes = strategy.encode_response(&Ok(Value::I32(5)), None).unwrap();
        let outcome = strategy.decode_response(&bytes, Some(&ValueType::I64)).unwrap();
        assert_eq!(outcome, Ok(Value::I64(5)));
    }
}
