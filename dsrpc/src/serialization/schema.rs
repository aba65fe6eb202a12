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

//! The `"schema"` strategy: untagged payloads laid out by declared types.
//!
//! A method signature acts as the schema. Arguments are written without type
//! tags, in the shape their formal parameter types dictate, using postcard's
//! encodings for the individual scalars:
//!
//! | Declared type        | Layout                                         |
//! |----------------------|------------------------------------------------|
//! | primitive            | the scalar                                     |
//! | nullable primitive   | presence flag, then the scalar if present      |
//! | `string`             | presence flag, then the text                   |
//! | `[t]`                | presence flag, varint length, elements as `t`  |
//! | anything else        | a tagged [`Value`]                             |
//!
//! A request is `service id, method name, argument count, arguments`. A
//! response is a tag byte (`0` value, `1` fault) followed by the value laid
//! out by the declared return type, or the fault's class and message.
//!
//! Overloaded method names have no single schema. The encoder refuses calls
//! without a declared signature and the decoder refuses methods its
//! [`SchemaSource`] cannot describe unambiguously.

use crate::protocol::{Fault, Outcome, Request};
use crate::serialization::{DeserializationError, SchemaSource, SerializationError, Strategy};
use crate::value::{Primitive, Value, ValueType};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Name of the schema-driven strategy.
pub const SCHEMA_STRATEGY: &str = "schema";

const OUTCOME_VALUE: u8 = 0;
const OUTCOME_FAULT: u8 = 1;

/// Untagged, signature-driven strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaStrategy;

impl SchemaStrategy {
    /// Creates the strategy.
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for SchemaStrategy {
    fn name(&self) -> &str {
        SCHEMA_STRATEGY
    }

    fn encode_request(
        &self,
        request: &Request,
        params: Option<&[ValueType]>,
    ) -> Result<Vec<u8>, SerializationError> {
        let params = params.ok_or_else(|| {
            SerializationError::new(format!(
                "method '{}' has no unique declared signature",
                request.method
            ))
        })?;
        if params.len() != request.args.len() {
            return Err(SerializationError::new(format!(
                "method '{}' declares {} parameters but {} arguments were given",
                request.method,
                params.len(),
                request.args.len()
            )));
        }

        let mut out = Vec::new();
        put(&mut out, request.service_id.as_str())?;
        put(&mut out, request.method.as_str())?;
        put(&mut out, &request.args.len())?;
        for (index, (arg, ty)) in request.args.iter().zip(params).enumerate() {
            write_value(&mut out, arg, ty).map_err(|e| {
                SerializationError::new(format!("argument {index}: {}", e.message()))
            })?;
        }
        Ok(out)
    }

    fn decode_request(
        &self,
        bytes: &[u8],
        schema: &dyn SchemaSource,
    ) -> Result<Request, DeserializationError> {
        let mut reader = Reader::new(bytes);
        let service_id: String = reader.take()?;
        let method: String = reader.take()?;
        let count: usize = reader.take()?;

        let params = schema.parameter_types(&service_id, &method).ok_or_else(|| {
            DeserializationError::new(format!(
                "no unique signature for '{method}' on service '{service_id}'"
            ))
        })?;
        if params.len() != count {
            return Err(DeserializationError::new(format!(
                "'{method}' expects {} arguments, payload carries {count}",
                params.len()
            )));
        }

        let args = params
            .iter()
            .map(|ty| read_value(&mut reader, ty))
            .collect::<Result<Vec<_>, _>>()?;
        reader.finish()?;
        Ok(Request {
            service_id,
            method,
            args,
        })
    }

    fn encode_response(
        &self,
        outcome: &Outcome,
        returns: Option<&ValueType>,
    ) -> Result<Vec<u8>, SerializationError> {
        let mut out = Vec::new();
        match outcome {
            Ok(value) => {
                put(&mut out, &OUTCOME_VALUE)?;
                write_value(&mut out, value, returns.unwrap_or(&ValueType::Any))?;
            }
            Err(fault) => {
                put(&mut out, &OUTCOME_FAULT)?;
                put(&mut out, fault.class.as_str())?;
                put(&mut out, fault.message.as_str())?;
            }
        }
        Ok(out)
    }

    fn decode_response(
        &self,
        bytes: &[u8],
        returns: Option<&ValueType>,
    ) -> Result<Outcome, DeserializationError> {
        let mut reader = Reader::new(bytes);
        let outcome = match reader.take::<u8>()? {
            OUTCOME_VALUE => Ok(read_value(&mut reader, returns.unwrap_or(&ValueType::Any))?),
            OUTCOME_FAULT => {
                let class: String = reader.take()?;
                let message: String = reader.take()?;
                Err(Fault { class, message })
            }
            tag => {
                return Err(DeserializationError::new(format!(
                    "invalid outcome tag {tag}"
                )));
            }
        };
        reader.finish()?;
        Ok(outcome)
    }
}

fn put<T: Serialize + ?Sized>(out: &mut Vec<u8>, value: &T) -> Result<(), SerializationError> {
    *out = postcard::to_extend(value, std::mem::take(out))?;
    Ok(())
}

fn write_value(out: &mut Vec<u8>, value: &Value, ty: &ValueType) -> Result<(), SerializationError> {
    let mismatch = || {
        SerializationError::new(format!(
            "{} is not assignable to {ty}",
            value.value_type()
        ))
    };
    match ty {
        ValueType::Primitive(_) => {
            let value = value.clone().coerce(ty).map_err(|_| mismatch())?;
            write_primitive(out, &value)
        }
        ValueType::Boxed(p) => match value.clone().coerce(ty).map_err(|_| mismatch())? {
            Value::Boxed(inner) => {
                put(out, &true)?;
                write_value(out, &inner, &ValueType::Primitive(*p))
            }
            _ => put(out, &false),
        },
        ValueType::String => match value {
            Value::String(s) => {
                put(out, &true)?;
                put(out, s.as_str())
            }
            Value::Null => put(out, &false),
            _ => Err(mismatch()),
        },
        ValueType::Array(element) => match value {
            Value::Null => put(out, &false),
            Value::Array(_, items) if ty.is_assignable_from(&value.value_type()) => {
                put(out, &true)?;
                put(out, &items.len())?;
                items
                    .iter()
                    .try_for_each(|item| write_value(out, item, element))
            }
            _ => Err(mismatch()),
        },
        ValueType::List
        | ValueType::Map
        | ValueType::Struct(_)
        | ValueType::Any
        | ValueType::Null => {
            if !ty.is_assignable_from(&value.value_type()) {
                return Err(mismatch());
            }
            put(out, value)
        }
    }
}

fn write_primitive(out: &mut Vec<u8>, value: &Value) -> Result<(), SerializationError> {
    match value {
        Value::Bool(v) => put(out, v),
        Value::I8(v) => put(out, v),
        Value::I16(v) => put(out, v),
        Value::I32(v) => put(out, v),
        Value::I64(v) => put(out, v),
        Value::F32(v) => put(out, v),
        Value::F64(v) => put(out, v),
        Value::Char(v) => put(out, v),
        other => Err(SerializationError::new(format!(
            "{} is not a primitive",
            other.value_type()
        ))),
    }
}

struct Reader<'a> {
    rest: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { rest: bytes }
    }

    fn take<T: DeserializeOwned>(&mut self) -> Result<T, DeserializationError> {
        let (value, rest) = postcard::take_from_bytes::<T>(self.rest)?;
        self.rest = rest;
        Ok(value)
    }

    fn finish(self) -> Result<(), DeserializationError> {
        if self.rest.is_empty() {
            Ok(())
        } else {
            Err(DeserializationError::new(format!(
                "{} trailing bytes after payload",
                self.rest.len()
            )))
        }
    }
}

fn read_value(reader: &mut Reader<'_>, ty: &ValueType) -> Result<Value, DeserializationError> {
    match ty {
        ValueType::Primitive(p) => read_primitive(reader, *p),
        ValueType::Boxed(p) => {
            if reader.take::<bool>()? {
                Ok(Value::Boxed(Box::new(read_primitive(reader, *p)?)))
            } else {
                Ok(Value::Null)
            }
        }
        ValueType::String => {
            if reader.take::<bool>()? {
                Ok(Value::String(reader.take()?))
            } else {
                Ok(Value::Null)
            }
        }
        ValueType::Array(element) => {
            if !reader.take::<bool>()? {
                return Ok(Value::Null);
            }
            let len: usize = reader.take()?;
            if len > reader.rest.len() {
                return Err(DeserializationError::new(format!(
                    "array length {len} exceeds remaining payload"
                )));
            }
            let items = (0..len)
                .map(|_| read_value(reader, element))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array((**element).clone(), items))
        }
        _ => reader.take::<Value>(),
    }
}

fn read_primitive(reader: &mut Reader<'_>, p: Primitive) -> Result<Value, DeserializationError> {
    Ok(match p {
        Primitive::Bool => Value::Bool(reader.take()?),
        Primitive::I8 => Value::I8(reader.take()?),
        Primitive::I16 => Value::I16(reader.take()?),
        Primitive::I32 => Value::I32(reader.take()?),
        Primitive::I64 => Value::I64(reader.take()?),
        Primitive::F32 => Value::F32(reader.take()?),
        Primitive::F64 => Value::F64(reader.take()?),
        Primitive::Char => Value::Char(reader.take()?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::{NoSchema, PostcardStrategy};

    struct Signatures(Vec<ValueType>);

    impl SchemaSource for Signatures {
        fn parameter_types(&self, _service_id: &str, _method: &str) -> Option<Vec<ValueType>> {
            Some(self.0.clone())
        }
    }

    fn params() -> Vec<ValueType> {
        vec![
            ValueType::I64,
            ValueType::Boxed(Primitive::I32),
            ValueType::String,
            ValueType::array(ValueType::F64),
            ValueType::Any,
        ]
    }

    #[test]
    fn test_request_round_trip_applies_declared_types() {
        let strategy = SchemaStrategy::new();
        let request = Request::new(
            "svc",
            "store",
            vec![
                Value::I32(7),
                Value::Null,
                Value::from("text"),
                Value::from(vec![1.5f64, 2.5]),
                Value::List(vec![Value::Bool(true)]),
            ],
        );
        let bytes = strategy.encode_request(&request, Some(&params())).unwrap();
        let decoded = strategy.decode_request(&bytes, &Signatures(params())).unwrap();

        assert_eq!(decoded.method, "store");
        assert_eq!(decoded.args[0], Value::I64(7));
        assert_eq!(decoded.args[1], Value::Null);
        assert_eq!(decoded.args[2], Value::from("text"));
        assert_eq!(decoded.args[3], Value::from(vec![1.5f64, 2.5]));
        assert_eq!(decoded.args[4], Value::List(vec![Value::Bool(true)]));
    }

    #[test]
    fn test_untagged_is_smaller_than_tagged() {
        let request = Request::new("svc", "sum", vec![Value::from((0..64).collect::<Vec<i32>>())]);
        let params = [ValueType::array(ValueType::I32)];
        let schema = SchemaStrategy::new().encode_request(&request, Some(&params)).unwrap();
        let tagged = PostcardStrategy::default().encode_request(&request, None).unwrap();
        assert!(schema.len() < tagged.len());
    }

    #[test]
    fn test_requires_signature() {
        let strategy = SchemaStrategy::new();
        let request = Request::new("svc", "f", vec![Value::I32(1)]);
        assert!(strategy.encode_request(&request, None).is_err());

        let bytes = strategy.encode_request(&request, Some(&[ValueType::I32])).unwrap();
        assert!(strategy.decode_request(&bytes, &NoSchema).is_err());
    }

    #[test]
    fn test_rejects_unassignable_argument() {
        let strategy = SchemaStrategy::new();
        let request = Request::new("svc", "f", vec![Value::I64(1)]);
        let error = strategy
            .encode_request(&request, Some(&[ValueType::I32]))
            .unwrap_err();
        assert!(error.message().contains("argument 0"));
    }

    #[test]
    fn test_response_round_trip() {
        let strategy = SchemaStrategy::new();
        let returns = ValueType::array(ValueType::Boxed(Primitive::I32));
        let value = Value::array(
            ValueType::Boxed(Primitive::I32),
            vec![Value::boxed(Value::I32(1))],
        );
        let bytes = strategy.encode_response(&Ok(value.clone()), Some(&returns)).unwrap();
        assert_eq!(strategy.decode_response(&bytes, Some(&returns)).unwrap(), Ok(value));

        let fault = Err(Fault::new("NoSuchMethod", "f(i32)"));
        let bytes = strategy.encode_response(&fault, Some(&returns)).unwrap();
        assert_eq!(strategy.decode_response(&bytes, Some(&returns)).unwrap(), fault);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let strategy = SchemaStrategy::new();
        let mut bytes = strategy.encode_response(&Ok(Value::I32(1)), Some(&ValueType::I32)).unwrap();
        bytes.push(0);
        assert!(strategy.decode_response(&bytes, Some(&ValueType::I32)).is_err());
    }
}
