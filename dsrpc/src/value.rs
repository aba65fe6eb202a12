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

//! Dynamically typed call arguments and results.
//!
//! Remote calls are dispatched by method name and by the runtime types of the
//! arguments, so every argument travels as a [`Value`]: a tagged variant that
//! knows its own [`ValueType`]. Service implementations declare formal
//! parameter types as [`ValueType`]s, and the dispatcher uses
//! [`ValueType::conversion_from`] to decide which overload accepts a call.
//!
//! # Type model
//!
//! | `ValueType`          | Meaning                                          |
//! |----------------------|--------------------------------------------------|
//! | `Primitive(p)`       | A non-nullable scalar (`bool`, `i32`, `f64`, ..) |
//! | `Boxed(p)`           | A nullable wrapper around a primitive            |
//! | `String`             | UTF-8 text                                       |
//! | `Array(t)`           | Homogeneous array of `t` (any rank)              |
//! | `List` / `Map`       | Heterogeneous collections                        |
//! | `Struct(name)`       | A named record                                   |
//! | `Any`                | Top type, accepts every value                    |
//! | `Null`               | Runtime type of [`Value::Null`]                  |
//!
//! # Examples
//!
//! ```rust
//! use dsrpc::value::{Conversion, Primitive, Value, ValueType};
//!
//! let arg = Value::from(vec![1i32, 2, 3]);
//! assert_eq!(arg.value_type(), ValueType::array(ValueType::I32));
//!
//! // `[i32]` is only accepted by `[i32]` parameters (or `any`).
//! assert_eq!(
//!     ValueType::array(ValueType::I32).conversion_from(&arg.value_type()),
//!     Some(Conversion::Exact)
//! );
//! assert_eq!(
//!     ValueType::array(ValueType::Boxed(Primitive::I32)).conversion_from(&arg.value_type()),
//!     None
//! );
//! ```

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Primitive scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Primitive {
    /// Boolean.
    Bool,
    /// 8-bit signed integer.
    I8,
    /// 16-bit signed integer.
    I16,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// Unicode scalar value.
    Char,
}

impl Primitive {
    /// Returns `true` if values of `self` convert to `target` by widening.
    ///
    /// Widening follows the usual lossless-by-magnitude ladder:
    /// `i8 → i16 → i32 → i64 → f32 → f64`, with `char` joining at `i32`.
    /// A primitive never widens to itself.
    #[must_use]
    pub const fn widens_to(self, target: Primitive) -> bool {
        use Primitive::*;
        matches!(
            (self, target),
            (I8, I16 | I32 | I64 | F32 | F64)
                | (I16, I32 | I64 | F32 | F64)
                | (Char, I32 | I64 | F32 | F64)
                | (I32, I64 | F32 | F64)
                | (I64, F32 | F64)
                | (F32, F64)
        )
    }

    /// Returns the lower-case name used in signatures.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::I8 => "i8",
            Primitive::I16 => "i16",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::Char => "char",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type descriptor for a [`Value`] or a declared parameter/return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub enum ValueType {
    /// A non-nullable primitive.
    Primitive(Primitive),
    /// A nullable wrapper around a primitive.
    Boxed(Primitive),
    /// UTF-8 text.
    String,
    /// Array with the given element type.
    Array(Box<ValueType>),
    /// Heterogeneous list.
    List,
    /// String-keyed map.
    Map,
    /// Named record.
    Struct(String),
    /// Top type.
    Any,
    /// Type of the null value. Only appears as a runtime type.
    Null,
}

/// How an argument of one type is converted to a declared parameter type.
///
/// Variants are ordered by preference: `Exact > Boxing > Widening`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Conversion {
    /// Primitive or reference widening (`i32 → i64`, anything → `any`).
    Widening,
    /// Boxing or unboxing between a primitive and its nullable wrapper.
    Boxing,
    /// Identical types.
    Exact,
}

impl ValueType {
    /// `bool`
    pub const BOOL: ValueType = ValueType::Primitive(Primitive::Bool);
    /// `i8`
    pub const I8: ValueType = ValueType::Primitive(Primitive::I8);
    /// `i16`
    pub const I16: ValueType = ValueType::Primitive(Primitive::I16);
    /// `i32`
    pub const I32: ValueType = ValueType::Primitive(Primitive::I32);
    /// `i64`
    pub const I64: ValueType = ValueType::Primitive(Primitive::I64);
    /// `f32`
    pub const F32: ValueType = ValueType::Primitive(Primitive::F32);
    /// `f64`
    pub const F64: ValueType = ValueType::Primitive(Primitive::F64);
    /// `char`
    pub const CHAR: ValueType = ValueType::Primitive(Primitive::Char);

    /// Creates an array type with the given element type.
    #[must_use]
    pub fn array(element: ValueType) -> Self {
        ValueType::Array(Box::new(element))
    }

    /// Returns `true` for primitive (non-nullable) types.
    #[must_use]
    pub const fn is_primitive(&self) -> bool {
        matches!(self, ValueType::Primitive(_))
    }

    /// Decides whether a value of type `actual` may be passed where `self`
    /// is declared, and if so how.
    ///
    /// Returns `None` when the types are incompatible. Arrays only accept
    /// arrays of the same rank whose element types are identical, or whose
    /// element types are reference types related by reference widening;
    /// primitive elements never box or widen inside an array.
    #[must_use]
    pub fn conversion_from(&self, actual: &ValueType) -> Option<Conversion> {
        if self == actual {
            return Some(Conversion::Exact);
        }
        match (self, actual) {
            // Null only flows into reference types.
            (formal, ValueType::Null) => (!formal.is_primitive()).then_some(Conversion::Widening),
            (ValueType::Any, _) => Some(Conversion::Widening),
            (ValueType::Primitive(formal), ValueType::Primitive(actual)) => {
                actual.widens_to(*formal).then_some(Conversion::Widening)
            }
            (ValueType::Boxed(formal), ValueType::Primitive(actual)) => {
                (formal == actual).then_some(Conversion::Boxing)
            }
            (ValueType::Primitive(formal), ValueType::Boxed(actual)) => {
                if formal == actual {
                    Some(Conversion::Boxing)
                } else {
                    actual.widens_to(*formal).then_some(Conversion::Widening)
                }
            }
            (ValueType::Array(formal), ValueType::Array(actual)) => {
                reference_widens(formal, actual).then_some(Conversion::Widening)
            }
            _ => None,
        }
    }

    /// Shorthand for `conversion_from(actual).is_some()`.
    #[must_use]
    pub fn is_assignable_from(&self, actual: &ValueType) -> bool {
        self.conversion_from(actual).is_some()
    }
}

/// Reference widening between array element types.
fn reference_widens(formal: &ValueType, actual: &ValueType) -> bool {
    if formal == actual {
        return true;
    }
    if formal.is_primitive() || actual.is_primitive() {
        return false;
    }
    match (formal, actual) {
        (ValueType::Any, _) | (_, ValueType::Null) => true,
        (ValueType::Array(formal), ValueType::Array(actual)) => reference_widens(formal, actual),
        _ => false,
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Primitive(p) => write!(f, "{p}"),
            ValueType::Boxed(p) => write!(f, "{p}?"),
            ValueType::String => f.write_str("string"),
            ValueType::Array(element) => write!(f, "[{element}]"),
            ValueType::List => f.write_str("list"),
            ValueType::Map => f.write_str("map"),
            ValueType::Struct(name) => f.write_str(name),
            ValueType::Any => f.write_str("any"),
            ValueType::Null => f.write_str("null"),
        }
    }
}

/// Error raised when a [`Value`] cannot be converted to a requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {found} to {expected}")]
pub struct ValueError {
    /// The type that was requested.
    pub expected: ValueType,
    /// The type of the value that was supplied.
    pub found: ValueType,
}

/// A dynamically typed argument or result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub enum Value {
    /// The null reference.
    Null,
    /// `bool`
    Bool(bool),
    /// `i8`
    I8(i8),
    /// `i16`
    I16(i16),
    /// `i32`
    I32(i32),
    /// `i64`
    I64(i64),
    /// `f32`
    F32(f32),
    /// `f64`
    F64(f64),
    /// `char`
    Char(char),
    /// A present value of a nullable primitive. The inner value is always a
    /// primitive variant.
    Boxed(Box<Value>),
    /// Text.
    String(String),
    /// Typed array: element type and items.
    Array(ValueType, Vec<Value>),
    /// Heterogeneous list.
    List(Vec<Value>),
    /// String-keyed map.
    Map(BTreeMap<String, Value>),
    /// Named record with fields.
    Struct(String, BTreeMap<String, Value>),
}

impl Value {
    /// Wraps a primitive value in its nullable box.
    ///
    /// Non-primitive values are returned unchanged.
    #[must_use]
    pub fn boxed(value: Value) -> Value {
        if value.primitive().is_some() {
            Value::Boxed(Box::new(value))
        } else {
            value
        }
    }

    /// Builds a typed array.
    #[must_use]
    pub fn array(element: ValueType, items: Vec<Value>) -> Value {
        Value::Array(element, items)
    }

    /// Returns the primitive kind of a primitive variant.
    #[must_use]
    pub const fn primitive(&self) -> Option<Primitive> {
        match self {
            Value::Bool(_) => Some(Primitive::Bool),
            Value::I8(_) => Some(Primitive::I8),
            Value::I16(_) => Some(Primitive::I16),
            Value::I32(_) => Some(Primitive::I32),
            Value::I64(_) => Some(Primitive::I64),
            Value::F32(_) => Some(Primitive::F32),
            Value::F64(_) => Some(Primitive::F64),
            Value::Char(_) => Some(Primitive::Char),
            _ => None,
        }
    }

    /// Returns the runtime type of this value.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        if let Some(p) = self.primitive() {
            return ValueType::Primitive(p);
        }
        match self {
            Value::Null => ValueType::Null,
            Value::Boxed(inner) => match inner.primitive() {
                Some(p) => ValueType::Boxed(p),
                None => inner.value_type(),
            },
            Value::String(_) => ValueType::String,
            Value::Array(element, _) => ValueType::array(element.clone()),
            Value::List(_) => ValueType::List,
            Value::Map(_) => ValueType::Map,
            Value::Struct(name, _) => ValueType::Struct(name.clone()),
            _ => ValueType::Any,
        }
    }

    /// Converts this value to the declared type `target`.
    ///
    /// Applies widening, boxing and unboxing as allowed by
    /// [`ValueType::conversion_from`], and rewrites array element types so the
    /// result reports `target` as its type. Array items and boxed contents are
    /// checked too, so a value whose tag does not describe its contents is
    /// rejected.
    ///
    /// # Errors
    ///
    /// Returns a [`ValueError`] if the value is not assignable to `target`.
    pub fn coerce(self, target: &ValueType) -> Result<Value, ValueError> {
        let found = self.value_type();
        let mismatch = || ValueError {
            expected: target.clone(),
            found: found.clone(),
        };
        if target.conversion_from(&found).is_none() {
            return Err(mismatch());
        }
        match (self, target) {
            (Value::Boxed(inner), _) if inner.primitive().is_none() => Err(mismatch()),
            (value, ValueType::Any) => Ok(value),
            (Value::Null, _) => Ok(Value::Null),
            (value, ValueType::Primitive(p)) if value.primitive() == Some(*p) => Ok(value),
            (Value::Boxed(inner), ValueType::Primitive(_)) => inner.coerce(target),
            (Value::Boxed(inner), ValueType::Boxed(p)) => {
                Ok(Value::Boxed(Box::new(inner.coerce(&ValueType::Primitive(*p))?)))
            }
            (value, ValueType::Boxed(p)) => {
                Ok(Value::Boxed(Box::new(value.coerce(&ValueType::Primitive(*p))?)))
            }
            (value, ValueType::Primitive(p)) => widen(value, *p).ok_or_else(mismatch),
            (Value::Array(_, items), ValueType::Array(element)) => {
                let items = items
                    .into_iter()
                    .map(|item| {
                        let item_type = item.value_type();
                        if !reference_widens(element, &item_type) {
                            return Err(ValueError {
                                expected: (**element).clone(),
                                found: item_type,
                            });
                        }
                        item.coerce(element)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array((**element).clone(), items))
            }
            (value, _) if &found == target => Ok(value),
            _ => Err(mismatch()),
        }
    }
}

/// Primitive widening of a primitive value.
fn widen(value: Value, target: Primitive) -> Option<Value> {
    let as_i64 = match value {
        Value::I8(v) => i64::from(v),
        Value::I16(v) => i64::from(v),
        Value::I32(v) => i64::from(v),
        Value::I64(v) => v,
        Value::Char(c) => i64::from(u32::from(c)),
        Value::F32(v) => {
            return match target {
                Primitive::F64 => Some(Value::F64(f64::from(v))),
                Primitive::F32 => Some(Value::F32(v)),
                _ => None,
            };
        }
        Value::F64(v) if target == Primitive::F64 => return Some(Value::F64(v)),
        _ => return None,
    };
    match target {
        Primitive::I16 => i16::try_from(as_i64).ok().map(Value::I16),
        Primitive::I32 => i32::try_from(as_i64).ok().map(Value::I32),
        Primitive::I64 => Some(Value::I64(as_i64)),
        #[allow(clippy::cast_precision_loss)]
        Primitive::F32 => Some(Value::F32(as_i64 as f32)),
        #[allow(clippy::cast_precision_loss)]
        Primitive::F64 => Some(Value::F64(as_i64 as f64)),
        _ => None,
    }
}

/// Deepest nesting of values and types accepted when decoding.
pub const MAX_DEPTH: usize = 64;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// One level of [`Value`] or [`ValueType`] nesting on the decoding thread.
struct DepthGuard;

impl DepthGuard {
    fn enter<E: de::Error>() -> Result<Self, E> {
        DEPTH.with(|depth| {
            let next = depth.get() + 1;
            if next > MAX_DEPTH {
                return Err(E::custom(format_args!("nesting exceeds {MAX_DEPTH} levels")));
            }
            depth.set(next);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}

impl Serialize for ValueType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ValueType::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for ValueType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let _level = DepthGuard::enter()?;
        ValueType::deserialize(deserializer)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Value::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let _level = DepthGuard::enter()?;
        Value::deserialize(deserializer)
    }
}

macro_rules! primitive_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }

            impl From<Vec<$ty>> for Value {
                fn from(items: Vec<$ty>) -> Self {
                    Value::Array(
                        ValueType::Primitive(Primitive::$variant),
                        items.into_iter().map(Value::$variant).collect(),
                    )
                }
            }

            impl TryFrom<Value> for $ty {
                type Error = ValueError;

                fn try_from(value: Value) -> Result<Self, Self::Error> {
                    match value.coerce(&ValueType::Primitive(Primitive::$variant))? {
                        Value::$variant(v) => Ok(v),
                        other => Err(ValueError {
                            expected: ValueType::Primitive(Primitive::$variant),
                            found: other.value_type(),
                        }),
                    }
                }
            }
        )*
    };
}

primitive_conversions! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    char => Char,
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, |v| Value::boxed(v.into()))
    }
}

impl TryFrom<Value> for String {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(ValueError {
                expected: ValueType::String,
                found: other.value_type(),
            }),
        }
    }
}
