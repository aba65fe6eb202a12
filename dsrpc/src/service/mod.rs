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

//! Service model.
//!
//! A remotely callable service is described by an [`InterfaceDescriptor`]: a
//! name, an optional default strategy and an ordered list of
//! [`MethodDescriptor`]s. Method names may be overloaded; the server picks the
//! overload from the runtime argument types. Declaration order matters: it
//! breaks ties between equally specific overloads, and the index of a method
//! in the list is what [`ServiceObject::invoke`] receives.
//!
//! Services are usually built from closures with [`ServiceBuilder`]:
//!
//! ```rust
//! use dsrpc::service::{arg, MethodDescriptor, ServiceBuilder, ServiceObject};
//! use dsrpc::value::{Value, ValueType};
//!
//! let calculator = ServiceBuilder::new("Calculator")
//!     .method_sync(
//!         MethodDescriptor::new("add", vec![ValueType::I32, ValueType::I32], ValueType::I32),
//!         |args| Ok(Value::I32(arg::<i32>(&args, 0)? + arg::<i32>(&args, 1)?)),
//!     )
//!     .build();
//! assert_eq!(calculator.interface().name(), "Calculator");
//! ```

mod builder;
mod error;

pub use self::builder::{arg, FnService, MethodFuture, ServiceBuilder};
pub use self::error::InvokeError;

use crate::protocol::Fault;
use crate::serialization::DEFAULT_STRATEGY;
use crate::value::{Value, ValueType};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Signature of one remotely callable method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    name: String,
    params: Vec<ValueType>,
    returns: ValueType,
    strategy: Option<String>,
}

impl MethodDescriptor {
    /// Creates a descriptor.
    pub fn new(name: impl Into<String>, params: Vec<ValueType>, returns: ValueType) -> Self {
        Self {
            name: name.into(),
            params,
            returns,
            strategy: None,
        }
    }

    /// Pins the strategy used for this method's payloads.
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    /// Method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter types.
    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    /// Declared return type.
    pub fn returns(&self) -> &ValueType {
        &self.returns
    }

    /// Strategy pinned on this method, if any.
    pub fn strategy(&self) -> Option<&str> {
        self.strategy.as_deref()
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ") -> {}", self.returns)
    }
}

/// A named set of methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    name: String,
    strategy: Option<String>,
    methods: Vec<MethodDescriptor>,
}

impl InterfaceDescriptor {
    /// Creates an interface without methods.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategy: None,
            methods: Vec::new(),
        }
    }

    /// Appends a method.
    pub fn with_method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    /// Sets the strategy for methods that do not pin their own.
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    /// Interface name, as listed in `service.interfaces`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Methods in declaration order.
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Looks up a method by index.
    pub fn method(&self, index: usize) -> Option<&MethodDescriptor> {
        self.methods.get(index)
    }

    /// Iterates the methods called `name`, with their indices.
    pub fn overloads<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = (usize, &'a MethodDescriptor)> + use<'a, 'n> {
        self.methods
            .iter()
            .enumerate()
            .filter(move |(_, m)| m.name == name)
    }

    /// Returns the method called `name` if exactly one exists.
    pub fn unique_method(&self, name: &str) -> Option<(usize, &MethodDescriptor)> {
        let mut overloads = self.overloads(name);
        let first = overloads.next()?;
        overloads.next().is_none().then_some(first)
    }

    /// Resolves the strategy for `method`: its own, else the interface's,
    /// else `"default"`.
    pub fn strategy_for<'a>(&'a self, method: Option<&'a MethodDescriptor>) -> &'a str {
        method
            .and_then(MethodDescriptor::strategy)
            .or(self.strategy.as_deref())
            .unwrap_or(DEFAULT_STRATEGY)
    }
}

/// A service instance the server can invoke.
///
/// Arguments arrive already coerced to the declared parameter types of the
/// method at `method` (an index into [`InterfaceDescriptor::methods`]).
#[async_trait]
pub trait ServiceObject: Send + Sync + 'static {
    /// The interface this instance implements.
    fn interface(&self) -> Arc<InterfaceDescriptor>;

    /// Invokes a method.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] that is delivered to the caller as-is.
    async fn invoke(&self, method: usize, args: Vec<Value>) -> Result<Value, Fault>;
}

/// Produces and releases the instance backing a service registration.
pub trait ServiceFactory: Send + Sync + 'static {
    /// The interface of the instances this factory produces.
    fn interface(&self) -> Arc<InterfaceDescriptor>;

    /// Obtains an instance for one call.
    ///
    /// # Errors
    ///
    /// Returns a fault that is sent to the caller if no instance is available.
    fn get_service(&self) -> Result<Arc<dyn ServiceObject>, Fault>;

    /// Returns an instance after the call completed.
    fn unget_service(&self, _service: Arc<dyn ServiceObject>) {}
}

/// A factory that always hands out the same instance.
pub struct SingletonFactory {
    service: Arc<dyn ServiceObject>,
}

impl SingletonFactory {
    /// Wraps an instance.
    pub fn new(service: Arc<dyn ServiceObject>) -> Self {
        Self { service }
    }
}

impl ServiceFactory for SingletonFactory {
    fn interface(&self) -> Arc<InterfaceDescriptor> {
        self.service.interface()
    }

    fn get_service(&self) -> Result<Arc<dyn ServiceObject>, Fault> {
        Ok(self.service.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Primitive;

    fn interface() -> InterfaceDescriptor {
        InterfaceDescriptor::new("Overloads")
            .with_strategy("json")
            .with_method(MethodDescriptor::new("f", vec![ValueType::I32], ValueType::I32))
            .with_method(
                MethodDescriptor::new("f", vec![ValueType::Boxed(Primitive::I32)], ValueType::I32)
                    .with_strategy("default"),
            )
            .with_method(MethodDescriptor::new("g", vec![], ValueType::Null))
    }

    #[test]
    fn test_overloads_and_unique() {
        let interface = interface();
        let indices: Vec<_> = interface.overloads("f").map(|(i, _)| i).collect();
        assert_eq!(indices, vec![0, 1]);
        assert!(interface.unique_method("f").is_none());
        assert_eq!(interface.unique_method("g").map(|(i, _)| i), Some(2));
        assert!(interface.unique_method("h").is_none());
    }

    #[test]
    fn test_strategy_resolution() {
        let interface = interface();
        assert_eq!(interface.strategy_for(interface.method(0)), "json");
        assert_eq!(interface.strategy_for(interface.method(1)), "default");
        assert_eq!(InterfaceDescriptor::new("x").strategy_for(None), "default");
    }

    #[test]
    fn test_method_display() {
        let method = MethodDescriptor::new(
            "sum",
            vec![ValueType::array(ValueType::I64), ValueType::String],
            ValueType::I64,
        );
        assert_eq!(method.to_string(), "sum([i64], string) -> i64");
    }
}
