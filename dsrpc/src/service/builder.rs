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

//! Closure-backed services.

use crate::protocol::Fault;
use crate::service::{InterfaceDescriptor, MethodDescriptor, ServiceObject};
use crate::value::{Value, ValueError};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by method handlers.
pub type MethodFuture = Pin<Box<dyn Future<Output = Result<Value, Fault>> + Send>>;

type Handler = Box<dyn Fn(Vec<Value>) -> MethodFuture + Send + Sync>;

/// Class of the fault raised when a handler receives an argument it cannot use.
const ILLEGAL_ARGUMENT: &str = "IllegalArgument";

impl From<ValueError> for Fault {
    fn from(error: ValueError) -> Self {
        Fault::new(ILLEGAL_ARGUMENT, error.to_string())
    }
}

/// Extracts argument `index` as `T`.
///
/// # Errors
///
/// Returns an `IllegalArgument` fault if the argument is missing or has the
/// wrong type.
pub fn arg<T>(args: &[Value], index: usize) -> Result<T, Fault>
where
    T: TryFrom<Value, Error = ValueError>,
{
    let value = args
        .get(index)
        .cloned()
        .ok_or_else(|| Fault::new(ILLEGAL_ARGUMENT, format!("missing argument {index}")))?;
    Ok(T::try_from(value)?)
}

/// Builds a [`ServiceObject`] from one closure per method.
///
/// Methods are declared in call order; each descriptor is paired with the
/// handler that implements it.
pub struct ServiceBuilder {
    interface: InterfaceDescriptor,
    handlers: Vec<Handler>,
}

impl ServiceBuilder {
    /// Starts a service implementing the interface `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            interface: InterfaceDescriptor::new(name),
            handlers: Vec::new(),
        }
    }

    /// Sets the interface's default strategy.
    pub fn strategy(mut self, strategy: impl Into<String>) -> Self {
        self.interface = self.interface.with_strategy(strategy);
        self
    }

    /// Adds an asynchronous method.
    pub fn method<F, Fut>(mut self, descriptor: MethodDescriptor, handler: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Fault>> + Send + 'static,
    {
        self.interface = self.interface.with_method(descriptor);
        self.handlers
            .push(Box::new(move |args| Box::pin(handler(args))));
        self
    }

    /// Adds a method that completes without awaiting.
    pub fn method_sync<F>(self, descriptor: MethodDescriptor, handler: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        self.method(descriptor, move |args| {
            let handler = handler.clone();
            async move { handler(args) }
        })
    }

    /// Finishes the service.
    pub fn build(self) -> Arc<FnService> {
        Arc::new(FnService {
            interface: Arc::new(self.interface),
            handlers: self.handlers,
        })
    }
}

/// A service assembled by [`ServiceBuilder`].
pub struct FnService {
    interface: Arc<InterfaceDescriptor>,
    handlers: Vec<Handler>,
}

#[async_trait]
impl ServiceObject for FnService {
    fn interface(&self) -> Arc<InterfaceDescriptor> {
        self.interface.clone()
    }

    async fn invoke(&self, method: usize, args: Vec<Value>) -> Result<Value, Fault> {
        match self.handlers.get(method) {
            Some(handler) => handler(args).await,
            None => Err(Fault::new(
                Fault::NO_SUCH_METHOD,
                format!("{} has no method #{method}", self.interface.name()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;
    use std::time::Duration;

    fn service() -> Arc<FnService> {
        ServiceBuilder::new("Greeter")
            .method_sync(
                MethodDescriptor::new("greet", vec![ValueType::String], ValueType::String),
                |args| Ok(Value::from(format!("hello {}", arg::<String>(&args, 0)?))),
            )
            .method(
                MethodDescriptor::new("later", vec![ValueType::I64], ValueType::I64),
                |args| async move {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    Ok::<_, Fault>(Value::I64(arg::<i64>(&args, 0)? * 2))
                },
            )
            .build()
    }

    #[tokio::test]
    async fn test_invoke_by_index() {
        let service = service();
        assert_eq!(service.interface().methods().len(), 2);
        assert_eq!(
            service.invoke(0, vec![Value::from("bob")]).await.unwrap(),
            Value::from("hello bob")
        );
        assert_eq!(service.invoke(1, vec![Value::I64(21)]).await.unwrap(), Value::I64(42));
    }

    #[tokio::test]
    async fn test_bad_index_and_argument() {
        let service = service();
        assert!(service.invoke(7, vec![]).await.unwrap_err().is(Fault::NO_SUCH_METHOD));
        assert!(service.invoke(0, vec![Value::I32(1)]).await.unwrap_err().is("IllegalArgument"));
        assert!(service.invoke(0, vec![]).await.unwrap_err().is("IllegalArgument"));
    }
}
