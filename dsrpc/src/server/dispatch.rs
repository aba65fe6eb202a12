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

//! Overload resolution.
//!
//! A request names a method only by its text name; the overload is chosen
//! from the runtime types of the arguments. A method is applicable when its
//! arity matches and every declared parameter type accepts the corresponding
//! argument type (see [`ValueType::conversion_from`]). Among applicable
//! methods the most specific wins:
//!
//! 1. the candidate whose weakest argument conversion is strongest
//!    (`Exact > Boxing > Widening`),
//! 2. then the one with more exact matches,
//! 3. then the one with more boxing matches,
//! 4. then the first declared.

use crate::protocol::Fault;
use crate::service::{InterfaceDescriptor, MethodDescriptor};
use crate::value::{Conversion, Value, ValueType};

/// Specificity of an applicable candidate. Larger is more specific.
type Score = (Conversion, usize, usize);

fn score(method: &MethodDescriptor, args: &[ValueType]) -> Option<Score> {
    if method.params().len() != args.len() {
        return None;
    }
    let mut weakest = Conversion::Exact;
    let mut exact = 0;
    let mut boxing = 0;
    for (param, arg) in method.params().iter().zip(args) {
        let conversion = param.conversion_from(arg)?;
        weakest = weakest.min(conversion);
        match conversion {
            Conversion::Exact => exact += 1,
            Conversion::Boxing => boxing += 1,
            Conversion::Widening => {}
        }
    }
    Some((weakest, exact, boxing))
}

/// Picks the overload of `name` in `interface` that best fits `args`.
///
/// Returns the method's index and descriptor.
///
/// # Errors
///
/// Returns a `NoSuchMethod` fault if no overload is applicable.
pub fn resolve<'a>(
    interface: &'a InterfaceDescriptor,
    name: &str,
    args: &[ValueType],
) -> Result<(usize, &'a MethodDescriptor), Fault> {
    let mut best: Option<(Score, usize, &MethodDescriptor)> = None;
    for (index, method) in interface.overloads(name) {
        let Some(score) = score(method, args) else {
            continue;
        };
        // Strictly greater: earlier declarations win ties.
        if best.as_ref().is_none_or(|(current, _, _)| score > *current) {
            best = Some((score, index, method));
        }
    }
    best.map(|(_, index, method)| (index, method))
        .ok_or_else(|| no_such_method(interface, name, args))
}

fn no_such_method(interface: &InterfaceDescriptor, name: &str, args: &[ValueType]) -> Fault {
    let args = args
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Fault::new(
        Fault::NO_SUCH_METHOD,
        format!("{}.{name}({args})", interface.name()),
    )
}

/// Converts resolved arguments to the method's declared parameter types.
///
/// # Errors
///
/// Returns a `MalformedRequest` fault if an argument cannot be converted,
/// which only happens when `args` does not belong to `method`.
pub fn coerce_args(method: &MethodDescriptor, args: Vec<Value>) -> Result<Vec<Value>, Fault> {
    method
        .params()
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            arg.coerce(param)
                .map_err(|e| Fault::new(Fault::MALFORMED_REQUEST, e.to_string()))
        })
        .collect()
}
