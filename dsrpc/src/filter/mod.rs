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

//! LDAP-style filter expressions over attribute bags.
//!
//! # Syntax
//!
//! | Form | Meaning |
//! |---|---|
//! | `(attr=value)` | equality |
//! | `(attr=*)` | attribute is present |
//! | `(attr=pre*mid*post)` | substring, any number of wildcards |
//! | `(attr~=value)` | equality ignoring case and whitespace |
//! | `(attr>=value)`, `(attr<=value)` | ordering |
//! | `(&(..)(..))`, `(\|(..)(..))`, `(!(..))` | and, or, not |
//!
//! `\(`, `\)`, `\*` and `\\` escape the special characters in values.
//! Attribute names are case-insensitive.
//!
//! # Comparison
//!
//! The filter value is interpreted according to the attribute's value:
//! strings compare as strings, `Long` and `Double` attributes parse the filter
//! value as a number, `Boolean` attributes as `true`/`false`. A value that
//! does not parse never matches. For `Array` and `List` attributes the filter
//! matches if any element matches.
//!
//! # Examples
//!
//! ```rust
//! use dsrpc::filter::Filter;
//! use dsrpc::properties::{Properties, PropertyValue};
//!
//! let filter: Filter = "(&(objectClass=Foo)(|(region=east)(weight>=10)))".parse()?;
//! let bag = Properties::new()
//!     .with("objectClass", PropertyValue::strings(["Foo", "Bar"]))
//!     .with("region", "west")
//!     .with("weight", 12i64);
//! assert!(filter.matches(&bag));
//! # Ok::<(), dsrpc::filter::FilterError>(())
//! ```

mod error;
mod parser;

pub use self::error::FilterError;

use crate::properties::{AttributeSource, PropertyValue};
use std::fmt;
use std::str::FromStr;

/// A parsed filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Filter {
    /// All operands match.
    And(Vec<Filter>),
    /// At least one operand matches.
    Or(Vec<Filter>),
    /// The operand does not match.
    Not(Box<Filter>),
    /// `(attribute=value)`
    Equal {
        /// Attribute name.
        attribute: String,
        /// Unescaped value.
        value: String,
    },
    /// `(attribute~=value)`
    Approx {
        /// Attribute name.
        attribute: String,
        /// Unescaped value.
        value: String,
    },
    /// `(attribute>=value)`
    GreaterEq {
        /// Attribute name.
        attribute: String,
        /// Unescaped value.
        value: String,
    },
    /// `(attribute<=value)`
    LessEq {
        /// Attribute name.
        attribute: String,
        /// Unescaped value.
        value: String,
    },
    /// `(attribute=*)`
    Present {
        /// Attribute name.
        attribute: String,
    },
    /// `(attribute=initial*any*...*last)`
    Substring {
        /// Attribute name.
        attribute: String,
        /// Required prefix.
        initial: Option<String>,
        /// Required inner pieces, in order.
        any: Vec<String>,
        /// Required suffix.
        last: Option<String>,
    },
}

impl Filter {
    /// Parses a filter string.
    ///
    /// # Errors
    ///
    /// Returns a [`FilterError`] with the byte offset of the first problem.
    pub fn parse(input: &str) -> Result<Self, FilterError> {
        parser::parse(input)
    }

    /// Builds `(attribute=value)`.
    pub fn equal(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equal {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Builds `(attribute=*)`.
    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present {
            attribute: attribute.into(),
        }
    }

    /// Tests `source` against this filter.
    pub fn matches<S: AttributeSource + ?Sized>(&self, source: &S) -> bool {
        match self {
            Filter::And(filters) => filters.iter().all(|f| f.matches(source)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(source)),
            Filter::Not(filter) => !filter.matches(source),
            Filter::Present { attribute } => source.attribute(attribute).is_some(),
            Filter::Equal { attribute, value } => {
                compare(source.attribute(attribute), &|v| equal(v, value))
            }
            Filter::Approx { attribute, value } => {
                compare(source.attribute(attribute), &|v| approx(v, value))
            }
            Filter::GreaterEq { attribute, value } => compare(source.attribute(attribute), &|v| {
                ordering(v, value).is_some_and(std::cmp::Ordering::is_ge)
            }),
            Filter::LessEq { attribute, value } => compare(source.attribute(attribute), &|v| {
                ordering(v, value).is_some_and(std::cmp::Ordering::is_le)
            }),
            Filter::Substring {
                attribute,
                initial,
                any,
                last,
            } => compare(source.attribute(attribute), &|v| {
                substring(&v.to_string(), initial.as_deref(), any, last.as_deref())
            }),
        }
    }
}

/// Applies `test` to a scalar, or to every element of a sequence.
fn compare(value: Option<&PropertyValue>, test: &dyn Fn(&PropertyValue) -> bool) -> bool {
    match value {
        None => false,
        Some(PropertyValue::Array(items) | PropertyValue::List(items)) => {
            items.iter().any(|item| compare(Some(item), test))
        }
        Some(scalar) => test(scalar),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn equal(actual: &PropertyValue, expected: &str) -> bool {
    match actual {
        PropertyValue::String(s) => s == expected,
        PropertyValue::Long(n) => expected.trim().parse::<i64>().is_ok_and(|e| *n == e),
        PropertyValue::Double(x) => expected.trim().parse::<f64>().is_ok_and(|e| *x == e),
        PropertyValue::Boolean(b) => parse_bool(expected) == Some(*b),
        PropertyValue::Array(_) | PropertyValue::List(_) => false,
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn approx(actual: &PropertyValue, expected: &str) -> bool {
    match actual {
        PropertyValue::String(s) => normalize(s) == normalize(expected),
        other => equal(other, expected),
    }
}

/// Orders the attribute value relative to the filter value.
fn ordering(actual: &PropertyValue, expected: &str) -> Option<std::cmp::Ordering> {
    match actual {
        PropertyValue::String(s) => Some(s.as_str().cmp(expected)),
        PropertyValue::Long(n) => expected.trim().parse::<i64>().ok().map(|e| n.cmp(&e)),
        PropertyValue::Double(x) => expected.trim().parse::<f64>().ok().and_then(|e| x.partial_cmp(&e)),
        PropertyValue::Boolean(_) | PropertyValue::Array(_) | PropertyValue::List(_) => None,
    }
}

fn substring(s: &str, initial: Option<&str>, any: &[String], last: Option<&str>) -> bool {
    let mut rest = s;
    if let Some(initial) = initial {
        match rest.strip_prefix(initial) {
            Some(remaining) => rest = remaining,
            None => return false,
        }
    }
    for piece in any {
        match rest.find(piece.as_str()) {
            Some(at) => rest = &rest[at + piece.len()..],
            None => return false,
        }
    }
    last.is_none_or(|last| rest.ends_with(last))
}

struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in self.0.chars() {
            if matches!(ch, '(' | ')' | '*' | '\\') {
                f.write_str("\\")?;
            }
            write!(f, "{ch}")?;
        }
        Ok(())
    }
}

/// Renders the canonical form, which parses back to an equal filter.
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(filters) | Filter::Or(filters) => {
                f.write_str(if matches!(self, Filter::And(_)) { "(&" } else { "(|" })?;
                for filter in filters {
                    write!(f, "{filter}")?;
                }
                f.write_str(")")
            }
            Filter::Not(filter) => write!(f, "(!{filter})"),
            Filter::Equal { attribute, value } => write!(f, "({attribute}={})", Escaped(value)),
            Filter::Approx { attribute, value } => write!(f, "({attribute}~={})", Escaped(value)),
            Filter::GreaterEq { attribute, value } => write!(f, "({attribute}>={})", Escaped(value)),
            Filter::LessEq { attribute, value } => write!(f, "({attribute}<={})", Escaped(value)),
            Filter::Present { attribute } => write!(f, "({attribute}=*)"),
            Filter::Substring {
                attribute,
                initial,
                any,
                last,
            } => {
                write!(f, "({attribute}=")?;
                if let Some(initial) = initial {
                    write!(f, "{}", Escaped(initial))?;
                }
                f.write_str("*")?;
                for piece in any {
                    write!(f, "{}*", Escaped(piece))?;
                }
                if let Some(last) = last {
                    write!(f, "{}", Escaped(last))?;
                }
                f.write_str(")")
            }
        }
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::parse(s)
    }
}
