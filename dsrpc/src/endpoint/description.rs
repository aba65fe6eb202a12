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

//! Endpoint descriptions: the attribute bags that advertise exported services.

use crate::capability::Capability;
use crate::endpoint::EndpointError;
use crate::properties::{AttributeSource, Properties, PropertyValue};
use crate::transport::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique id of the endpoint.
pub const ENDPOINT_ID: &str = "endpoint.id";
/// Names of the interfaces the endpoint exposes.
pub const SERVICE_INTERFACES: &str = "service.interfaces";
/// Id of the process that exported the endpoint.
pub const ENDPOINT_PROCESS_UUID: &str = "endpoint.process.uuid";
/// Address clients connect to.
pub const ENDPOINT_ADDRESS: &str = "endpoint.address";

/// An immutable, validated description of an exported service.
///
/// Serializes as a flat JSON object of typed attributes, so a description
/// decodes back to an equal value.
///
/// # Examples
///
/// ```rust
/// use dsrpc::endpoint::EndpointDescription;
/// use dsrpc::properties::PropertyValue;
/// use dsrpc::transport::Address;
///
/// let address: Address = "tcp://127.0.0.1:4100".parse()?;
/// let endpoint = EndpointDescription::builder("ep-1")
///     .interface("com.acme.Greeter")
///     .process_uuid("6a5e3d9c-0000-4000-8000-000000000001")
///     .address(&address)
///     .property("region", "east")
///     .property("weights", PropertyValue::List(vec![1i64.into(), 2i64.into()]))
///     .build()?;
///
/// let json = endpoint.to_json()?;
/// assert_eq!(EndpointDescription::from_json(&json)?, endpoint);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Properties", into = "Properties")]
pub struct EndpointDescription {
    id: String,
    address: Address,
    properties: Properties,
}

impl EndpointDescription {
    /// Starts a description for endpoint `id`.
    pub fn builder(id: impl Into<String>) -> EndpointDescriptionBuilder {
        EndpointDescriptionBuilder {
            id: id.into(),
            interfaces: Vec::new(),
            process_uuid: None,
            address: None,
            properties: Properties::new(),
        }
    }

    /// Validates `properties` as a description.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::InvalidAttribute`] if a mandatory attribute is
    /// missing, empty or of the wrong kind.
    pub fn from_properties(properties: Properties) -> Result<Self, EndpointError> {
        let id = required_string(&properties, ENDPOINT_ID)?.to_string();
        required_string(&properties, ENDPOINT_PROCESS_UUID)?;
        let address = required_string(&properties, ENDPOINT_ADDRESS)?
            .parse::<Address>()
            .map_err(|e| EndpointError::invalid(ENDPOINT_ADDRESS, e.to_string()))?;

        let interfaces = properties
            .get(SERVICE_INTERFACES)
            .ok_or_else(|| EndpointError::invalid(SERVICE_INTERFACES, "missing"))?;
        let names = interfaces.string_items();
        let all_strings = interfaces
            .elements()
            .is_none_or(|items| items.len() == names.len());
        if names.is_empty() || !all_strings {
            return Err(EndpointError::invalid(
                SERVICE_INTERFACES,
                "expected one or more interface names",
            ));
        }

        Ok(Self {
            id,
            address,
            properties,
        })
    }

    /// Decodes a description from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::Encoding`] for malformed JSON or an invalid
    /// description.
    pub fn from_json(json: &str) -> Result<Self, EndpointError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encodes this description as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::Encoding`] if serialization fails.
    pub fn to_json(&self) -> Result<String, EndpointError> {
        Ok(serde_json::to_string(self)?)
    }

    /// The endpoint id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The exposed interface names, in declaration order.
    pub fn interfaces(&self) -> Vec<&str> {
        self.properties
            .get(SERVICE_INTERFACES)
            .map(PropertyValue::string_items)
            .unwrap_or_default()
    }

    /// Id of the exporting process.
    pub fn process_uuid(&self) -> &str {
        self.properties
            .get(ENDPOINT_PROCESS_UUID)
            .and_then(PropertyValue::as_str)
            .unwrap_or_default()
    }

    /// Address to connect to.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// All attributes, mandatory ones included.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }
}

fn required_string<'a>(properties: &'a Properties, key: &str) -> Result<&'a str, EndpointError> {
    match properties.get(key) {
        Some(PropertyValue::String(s)) if !s.is_empty() => Ok(s),
        Some(PropertyValue::String(_)) => Err(EndpointError::invalid(key, "empty")),
        Some(_) => Err(EndpointError::invalid(key, "expected a string")),
        None => Err(EndpointError::invalid(key, "missing")),
    }
}

impl TryFrom<Properties> for EndpointDescription {
    type Error = EndpointError;

    fn try_from(properties: Properties) -> Result<Self, Self::Error> {
        Self::from_properties(properties)
    }
}

impl From<EndpointDescription> for Properties {
    fn from(endpoint: EndpointDescription) -> Self {
        endpoint.properties
    }
}

impl AttributeSource for EndpointDescription {
    fn attribute(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}

impl Capability for EndpointDescription {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for EndpointDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] at {}", self.id, self.interfaces().join(", "), self.address)
    }
}

/// Builds an [`EndpointDescription`].
///
/// Mandatory attributes set through the dedicated methods take precedence
/// over caller properties with the same key.
#[derive(Debug, Clone)]
pub struct EndpointDescriptionBuilder {
    id: String,
    interfaces: Vec<String>,
    process_uuid: Option<String>,
    address: Option<Address>,
    properties: Properties,
}

impl EndpointDescriptionBuilder {
    /// Adds an exposed interface name.
    pub fn interface(mut self, name: impl Into<String>) -> Self {
        self.interfaces.push(name.into());
        self
    }

    /// Sets the exporting process id.
    pub fn process_uuid(mut self, uuid: impl fmt::Display) -> Self {
        self.process_uuid = Some(uuid.to_string());
        self
    }

    /// Sets the connect address.
    pub fn address(mut self, address: &Address) -> Self {
        self.address = Some(address.clone());
        self
    }

    /// Adds one caller property.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key, value);
        self
    }

    /// Adds every caller property in `properties`.
    pub fn properties(mut self, properties: &Properties) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Validates and builds the description.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::InvalidAttribute`] if a mandatory attribute
    /// is missing.
    pub fn build(self) -> Result<EndpointDescription, EndpointError> {
        let mut properties = self.properties;
        properties.insert(ENDPOINT_ID, self.id);
        properties.insert(SERVICE_INTERFACES, PropertyValue::strings(self.interfaces));
        if let Some(uuid) = self.process_uuid {
            properties.insert(ENDPOINT_PROCESS_UUID, uuid);
        }
        if let Some(address) = self.address {
            properties.insert(ENDPOINT_ADDRESS, address.to_string());
        }
        EndpointDescription::from_properties(properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        "tcp://127.0.0.1:4100".parse().unwrap()
    }

    fn sample() -> EndpointDescription {
        EndpointDescription::builder("ep-1")
            .interface("com.acme.Foo")
            .interface("com.acme.Bar")
            .process_uuid("proc-1")
            .address(&address())
            .property("region", "east")
            .property("weight", 12i64)
            .property("ratio", 0.25f64)
            .property("enabled", false)
            .property("zones", PropertyValue::strings(["a", "b"]))
            .property(
                "limits",
                PropertyValue::List(vec![1i64.into(), 2.5f64.into(), "x".into()]),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_accessors() {
        let endpoint = sample();
        assert_eq!(endpoint.id(), "ep-1");
        assert_eq!(endpoint.interfaces(), vec!["com.acme.Foo", "com.acme.Bar"]);
        assert_eq!(endpoint.process_uuid(), "proc-1");
        assert_eq!(endpoint.address(), &address());
        assert_eq!(endpoint.attribute("REGION"), Some(&PropertyValue::from("east")));
        assert_eq!(
            endpoint.to_string(),
            "ep-1 [com.acme.Foo, com.acme.Bar] at tcp://127.0.0.1:4100"
        );
    }

    #[test]
    fn test_json_round_trip_keeps_kinds() {
        let endpoint = sample();
        let json = endpoint.to_json().unwrap();
        let decoded = EndpointDescription::from_json(&json).unwrap();
        assert_eq!(decoded, endpoint);
        assert_eq!(decoded.properties().get("weight"), Some(&PropertyValue::Long(12)));
        assert!(matches!(decoded.properties().get("zones"), Some(PropertyValue::Array(_))));
        assert!(matches!(decoded.properties().get("limits"), Some(PropertyValue::List(_))));
    }

    #[test]
    fn test_mandatory_attributes_win_over_caller_properties() {
        let caller = Properties::new()
            .with(ENDPOINT_ID, "spoofed")
            .with("color", "red");
        let endpoint = EndpointDescription::builder("real")
            .interface("I")
            .process_uuid("p")
            .address(&address())
            .properties(&caller)
            .build()
            .unwrap();
        assert_eq!(endpoint.id(), "real");
        assert_eq!(endpoint.attribute("color"), Some(&PropertyValue::from("red")));
    }

    #[test]
    fn test_validation() {
        let missing_address = EndpointDescription::builder("x")
            .interface("I")
            .process_uuid("p")
            .build();
        assert!(matches!(
            missing_address,
            Err(EndpointError::InvalidAttribute { attribute, .. }) if attribute == ENDPOINT_ADDRESS
        ));

        let no_interfaces = EndpointDescription::builder("x")
            .process_uuid("p")
            .address(&address())
            .build();
        assert!(no_interfaces.is_err());

        let bad_interfaces = Properties::new()
            .with(ENDPOINT_ID, "x")
            .with(ENDPOINT_PROCESS_UUID, "p")
            .with(ENDPOINT_ADDRESS, "tcp://h:1")
            .with(SERVICE_INTERFACES, PropertyValue::Array(vec![7i64.into()]));
        assert!(EndpointDescription::from_properties(bad_interfaces).is_err());

        let single = Properties::new()
            .with(ENDPOINT_ID, "x")
            .with(ENDPOINT_PROCESS_UUID, "p")
            .with(ENDPOINT_ADDRESS, "tcp://h:1")
            .with(SERVICE_INTERFACES, "I");
        assert_eq!(EndpointDescription::from_properties(single).unwrap().interfaces(), vec!["I"]);

        assert!(EndpointDescription::from_json(r#"{"endpoint.id":{"type":"String","value":"x"}}"#).is_err());
    }
}
