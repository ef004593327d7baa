//! Declarative Thing Definitions
//!
//! A [`ThingDef`] describes one Thing *type*: its properties, actions and
//! events. Definitions are plain data; they can be built in Rust with the
//! builder methods or deserialized from configuration, and are compiled once
//! per type by the runtime.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{Constraints, ValueType};

pub const DEFAULT_CONTEXT: &str = "https://webthings.io/schemas";

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

/// How a property may be accessed from the outside
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
    #[default]
    ReadWrite,
    ReadOnly,
    WriteOnly,
}

impl Access {
    pub fn is_readable(&self) -> bool {
        !matches!(self, Access::WriteOnly)
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self, Access::ReadOnly)
    }
}

/// Definition of a single property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default)]
    pub access: Access,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<String>,
    #[serde(flatten)]
    pub constraints: Constraints,
    /// Initial value; the type's zero value is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<JsonValue>,
}

impl PropertyDef {
    /// Create a read-write property
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            access: Access::ReadWrite,
            title: None,
            description: None,
            unit: None,
            semantic_type: None,
            constraints: Constraints::default(),
            initial: None,
        }
    }

    /// Create a read-only property
    pub fn read_only(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, value_type).with_access(Access::ReadOnly)
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_semantic_type(mut self, semantic_type: impl Into<String>) -> Self {
        self.semantic_type = Some(semantic_type.into());
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_initial(mut self, value: JsonValue) -> Self {
        self.initial = Some(value);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Actions
// ─────────────────────────────────────────────────────────────────────────────

/// Where an action parameter gets its value from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ParameterSource {
    /// Read from the request's `input` object
    #[default]
    Input,
    /// Resolved from the runtime environment by service key
    Injected { service: String },
}

/// Definition of one action parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDef {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(flatten)]
    pub constraints: Constraints,
    #[serde(default, skip_serializing_if = "is_input")]
    pub source: ParameterSource,
}

impl ParameterDef {
    /// A parameter read from the request input
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            title: None,
            unit: None,
            constraints: Constraints::default(),
            source: ParameterSource::Input,
        }
    }

    /// A parameter injected from the environment by the Rust type of the service
    pub fn injected<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_type: ValueType::Unsupported,
            title: None,
            unit: None,
            constraints: Constraints::default(),
            source: ParameterSource::Injected {
                service: service_key::<T>(),
            },
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn is_injected(&self) -> bool {
        matches!(self.source, ParameterSource::Injected { .. })
    }
}

fn is_input(source: &ParameterSource) -> bool {
    *source == ParameterSource::Input
}

/// Key under which a service of type `T` is registered for injection
pub fn service_key<T: ?Sized + 'static>() -> String {
    std::any::type_name::<T>().to_string()
}

/// Definition of an action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<String>,
    #[serde(default)]
    pub input: Vec<ParameterDef>,
}

impl ActionDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: None,
            semantic_type: None,
            input: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_semantic_type(mut self, semantic_type: impl Into<String>) -> Self {
        self.semantic_type = Some(semantic_type.into());
        self
    }

    pub fn add_parameter(mut self, parameter: ParameterDef) -> Self {
        self.input.push(parameter);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Definition of an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<String>,
    /// Type of the event payload, if it is a single value
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl EventDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: None,
            semantic_type: None,
            value_type: None,
            unit: None,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_semantic_type(mut self, semantic_type: impl Into<String>) -> Self {
        self.semantic_type = Some(semantic_type.into());
        self
    }

    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Thing Definition
// ─────────────────────────────────────────────────────────────────────────────

/// Complete definition of a Thing type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThingDef {
    /// Type identifier; compiled metadata is cached under this key
    #[serde(rename = "type")]
    pub type_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "@context", default = "default_context")]
    pub context: String,
    #[serde(rename = "@type", default)]
    pub semantic_types: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    #[serde(default)]
    pub actions: Vec<ActionDef>,
    #[serde(default)]
    pub events: Vec<EventDef>,
}

fn default_context() -> String {
    DEFAULT_CONTEXT.to_string()
}

impl ThingDef {
    pub fn new(type_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            title: title.into(),
            description: None,
            context: default_context(),
            semantic_types: Vec::new(),
            properties: Vec::new(),
            actions: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_semantic_type(mut self, semantic_type: impl Into<String>) -> Self {
        self.semantic_types.push(semantic_type.into());
        self
    }

    pub fn add_property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    pub fn add_action(mut self, action: ActionDef) -> Self {
        self.actions.push(action);
        self
    }

    pub fn add_event(mut self, event: EventDef) -> Self {
        self.events.push(event);
        self
    }

    pub fn get_property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn get_action(&self, name: &str) -> Option<&ActionDef> {
        self.actions.iter().find(|a| a.name == name)
    }
}
