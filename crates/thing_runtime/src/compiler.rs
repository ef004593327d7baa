//! Metadata Compiler
//!
//! Turns a [`ThingType`] into a [`CompiledType`]: name-indexed tables of
//! property bindings, action descriptors and event descriptors. Compilation
//! happens once per type id; every later lookup is a hash probe followed by a
//! call through pre-built closures.
//!
//! Members whose type is not supported are left out of the compiled schema,
//! as are actions that have no handler bound.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{json, Map, Value as JsonValue};
use thing_types::{
    ActionDef, EventDef, ParameterSource, PropertyDef, ThingDef, ThingValue, ValueType,
};

use crate::action::ActionInput;
use crate::binding::ValueBinding;
use crate::error::{CompileError, ThingError, ThingResult};
use crate::thing_type::{ActionHandler, ThingType, WriteHook};

// ─────────────────────────────────────────────────────────────────────────────
// Property Binding
// ─────────────────────────────────────────────────────────────────────────────

/// Compiled property: slot index, value binding and initial value
pub struct PropertyBinding {
    /// Index of the value slot in every instance's property store
    pub slot: usize,
    pub def: PropertyDef,
    pub value: ValueBinding,
    pub initial: ThingValue,
    pub on_write: Option<WriteHook>,
}

impl PropertyBinding {
    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn is_readable(&self) -> bool {
        self.def.access.is_readable()
    }

    pub fn is_writable(&self) -> bool {
        self.def.access.is_writable()
    }

    /// Property entry of a thing description
    pub fn describe(&self, thing_href: &str) -> JsonValue {
        let mut desc = self.value.schema();
        insert_opt(&mut desc, "title", &self.def.title);
        insert_opt(&mut desc, "description", &self.def.description);
        insert_opt(&mut desc, "unit", &self.def.unit);
        insert_opt(&mut desc, "@type", &self.def.semantic_type);
        if !self.is_writable() {
            desc.insert("readOnly".into(), JsonValue::Bool(true));
        }
        if !self.is_readable() {
            desc.insert("writeOnly".into(), JsonValue::Bool(true));
        }
        desc.insert(
            "links".into(),
            json!([{
                "rel": "property",
                "href": format!("{}/properties/{}", thing_href, self.def.name),
            }]),
        );
        JsonValue::Object(desc)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Action Descriptor
// ─────────────────────────────────────────────────────────────────────────────

/// How one action parameter is satisfied
pub enum ParameterBinding {
    /// Read from the request input and validated
    Input(ValueBinding),
    /// Resolved from the environment when the action runs
    Injected { name: String, service: String },
}

impl ParameterBinding {
    pub fn name(&self) -> &str {
        match self {
            ParameterBinding::Input(binding) => binding.name(),
            ParameterBinding::Injected { name, .. } => name,
        }
    }
}

/// Compiled action: input bindings plus the bound handler
pub struct ActionDescriptor {
    pub def: ActionDef,
    pub parameters: Vec<ParameterBinding>,
    pub handler: ActionHandler,
}

impl ActionDescriptor {
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Coerce and validate a request's `input` object.
    ///
    /// A missing parameter is treated as null, so it only passes when the
    /// parameter accepts null. Undeclared keys are ignored.
    pub fn bind_input(&self, input: &JsonValue) -> ThingResult<ActionInput> {
        let empty = Map::new();
        let fields = match input {
            JsonValue::Null => &empty,
            JsonValue::Object(map) => map,
            other => {
                return Err(ThingError::InvalidRequest(format!(
                    "input of {} must be an object, got {}",
                    self.def.name, other
                )));
            }
        };

        let mut values = Vec::with_capacity(self.parameters.len());
        for parameter in &self.parameters {
            let ParameterBinding::Input(binding) = parameter else {
                continue;
            };
            let raw = fields.get(binding.name()).unwrap_or(&JsonValue::Null);
            let value = binding.convert(raw).map_err(|e| {
                ThingError::validation(format!("{}.{}", self.def.name, binding.name()), e)
            })?;
            values.push((binding.name().to_string(), value));
        }
        Ok(ActionInput::new(values))
    }

    /// Services this action needs injected, as `(parameter, service key)`
    pub fn injected(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters.iter().filter_map(|p| match p {
            ParameterBinding::Injected { name, service } => Some((name.as_str(), service.as_str())),
            ParameterBinding::Input(_) => None,
        })
    }

    /// Action entry of a thing description
    pub fn describe(&self, thing_href: &str) -> JsonValue {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for parameter in &self.parameters {
            let ParameterBinding::Input(binding) = parameter else {
                continue;
            };
            let mut schema = binding.schema();
            if let Some(def) = self.def.input.iter().find(|p| p.name == binding.name()) {
                insert_opt(&mut schema, "title", &def.title);
                insert_opt(&mut schema, "unit", &def.unit);
            }
            if !binding.accepts_null() {
                required.push(JsonValue::from(binding.name()));
            }
            properties.insert(binding.name().to_string(), JsonValue::Object(schema));
        }

        let mut desc = Map::new();
        insert_opt(&mut desc, "title", &self.def.title);
        insert_opt(&mut desc, "description", &self.def.description);
        insert_opt(&mut desc, "@type", &self.def.semantic_type);
        if !properties.is_empty() {
            let mut input = Map::new();
            input.insert("type".into(), JsonValue::from("object"));
            input.insert("properties".into(), JsonValue::Object(properties));
            if !required.is_empty() {
                input.insert("required".into(), JsonValue::Array(required));
            }
            desc.insert("input".into(), JsonValue::Object(input));
        }
        desc.insert(
            "links".into(),
            json!([{
                "rel": "action",
                "href": format!("{}/actions/{}", thing_href, self.def.name),
            }]),
        );
        JsonValue::Object(desc)
    }
}

impl std::fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("name", &self.def.name)
            .field("parameters", &self.parameters.len())
            .field("handler", &self.handler)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event Descriptor
// ─────────────────────────────────────────────────────────────────────────────

/// Compiled event; payloads are validated when a value type is declared
pub struct EventDescriptor {
    pub def: EventDef,
    pub value: Option<ValueBinding>,
}

impl EventDescriptor {
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Event entry of a thing description
    pub fn describe(&self, thing_href: &str) -> JsonValue {
        let mut desc = match &self.value {
            Some(binding) => binding.schema(),
            None => Map::new(),
        };
        insert_opt(&mut desc, "title", &self.def.title);
        insert_opt(&mut desc, "description", &self.def.description);
        insert_opt(&mut desc, "unit", &self.def.unit);
        insert_opt(&mut desc, "@type", &self.def.semantic_type);
        desc.insert(
            "links".into(),
            json!([{
                "rel": "event",
                "href": format!("{}/events/{}", thing_href, self.def.name),
            }]),
        );
        JsonValue::Object(desc)
    }
}

fn insert_opt(map: &mut Map<String, JsonValue>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        map.insert(key.to_string(), JsonValue::from(v.as_str()));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compiled Type
// ─────────────────────────────────────────────────────────────────────────────

/// Compiled metadata for one thing type, shared by all its instances
pub struct CompiledType {
    pub def: ThingDef,
    properties: Vec<PropertyBinding>,
    property_index: HashMap<String, usize>,
    actions: Vec<Arc<ActionDescriptor>>,
    action_index: HashMap<String, usize>,
    events: Vec<EventDescriptor>,
    event_index: HashMap<String, usize>,
}

impl CompiledType {
    pub fn type_id(&self) -> &str {
        &self.def.type_id
    }

    pub fn property(&self, name: &str) -> Option<&PropertyBinding> {
        self.property_index.get(name).map(|&i| &self.properties[i])
    }

    /// Properties in declaration order
    pub fn properties(&self) -> &[PropertyBinding] {
        &self.properties
    }

    pub fn action(&self, name: &str) -> Option<&Arc<ActionDescriptor>> {
        self.action_index.get(name).map(|&i| &self.actions[i])
    }

    pub fn actions(&self) -> &[Arc<ActionDescriptor>] {
        &self.actions
    }

    pub fn event(&self, name: &str) -> Option<&EventDescriptor> {
        self.event_index.get(name).map(|&i| &self.events[i])
    }

    pub fn events(&self) -> &[EventDescriptor] {
        &self.events
    }
}

impl std::fmt::Debug for CompiledType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledType")
            .field("type_id", &self.def.type_id)
            .field("properties", &self.properties.len())
            .field("actions", &self.actions.len())
            .field("events", &self.events.len())
            .finish()
    }
}

fn check_unique<'a>(
    owner: &str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), CompileError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(CompileError::DuplicateMember {
                owner: owner.to_string(),
                member: name.to_string(),
            });
        }
    }
    Ok(())
}

fn compile_properties(thing_type: &ThingType) -> Result<Vec<PropertyBinding>, CompileError> {
    let def = thing_type.def();
    let owner = def.type_id.as_str();
    let mut properties = Vec::new();

    for property in &def.properties {
        let Some(value) =
            ValueBinding::compile(owner, &property.name, property.value_type, &property.constraints)?
        else {
            tracing::debug!(
                thing_type = %owner,
                property = %property.name,
                value_type = %property.value_type,
                "Skipping property of unsupported type"
            );
            continue;
        };

        let initial = match &property.initial {
            Some(json) => value.convert(json).map_err(|source| CompileError::InvalidInitial {
                owner: owner.to_string(),
                member: property.name.clone(),
                source,
            })?,
            None => value.zero_value(),
        };

        properties.push(PropertyBinding {
            slot: properties.len(),
            def: property.clone(),
            value,
            initial,
            on_write: thing_type.write_hook(&property.name).cloned(),
        });
    }
    Ok(properties)
}

fn compile_action(
    owner: &str,
    action: &ActionDef,
    handler: ActionHandler,
) -> Result<ActionDescriptor, CompileError> {
    let member = format!("{}.input", action.name);
    check_unique(&member, action.input.iter().map(|p| p.name.as_str()))?;

    let mut parameters = Vec::with_capacity(action.input.len());
    for parameter in &action.input {
        match &parameter.source {
            ParameterSource::Injected { service } => parameters.push(ParameterBinding::Injected {
                name: parameter.name.clone(),
                service: service.clone(),
            }),
            ParameterSource::Input => {
                let scope = format!("{}.{}", owner, action.name);
                match ValueBinding::compile(
                    &scope,
                    &parameter.name,
                    parameter.value_type,
                    &parameter.constraints,
                )? {
                    Some(binding) => parameters.push(ParameterBinding::Input(binding)),
                    None => tracing::debug!(
                        thing_type = %owner,
                        action = %action.name,
                        parameter = %parameter.name,
                        "Skipping parameter of unsupported type"
                    ),
                }
            }
        }
    }

    Ok(ActionDescriptor {
        def: action.clone(),
        parameters,
        handler,
    })
}

fn compile_event(owner: &str, event: &EventDef) -> Result<EventDescriptor, CompileError> {
    let value = match event.value_type {
        Some(value_type) if value_type != ValueType::Unsupported => ValueBinding::compile(
            owner,
            &event.name,
            value_type,
            &Default::default(),
        )?,
        _ => None,
    };
    Ok(EventDescriptor {
        def: event.clone(),
        value,
    })
}

/// Compile a thing type without consulting any cache
pub fn compile_type(thing_type: &ThingType) -> Result<CompiledType, CompileError> {
    let def = thing_type.def();
    let owner = def.type_id.as_str();

    check_unique(owner, def.properties.iter().map(|p| p.name.as_str()))?;
    check_unique(owner, def.actions.iter().map(|a| a.name.as_str()))?;
    check_unique(owner, def.events.iter().map(|e| e.name.as_str()))?;

    let properties = compile_properties(thing_type)?;

    let mut actions = Vec::new();
    for action in &def.actions {
        let Some(handler) = thing_type.handler(&action.name) else {
            tracing::debug!(thing_type = %owner, action = %action.name, "Skipping action without handler");
            continue;
        };
        actions.push(Arc::new(compile_action(owner, action, handler.clone())?));
    }
    for name in thing_type.handler_names() {
        if def.get_action(name).is_none() {
            tracing::warn!(thing_type = %owner, action = %name, "Handler bound to undeclared action");
        }
    }

    let events = def
        .events
        .iter()
        .map(|event| compile_event(owner, event))
        .collect::<Result<Vec<_>, _>>()?;

    let index = |names: Vec<&str>| -> HashMap<String, usize> {
        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i))
            .collect()
    };

    Ok(CompiledType {
        def: def.clone(),
        property_index: index(properties.iter().map(PropertyBinding::name).collect()),
        action_index: index(actions.iter().map(|a| a.name()).collect()),
        event_index: index(events.iter().map(EventDescriptor::name).collect()),
        properties,
        actions,
        events,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Metadata Compiler
// ─────────────────────────────────────────────────────────────────────────────

/// Per-type compilation cache; populated at startup, read-mostly afterwards
#[derive(Default)]
pub struct MetadataCompiler {
    cache: DashMap<String, Arc<CompiledType>>,
}

impl MetadataCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a type, or return the cached result for its type id
    pub fn compile(&self, thing_type: &ThingType) -> Result<Arc<CompiledType>, CompileError> {
        if let Some(compiled) = self.cache.get(thing_type.type_id()) {
            return Ok(Arc::clone(compiled.value()));
        }

        let compiled = Arc::new(compile_type(thing_type)?);
        tracing::info!(
            thing_type = %thing_type.type_id(),
            properties = compiled.properties.len(),
            actions = compiled.actions.len(),
            events = compiled.events.len(),
            "Compiled thing type"
        );

        // A concurrent compile of the same type keeps whichever entry landed first
        let entry = self
            .cache
            .entry(thing_type.type_id().to_string())
            .or_insert(compiled);
        Ok(Arc::clone(entry.value()))
    }

    pub fn get(&self, type_id: &str) -> Option<Arc<CompiledType>> {
        self.cache.get(type_id).map(|c| Arc::clone(c.value()))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use thing_types::{Constraints, ParameterDef};

    fn lamp_type() -> ThingType {
        let def = ThingDef::new("lamp", "Lamp")
            .add_property(PropertyDef::new("on", ValueType::Boolean))
            .add_property(
                PropertyDef::new("brightness", ValueType::Int32)
                    .with_constraints(Constraints::new().minimum(0).maximum(100))
                    .with_initial(json!(50)),
            )
            .add_property(PropertyDef::new("matrix", ValueType::Unsupported))
            .add_action(
                ActionDef::new("fade")
                    .add_parameter(
                        ParameterDef::new("level", ValueType::Int32)
                            .with_constraints(Constraints::new().minimum(0).maximum(100)),
                    )
                    .add_parameter(
                        ParameterDef::new("duration", ValueType::Int64)
                            .with_constraints(Constraints::new().nullable(true)),
                    ),
            )
            .add_action(ActionDef::new("unbound"))
            .add_event(EventDef::new("overheated").with_value_type(ValueType::Int32));

        ThingType::new(def).on_action_sync("fade", |_req| Ok(()))
    }

    #[test]
    fn test_compile_tables() {
        let compiled = compile_type(&lamp_type()).unwrap();

        assert_eq!(compiled.properties().len(), 2);
        assert!(compiled.property("matrix").is_none());
        let brightness = compiled.property("brightness").unwrap();
        assert_eq!(brightness.slot, 1);
        assert_eq!(brightness.initial, ThingValue::Int(50));
        assert_eq!(compiled.property("on").unwrap().initial, ThingValue::Bool(false));

        assert!(compiled.action("fade").is_some());
        assert!(compiled.action("unbound").is_none());
        assert!(compiled.event("overheated").unwrap().value.is_some());
    }

    #[test]
    fn test_compile_is_cached_per_type() {
        let compiler = MetadataCompiler::new();
        let first = compiler.compile(&lamp_type()).unwrap();
        let second = compiler.compile(&lamp_type()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(compiler.len(), 1);
        assert!(compiler.get("lamp").is_some());
    }

    #[test]
    fn test_invalid_initial_value() {
        let def = ThingDef::new("bad", "Bad").add_property(
            PropertyDef::new("level", ValueType::UInt8).with_initial(json!(300)),
        );
        let result = compile_type(&ThingType::new(def));
        assert!(matches!(result, Err(CompileError::InvalidInitial { .. })));
    }

    #[test]
    fn test_duplicate_members() {
        let def = ThingDef::new("dup", "Dup")
            .add_property(PropertyDef::new("x", ValueType::Boolean))
            .add_property(PropertyDef::new("x", ValueType::Int8));
        assert!(matches!(
            compile_type(&ThingType::new(def)),
            Err(CompileError::DuplicateMember { .. })
        ));
    }

    #[test]
    fn test_bind_input() {
        let compiled = compile_type(&lamp_type()).unwrap();
        let fade = compiled.action("fade").unwrap();

        let input = fade.bind_input(&json!({"level": 40, "extra": true})).unwrap();
        assert_eq!(input.get("level"), Some(&ThingValue::Int(40)));
        assert_eq!(input.get("duration"), Some(&ThingValue::Null));

        // Missing required parameter is treated as null
        let err = fade.bind_input(&json!({})).unwrap_err();
        assert!(err.to_string().contains("fade.level"));

        assert!(fade.bind_input(&json!({"level": 101})).is_err());
        assert!(matches!(
            fade.bind_input(&json!([1, 2])),
            Err(ThingError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_describe_action_input() {
        let compiled = compile_type(&lamp_type()).unwrap();
        let desc = compiled.action("fade").unwrap().describe("/things/lamp-1");
        assert_eq!(desc["input"]["properties"]["level"]["maximum"], json!(100));
        assert_eq!(desc["input"]["required"], json!(["level"]));
        assert_eq!(desc["links"][0]["href"], json!("/things/lamp-1/actions/fade"));
    }
}
