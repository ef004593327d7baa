//! Property Registry
//!
//! Per-instance property store. Values live in one slot per compiled
//! property, each behind its own lock, so reads and writes of different
//! properties never contend. A write either coerces, validates and stores the
//! value, or leaves the slot untouched.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value as JsonValue};
use thing_types::{Envelope, ThingValue};

use crate::compiler::{CompiledType, PropertyBinding};
use crate::error::{ThingError, ThingResult};
use crate::hub::NotificationHub;

pub struct PropertyRegistry {
    compiled: Arc<CompiledType>,
    slots: Box<[RwLock<ThingValue>]>,
    hub: Arc<NotificationHub>,
}

impl PropertyRegistry {
    pub fn new(compiled: Arc<CompiledType>, hub: Arc<NotificationHub>) -> Self {
        let slots = compiled
            .properties()
            .iter()
            .map(|binding| RwLock::new(binding.initial.clone()))
            .collect();
        Self {
            compiled,
            slots,
            hub,
        }
    }

    fn binding(&self, name: &str) -> ThingResult<&PropertyBinding> {
        self.compiled
            .property(name)
            .ok_or_else(|| ThingError::not_found("property", name))
    }

    /// Client read; fails for write-only properties
    pub fn get(&self, name: &str) -> ThingResult<JsonValue> {
        let binding = self.binding(name)?;
        if !binding.is_readable() {
            return Err(ThingError::WriteOnly(name.to_string()));
        }
        Ok(self.slots[binding.slot].read().to_json())
    }

    /// Client write. Returns the stored value as rendered on the wire.
    pub fn set(&self, name: &str, json: &JsonValue) -> ThingResult<(ThingValue, JsonValue)> {
        let binding = self.binding(name)?;
        if !binding.is_writable() {
            return Err(ThingError::ReadOnly(name.to_string()));
        }
        let value = binding
            .value
            .convert(json)
            .map_err(|e| ThingError::validation(name, e))?;
        let rendered = self.store(binding, value.clone());
        Ok((value, rendered))
    }

    /// Thing-side write; validated, but ignores the access mode
    pub fn update(&self, name: &str, value: ThingValue) -> ThingResult<JsonValue> {
        let binding = self.binding(name)?;
        // Round-trip through the wire form so a mistyped value is coerced or rejected
        let value = binding
            .value
            .convert(&value.to_json())
            .map_err(|e| ThingError::validation(name, e))?;
        Ok(self.store(binding, value))
    }

    /// Thing-side read; ignores the access mode
    pub fn value(&self, name: &str) -> ThingResult<ThingValue> {
        let binding = self.binding(name)?;
        Ok(self.slots[binding.slot].read().clone())
    }

    /// All readable properties
    pub fn snapshot(&self) -> Map<String, JsonValue> {
        self.compiled
            .properties()
            .iter()
            .filter(|binding| binding.is_readable())
            .map(|binding| {
                (
                    binding.name().to_string(),
                    self.slots[binding.slot].read().to_json(),
                )
            })
            .collect()
    }

    fn store(&self, binding: &PropertyBinding, value: ThingValue) -> JsonValue {
        let rendered = value.to_json();
        let mut slot = self.slots[binding.slot].write();
        *slot = value;
        // Published under the slot lock so notifications follow write order
        let payload = if binding.is_readable() {
            rendered.clone()
        } else {
            JsonValue::Null
        };
        self.hub
            .publish(Envelope::property_status(binding.name(), payload));
        drop(slot);
        tracing::trace!(thing_id = %self.hub.thing_id(), property = %binding.name(), "Property stored");
        rendered
    }
}
