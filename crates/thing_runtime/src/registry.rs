//! Thing Registry
//!
//! Registered thing types and the hosted thing instances built from them.
//! Types are compiled once at registration; instances share the compiled
//! tables of their type.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::compiler::MetadataCompiler;
use crate::context::ThingContext;
use crate::error::{CompileError, ThingError, ThingResult};
use crate::event_log::DEFAULT_EVENT_CAPACITY;
use crate::resolver::{ServiceMap, ServiceResolver};
use crate::thing_type::ThingType;

/// Settings applied to every thing created by a registry
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Records kept per event name
    pub event_capacity: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

pub struct ThingRegistry {
    compiler: MetadataCompiler,
    types: RwLock<HashMap<String, Arc<ThingType>>>,
    things: DashMap<String, ThingContext>,
    /// Thing ids in creation order
    order: RwLock<Vec<String>>,
    settings: RegistrySettings,
    resolver: Arc<dyn ServiceResolver>,
}

impl ThingRegistry {
    pub fn new(settings: RegistrySettings) -> Self {
        Self::with_resolver(settings, Arc::new(ServiceMap::new()))
    }

    pub fn with_resolver(settings: RegistrySettings, resolver: Arc<dyn ServiceResolver>) -> Self {
        Self {
            compiler: MetadataCompiler::new(),
            types: RwLock::new(HashMap::new()),
            things: DashMap::new(),
            order: RwLock::new(Vec::new()),
            settings,
            resolver,
        }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Compile and register a thing type. Re-registering a type id keeps the first.
    pub fn register_type(&self, thing_type: ThingType) -> Result<(), CompileError> {
        self.compiler.compile(&thing_type)?;
        self.types
            .write()
            .entry(thing_type.type_id().to_string())
            .or_insert_with(|| Arc::new(thing_type));
        Ok(())
    }

    pub fn has_type(&self, type_id: &str) -> bool {
        self.types.read().contains_key(type_id)
    }

    /// Create a thing of a registered type
    pub fn create_thing(
        &self,
        type_id: &str,
        id: &str,
        title: Option<&str>,
    ) -> ThingResult<ThingContext> {
        let thing_type = self
            .types
            .read()
            .get(type_id)
            .cloned()
            .ok_or_else(|| ThingError::not_found("thing type", type_id))?;
        let compiled = self
            .compiler
            .compile(&thing_type)
            .map_err(|e| ThingError::Internal(e.to_string()))?;

        let mut order = self.order.write();
        if self.things.contains_key(id) {
            return Err(ThingError::AlreadyExists(id.to_string()));
        }
        let thing = ThingContext::new(
            id,
            title.unwrap_or(&thing_type.def().title),
            compiled,
            self.settings.event_capacity,
            Arc::clone(&self.resolver),
        );
        self.things.insert(id.to_string(), thing.clone());
        order.push(id.to_string());

        tracing::info!(thing_id = %id, thing_type = %type_id, "Thing created");
        Ok(thing)
    }

    pub fn get(&self, id: &str) -> ThingResult<ThingContext> {
        self.things
            .get(id)
            .map(|thing| thing.value().clone())
            .ok_or_else(|| ThingError::not_found("thing", id))
    }

    /// Things in creation order
    pub fn list(&self) -> Vec<ThingContext> {
        self.order
            .read()
            .iter()
            .filter_map(|id| self.things.get(id).map(|t| t.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.things.len()
    }

    pub fn is_empty(&self) -> bool {
        self.things.is_empty()
    }
}
