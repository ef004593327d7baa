//! Built-in Thing Types
//!
//! The thing types this server can host, and the wiring that turns a
//! [`ServerConfig`] into a populated [`ThingRegistry`].

pub mod humidity;
pub mod lamp;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use thing_runtime::{
    CompileError, RegistrySettings, ServiceMap, ThingError, ThingRegistry, ThingType,
};

use crate::config::ServerConfig;

/// Error type for registry setup
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("Failed to compile thing type: {0}")]
    Compile(#[from] CompileError),

    #[error("Failed to create thing: {0}")]
    Thing(#[from] ThingError),
}

/// All thing types shipped with the server
pub fn builtin_types() -> Vec<ThingType> {
    vec![lamp::thing_type(), humidity::thing_type()]
}

/// Services available for injection into action handlers
pub fn services() -> ServiceMap {
    ServiceMap::new().with(Arc::new(lamp::FadeProfile::default()))
}

/// Register the built-in types and create the configured things
pub fn build_registry(config: &ServerConfig) -> Result<Arc<ThingRegistry>, SetupError> {
    let settings = RegistrySettings {
        event_capacity: config.event_capacity,
    };
    let registry = ThingRegistry::with_resolver(settings, Arc::new(services()));

    for thing_type in builtin_types() {
        registry.register_type(thing_type)?;
    }
    for thing in &config.things {
        registry.create_thing(&thing.kind, &thing.id, thing.title.as_deref())?;
    }

    info!("Hosting {} things", registry.len());
    Ok(Arc::new(registry))
}

/// Start background behavior for things that have any
pub fn start_simulations(registry: &ThingRegistry, interval: Duration) -> Vec<JoinHandle<()>> {
    registry
        .list()
        .into_iter()
        .filter(|thing| thing.type_id() == humidity::TYPE_ID)
        .map(|thing| humidity::spawn_simulation(thing, interval))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThingConfig;

    #[test]
    fn test_build_default_registry() {
        let registry = build_registry(&ServerConfig::default()).unwrap();
        let ids: Vec<_> = registry.list().iter().map(|t| t.id().to_string()).collect();
        assert_eq!(ids, vec!["lamp-1", "humidity-1"]);
    }

    #[test]
    fn test_unknown_kind_fails() {
        let config = ServerConfig {
            things: vec![ThingConfig::new("toaster", "t-1")],
            ..ServerConfig::default()
        };
        assert!(matches!(
            build_registry(&config),
            Err(SetupError::Thing(ThingError::NotFound { .. }))
        ));
    }
}
