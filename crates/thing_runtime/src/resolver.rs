//! Service resolution for injected action parameters

use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;
use thing_types::service_key;

/// A shared service instance
pub type SharedService = Arc<dyn Any + Send + Sync>;

/// Looks up services by key for action parameters marked as injected
pub trait ServiceResolver: Send + Sync {
    fn resolve(&self, key: &str) -> Option<SharedService>;
}

/// Map-backed resolver keyed by the service's Rust type
#[derive(Default)]
pub struct ServiceMap {
    services: DashMap<String, SharedService>,
}

impl ServiceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service under the key of its type
    pub fn insert<T: Any + Send + Sync>(&self, service: Arc<T>) {
        self.services.insert(service_key::<T>(), service);
    }

    pub fn with<T: Any + Send + Sync>(self, service: Arc<T>) -> Self {
        self.insert(service);
        self
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceResolver for ServiceMap {
    fn resolve(&self, key: &str) -> Option<SharedService> {
        self.services.get(key).map(|s| Arc::clone(s.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Clock(u64);

    #[test]
    fn test_resolve_by_type() {
        let services = ServiceMap::new().with(Arc::new(Clock(42)));
        let resolved = services.resolve(&service_key::<Clock>()).unwrap();
        let clock = resolved.downcast::<Clock>().ok().unwrap();
        assert_eq!(clock.0, 42);
        assert!(services.resolve("missing").is_none());
    }
}
