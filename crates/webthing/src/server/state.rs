//! Server Application State
//!
//! Shared state accessible by all HTTP and WebSocket handlers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thing_runtime::{ThingContext, ThingRegistry, ThingResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Hosted things
    registry: Arc<ThingRegistry>,

    /// Messages buffered per WebSocket subscriber
    subscriber_buffer: usize,

    /// Open WebSocket sessions
    sessions: AtomicUsize,
}

impl AppState {
    /// Create new application state
    pub fn new(registry: Arc<ThingRegistry>, subscriber_buffer: usize) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                registry,
                subscriber_buffer: subscriber_buffer.max(1),
                sessions: AtomicUsize::new(0),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<ThingRegistry> {
        &self.inner.registry
    }

    /// Look up a hosted thing
    pub fn thing(&self, id: &str) -> ThingResult<ThingContext> {
        self.inner.registry.get(id)
    }

    pub fn subscriber_buffer(&self) -> usize {
        self.inner.subscriber_buffer
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.load(Ordering::Relaxed)
    }

    /// Track an open session until the guard is dropped
    pub fn open_session(&self) -> SessionGuard {
        self.inner.sessions.fetch_add(1, Ordering::Relaxed);
        SessionGuard {
            state: self.clone(),
        }
    }
}

/// Decrements the session count when dropped
pub struct SessionGuard {
    state: AppState,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.state.inner.sessions.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thing_runtime::RegistrySettings;

    #[test]
    fn test_session_guard() {
        let state = AppState::new(Arc::new(ThingRegistry::new(RegistrySettings::default())), 0);
        assert_eq!(state.subscriber_buffer(), 1);
        {
            let _a = state.open_session();
            let _b = state.open_session();
            assert_eq!(state.session_count(), 2);
        }
        assert_eq!(state.session_count(), 0);
        assert!(state.thing("missing").is_err());
    }
}
