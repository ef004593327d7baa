//! Thing Types
//!
//! A [`ThingType`] pairs a declarative [`ThingDef`] with the Rust code behind
//! it: one handler per action and optional hooks that run after a client
//! writes a property. Types are registered once at startup and compiled by the
//! [`MetadataCompiler`](crate::MetadataCompiler).

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use thing_types::{ThingDef, ThingValue};

use crate::action::ActionRequest;
use crate::context::ThingContext;
use crate::error::HandlerError;

/// Handler that finishes before returning
pub type SyncHandler = Arc<dyn Fn(&ActionRequest) -> Result<(), HandlerError> + Send + Sync>;

/// Handler that may suspend; it receives the request by value
pub type AsyncHandler =
    Arc<dyn Fn(ActionRequest) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// Called after a client successfully writes a property
pub type WriteHook = Arc<dyn Fn(&ThingContext, &ThingValue) + Send + Sync>;

/// Code bound to an action
#[derive(Clone)]
pub enum ActionHandler {
    Sync(SyncHandler),
    Async(AsyncHandler),
}

impl ActionHandler {
    pub fn is_async(&self) -> bool {
        matches!(self, ActionHandler::Async(_))
    }
}

impl std::fmt::Debug for ActionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionHandler::Sync(_) => write!(f, "ActionHandler::Sync"),
            ActionHandler::Async(_) => write!(f, "ActionHandler::Async"),
        }
    }
}

/// A thing definition plus its behavior
pub struct ThingType {
    def: ThingDef,
    handlers: HashMap<String, ActionHandler>,
    write_hooks: HashMap<String, WriteHook>,
}

impl ThingType {
    pub fn new(def: ThingDef) -> Self {
        Self {
            def,
            handlers: HashMap::new(),
            write_hooks: HashMap::new(),
        }
    }

    /// Bind a synchronous handler to an action
    pub fn on_action_sync<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&ActionRequest) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.handlers
            .insert(name.into(), ActionHandler::Sync(Arc::new(handler)));
        self
    }

    /// Bind an asynchronous handler to an action
    pub fn on_action<F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ActionRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let boxed: AsyncHandler = Arc::new(move |request| handler(request).boxed());
        self.handlers.insert(name.into(), ActionHandler::Async(boxed));
        self
    }

    /// Run `hook` after each successful client write of `property`
    pub fn on_write<F>(mut self, property: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&ThingContext, &ThingValue) + Send + Sync + 'static,
    {
        self.write_hooks.insert(property.into(), Arc::new(hook));
        self
    }

    pub fn def(&self) -> &ThingDef {
        &self.def
    }

    pub fn type_id(&self) -> &str {
        &self.def.type_id
    }

    pub fn handler(&self, action: &str) -> Option<&ActionHandler> {
        self.handlers.get(action)
    }

    pub fn handler_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn write_hook(&self, property: &str) -> Option<&WriteHook> {
        self.write_hooks.get(property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thing_types::ActionDef;

    #[test]
    fn test_handler_binding() {
        let thing_type = ThingType::new(ThingDef::new("switch", "Switch").add_action(ActionDef::new("flip")))
            .on_action_sync("flip", |_req| Ok(()))
            .on_action("slow", |_req| async { Ok::<(), HandlerError>(()) })
            .on_write("on", |_ctx, _value| {});

        assert_eq!(thing_type.type_id(), "switch");
        assert!(!thing_type.handler("flip").unwrap().is_async());
        assert!(thing_type.handler("slow").unwrap().is_async());
        assert!(thing_type.write_hook("on").is_some());
        assert!(thing_type.handler("missing").is_none());
    }
}
