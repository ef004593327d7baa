//! Action Registry
//!
//! Owns every [`ActionInfo`] of one thing and drives the action lifecycle:
//!
//! ```text
//! Created ──execute──▶ Pending ──▶ Executing ──handler returns──▶ Completed
//! ```
//!
//! Status only moves forward. Each transition is recorded with a
//! compare-and-swap before it is published, so an action is dispatched at
//! most once and every status is announced at most once. Handler failures and
//! panics are logged; the action still ends up `Completed`.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::FutureExt;
use serde_json::{json, Map, Value as JsonValue};
use thing_types::{Envelope, ThingValue};
use tokio::sync::watch;
use uuid::Uuid;

use crate::compiler::{ActionDescriptor, CompiledType};
use crate::context::ThingContext;
use crate::error::{HandlerError, ThingError, ThingResult};
use crate::event_log::format_timestamp;
use crate::hub::NotificationHub;
use crate::resolver::SharedService;
use crate::thing_type::ActionHandler;

// ─────────────────────────────────────────────────────────────────────────────
// Action Status
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ActionStatus {
    Created = 0,
    Pending = 1,
    Executing = 2,
    Completed = 3,
}

impl ActionStatus {
    /// Convert from u8
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Created,
            1 => Self::Pending,
            2 => Self::Executing,
            _ => Self::Completed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self == ActionStatus::Completed
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Created => "created",
            ActionStatus::Pending => "pending",
            ActionStatus::Executing => "executing",
            ActionStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Action Input
// ─────────────────────────────────────────────────────────────────────────────

/// Validated input of one invocation, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionInput {
    values: Vec<(String, ThingValue)>,
}

impl ActionInput {
    pub fn new(values: Vec<(String, ThingValue)>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&ThingValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ThingValue::as_bool)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ThingValue::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ThingValue::as_f64)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ThingValue::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ThingValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cancellation
// ─────────────────────────────────────────────────────────────────────────────

/// Cooperative cancellation signal handed to handlers
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Action Info
// ─────────────────────────────────────────────────────────────────────────────

/// One invocation of an action
pub struct ActionInfo {
    id: Uuid,
    seq: u64,
    descriptor: Arc<ActionDescriptor>,
    href: String,
    input: ActionInput,
    /// Input as received, echoed in descriptions
    raw_input: JsonValue,
    status: AtomicU8,
    time_requested: DateTime<Utc>,
    time_completed: OnceLock<DateTime<Utc>>,
    cancel: watch::Sender<bool>,
}

impl ActionInfo {
    fn new(
        seq: u64,
        descriptor: Arc<ActionDescriptor>,
        thing_href: &str,
        input: ActionInput,
        raw_input: JsonValue,
    ) -> Self {
        let id = Uuid::new_v4();
        let href = format!("{}/actions/{}/{}", thing_href, descriptor.name(), id);
        let (cancel, _) = watch::channel(false);
        Self {
            id,
            seq,
            descriptor,
            href,
            input,
            raw_input,
            status: AtomicU8::new(ActionStatus::Created as u8),
            time_requested: Utc::now(),
            time_completed: OnceLock::new(),
            cancel,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn input(&self) -> &ActionInput {
        &self.input
    }

    pub fn descriptor(&self) -> &Arc<ActionDescriptor> {
        &self.descriptor
    }

    pub fn status(&self) -> ActionStatus {
        ActionStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn time_requested(&self) -> DateTime<Utc> {
        self.time_requested
    }

    /// Set only once the action is completed
    pub fn time_completed(&self) -> Option<DateTime<Utc>> {
        if self.status().is_terminal() {
            self.time_completed.get().copied()
        } else {
            None
        }
    }

    /// Move forward to `to`. Returns false if the action is already there or past it.
    fn advance(&self, to: ActionStatus) -> bool {
        let mut current = self.status.load(Ordering::Acquire);
        loop {
            if current >= to as u8 {
                return false;
            }
            match self.status.compare_exchange_weak(
                current,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    fn complete(&self) -> bool {
        let _ = self.time_completed.set(Utc::now());
        self.advance(ActionStatus::Completed)
    }

    /// Request cooperative cancellation. No-op once completed; idempotent.
    pub fn cancel(&self) -> bool {
        if self.status().is_terminal() {
            return false;
        }
        let already = self.cancel.send_replace(true);
        !already
    }

    pub fn is_cancel_requested(&self) -> bool {
        *self.cancel.borrow()
    }

    pub fn cancel_signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.cancel.subscribe(),
        }
    }

    /// Rendered body: `{"<name>": {input, href, status, timeRequested, timeCompleted?}}`
    pub fn description(&self) -> JsonValue {
        let status = self.status();
        let mut body = Map::new();
        let input = match &self.raw_input {
            JsonValue::Null => JsonValue::Object(Map::new()),
            other => other.clone(),
        };
        body.insert("input".into(), input);
        body.insert("href".into(), JsonValue::from(self.href.as_str()));
        body.insert("status".into(), JsonValue::from(status.as_str()));
        body.insert(
            "timeRequested".into(),
            JsonValue::from(format_timestamp(&self.time_requested)),
        );
        if let Some(done) = self.time_completed() {
            body.insert("timeCompleted".into(), JsonValue::from(format_timestamp(&done)));
        }
        json!({ self.name(): body })
    }
}

impl std::fmt::Debug for ActionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionInfo")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("status", &self.status())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Action Request
// ─────────────────────────────────────────────────────────────────────────────

/// What a handler receives
#[derive(Clone)]
pub struct ActionRequest {
    thing: ThingContext,
    action: Arc<ActionInfo>,
    services: HashMap<String, SharedService>,
}

impl ActionRequest {
    pub fn thing(&self) -> &ThingContext {
        &self.thing
    }

    pub fn action(&self) -> &Arc<ActionInfo> {
        &self.action
    }

    pub fn input(&self) -> &ActionInput {
        self.action.input()
    }

    /// Injected service for parameter `name`
    pub fn service<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let service = self.services.get(name)?;
        Arc::clone(service).downcast::<T>().ok()
    }

    pub fn cancel_signal(&self) -> CancelSignal {
        self.action.cancel_signal()
    }

    pub fn is_cancelled(&self) -> bool {
        self.action.is_cancel_requested()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Action Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Action table of one thing
pub struct ActionRegistry {
    thing_href: String,
    compiled: Arc<CompiledType>,
    actions: DashMap<Uuid, Arc<ActionInfo>>,
    next_seq: AtomicU64,
    hub: Arc<NotificationHub>,
}

impl ActionRegistry {
    pub fn new(
        thing_href: impl Into<String>,
        compiled: Arc<CompiledType>,
        hub: Arc<NotificationHub>,
    ) -> Self {
        Self {
            thing_href: thing_href.into(),
            compiled,
            actions: DashMap::new(),
            next_seq: AtomicU64::new(0),
            hub,
        }
    }

    /// Validate input and record a new `Created` action
    pub fn create(&self, name: &str, input: &JsonValue) -> ThingResult<Arc<ActionInfo>> {
        let descriptor = self
            .compiled
            .action(name)
            .ok_or_else(|| ThingError::not_found("action", name))?;
        let bound = descriptor.bind_input(input)?;

        let info = Arc::new(ActionInfo::new(
            self.next_seq.fetch_add(1, Ordering::Relaxed),
            Arc::clone(descriptor),
            &self.thing_href,
            bound,
            input.clone(),
        ));
        self.actions.insert(info.id(), Arc::clone(&info));

        tracing::debug!(
            thing_id = %self.hub.thing_id(),
            action = %name,
            action_id = %info.id(),
            "Action created"
        );
        self.publish_status(&info);
        Ok(info)
    }

    /// Create from a request body `{"<name>": {"input": {...}}}`
    pub fn create_from_envelope(&self, body: &JsonValue) -> ThingResult<Arc<ActionInfo>> {
        let (name, request) = single_entry(body)?;
        if self.compiled.action(name).is_none() {
            return Err(ThingError::InvalidRequest(format!("unknown action: {}", name)));
        }
        let input = match request {
            JsonValue::Null => &JsonValue::Null,
            JsonValue::Object(fields) => fields.get("input").unwrap_or(&JsonValue::Null),
            other => {
                return Err(ThingError::InvalidRequest(format!(
                    "request for {} must be an object, got {}",
                    name, other
                )));
            }
        };
        self.create(name, input)
    }

    /// Run an action to completion. Does nothing if it was already dispatched.
    pub async fn execute(&self, info: Arc<ActionInfo>, thing: ThingContext) {
        if !info.advance(ActionStatus::Pending) {
            tracing::debug!(action_id = %info.id(), "Action already dispatched");
            return;
        }
        self.publish_status(&info);

        if info.advance(ActionStatus::Executing) {
            self.publish_status(&info);
        }

        if let Err(e) = run_handler(&info, thing).await {
            tracing::warn!(
                thing_id = %self.hub.thing_id(),
                action = %info.name(),
                action_id = %info.id(),
                error = %e,
                "Action handler failed"
            );
        }

        if info.complete() {
            self.publish_status(&info);
        }
        tracing::debug!(action_id = %info.id(), "Action completed");
    }

    pub fn get(&self, name: &str, id: Uuid) -> ThingResult<Arc<ActionInfo>> {
        self.actions
            .get(&id)
            .filter(|info| info.name() == name)
            .map(|info| Arc::clone(info.value()))
            .ok_or_else(|| ThingError::not_found("action", format!("{}/{}", name, id)))
    }

    /// Actions in creation order, optionally filtered by name
    pub fn list(&self, name: Option<&str>) -> Vec<Arc<ActionInfo>> {
        let mut infos: Vec<_> = self
            .actions
            .iter()
            .filter(|info| name.map_or(true, |n| info.name() == n))
            .map(|info| Arc::clone(info.value()))
            .collect();
        infos.sort_by_key(|info| info.seq);
        infos
    }

    /// Request cancellation of one action
    pub fn cancel(&self, name: &str, id: Uuid) -> ThingResult<bool> {
        Ok(self.get(name, id)?.cancel())
    }

    /// Cancel and forget an action
    pub fn remove(&self, name: &str, id: Uuid) -> ThingResult<()> {
        let info = self.get(name, id)?;
        info.cancel();
        self.actions.remove(&id);
        tracing::debug!(action = %name, action_id = %id, "Action removed");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    fn publish_status(&self, info: &ActionInfo) {
        self.hub
            .publish(Envelope::action_status(info.name(), description_body(info)));
    }
}

/// The inner object of an action description
fn description_body(info: &ActionInfo) -> JsonValue {
    match info.description() {
        JsonValue::Object(mut map) => map.remove(info.name()).unwrap_or(JsonValue::Null),
        other => other,
    }
}

/// The only key/value of a one-entry object
pub(crate) fn single_entry(body: &JsonValue) -> ThingResult<(&str, &JsonValue)> {
    let map = body
        .as_object()
        .ok_or_else(|| ThingError::InvalidRequest("request body must be an object".into()))?;
    let mut entries = map.iter();
    match (entries.next(), entries.next()) {
        (Some((name, value)), None) => Ok((name.as_str(), value)),
        (None, _) => Err(ThingError::InvalidRequest("request body is empty".into())),
        _ => Err(ThingError::InvalidRequest(format!(
            "expected exactly one key, got {}",
            map.len()
        ))),
    }
}

async fn run_handler(info: &Arc<ActionInfo>, thing: ThingContext) -> Result<(), HandlerError> {
    let mut services = HashMap::new();
    for (parameter, key) in info.descriptor().injected() {
        let service = thing
            .resolver()
            .resolve(key)
            .ok_or_else(|| HandlerError::new(format!("service not available: {}", key)))?;
        services.insert(parameter.to_string(), service);
    }

    let request = ActionRequest {
        thing,
        action: Arc::clone(info),
        services,
    };

    match &info.descriptor().handler {
        ActionHandler::Sync(handler) => {
            std::panic::catch_unwind(AssertUnwindSafe(|| handler(&request)))
                .unwrap_or_else(|_| Err(HandlerError::new("handler panicked")))
        }
        ActionHandler::Async(handler) => {
            let handler = Arc::clone(handler);
            AssertUnwindSafe(async move { handler(request).await })
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(HandlerError::new("handler panicked")))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
