//! Thing Context
//!
//! One [`ThingContext`] per hosted thing. It ties the thing's property store,
//! action table, event log and notification hub together and is the handle
//! that HTTP handlers, WebSocket sessions and thing-side logic all work
//! through. Cloning is cheap.

use std::sync::Arc;

use serde_json::{json, Map, Value as JsonValue};
use thing_types::{Envelope, ThingValue};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::action::{ActionInfo, ActionRegistry};
use crate::compiler::CompiledType;
use crate::error::{ThingError, ThingResult};
use crate::event_log::{format_timestamp, EventLog, EventRecord};
use crate::hub::{MessageSink, NotificationHub, SubscriberId};
use crate::property::PropertyRegistry;
use crate::resolver::ServiceResolver;

struct ThingInner {
    id: String,
    title: String,
    href: String,
    compiled: Arc<CompiledType>,
    properties: PropertyRegistry,
    actions: ActionRegistry,
    events: EventLog,
    hub: Arc<NotificationHub>,
    resolver: Arc<dyn ServiceResolver>,
}

/// Handle to one hosted thing
#[derive(Clone)]
pub struct ThingContext {
    inner: Arc<ThingInner>,
}

impl ThingContext {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        compiled: Arc<CompiledType>,
        event_capacity: usize,
        resolver: Arc<dyn ServiceResolver>,
    ) -> Self {
        let id = id.into();
        let href = format!("/things/{}", id);
        let hub = Arc::new(NotificationHub::new(id.clone()));
        let events = EventLog::new(compiled.events().iter().map(|e| e.name()), event_capacity);
        Self {
            inner: Arc::new(ThingInner {
                properties: PropertyRegistry::new(Arc::clone(&compiled), Arc::clone(&hub)),
                actions: ActionRegistry::new(href.clone(), Arc::clone(&compiled), Arc::clone(&hub)),
                events,
                title: title.into(),
                id,
                href,
                compiled,
                hub,
                resolver,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn title(&self) -> &str {
        &self.inner.title
    }

    pub fn href(&self) -> &str {
        &self.inner.href
    }

    pub fn type_id(&self) -> &str {
        self.inner.compiled.type_id()
    }

    pub fn compiled(&self) -> &Arc<CompiledType> {
        &self.inner.compiled
    }

    pub fn resolver(&self) -> &dyn ServiceResolver {
        self.inner.resolver.as_ref()
    }

    pub fn hub(&self) -> &Arc<NotificationHub> {
        &self.inner.hub
    }

    pub fn actions_registry(&self) -> &ActionRegistry {
        &self.inner.actions
    }

    pub fn event_log(&self) -> &EventLog {
        &self.inner.events
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Properties
    // ─────────────────────────────────────────────────────────────────────────

    pub fn get_property(&self, name: &str) -> ThingResult<JsonValue> {
        self.inner.properties.get(name)
    }

    /// Client write; runs the property's write hook on success
    pub fn set_property(&self, name: &str, value: &JsonValue) -> ThingResult<JsonValue> {
        let (stored, rendered) = self.inner.properties.set(name, value)?;
        if let Some(hook) = self
            .inner
            .compiled
            .property(name)
            .and_then(|binding| binding.on_write.as_ref())
        {
            hook(self, &stored);
        }
        tracing::debug!(thing_id = %self.inner.id, property = %name, value = %rendered, "Property set");
        Ok(rendered)
    }

    /// Thing-side write; validated but not subject to the access mode
    pub fn update_property(&self, name: &str, value: impl Into<ThingValue>) -> ThingResult<JsonValue> {
        self.inner.properties.update(name, value.into())
    }

    pub fn property_value(&self, name: &str) -> ThingResult<ThingValue> {
        self.inner.properties.value(name)
    }

    pub fn properties(&self) -> Map<String, JsonValue> {
        self.inner.properties.snapshot()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Actions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn create_action(&self, name: &str, input: &JsonValue) -> ThingResult<Arc<ActionInfo>> {
        self.inner.actions.create(name, input)
    }

    pub fn create_action_from_envelope(&self, body: &JsonValue) -> ThingResult<Arc<ActionInfo>> {
        self.inner.actions.create_from_envelope(body)
    }

    /// Run an action in the background
    pub fn spawn_action(&self, info: Arc<ActionInfo>) -> JoinHandle<()> {
        let thing = self.clone();
        tokio::spawn(async move {
            thing
                .inner
                .actions
                .execute(info, thing.clone())
                .await;
        })
    }

    pub fn action(&self, name: &str, id: Uuid) -> ThingResult<Arc<ActionInfo>> {
        self.inner.actions.get(name, id)
    }

    pub fn actions(&self, name: Option<&str>) -> Vec<Arc<ActionInfo>> {
        if let Some(name) = name {
            if self.inner.compiled.action(name).is_none() {
                return Vec::new();
            }
        }
        self.inner.actions.list(name)
    }

    pub fn cancel_action(&self, name: &str, id: Uuid) -> ThingResult<bool> {
        self.inner.actions.cancel(name, id)
    }

    pub fn remove_action(&self, name: &str, id: Uuid) -> ThingResult<()> {
        self.inner.actions.remove(name, id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    /// Record an event and notify interested subscribers
    pub fn emit_event(&self, name: &str, data: JsonValue) -> ThingResult<Arc<EventRecord>> {
        let descriptor = self
            .inner
            .compiled
            .event(name)
            .ok_or_else(|| ThingError::not_found("event", name))?;
        let data = match &descriptor.value {
            Some(binding) => binding
                .convert(&data)
                .map_err(|e| ThingError::validation(name, e))?
                .to_json(),
            None => data,
        };

        let record = self.inner.events.append(name, data)?;
        self.inner.hub.publish(Envelope::event(
            name,
            record.data.clone(),
            &format_timestamp(&record.timestamp),
        ));
        tracing::debug!(thing_id = %self.inner.id, event = %name, "Event emitted");
        Ok(record)
    }

    /// Retained records, for one event name or all of them
    pub fn events(&self, name: Option<&str>) -> ThingResult<Vec<Arc<EventRecord>>> {
        match name {
            Some(name) => self.inner.events.snapshot(name),
            None => Ok(self.inner.events.snapshot_all()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subscriptions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn subscribe(&self, sink: Arc<dyn MessageSink>) -> SubscriberId {
        self.inner.hub.subscribe(sink)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.hub.unsubscribe(id)
    }

    /// Register interest in an event. Unknown names are rejected unless wildcarded.
    pub fn add_event_subscription(&self, id: SubscriberId, name: &str) -> ThingResult<()> {
        let wildcard = name.contains(['*', '?']);
        if !wildcard && self.inner.compiled.event(name).is_none() {
            return Err(ThingError::not_found("event", name));
        }
        if !self.inner.hub.add_event_interest(id, name) {
            return Err(ThingError::not_found("subscriber", id.to_string()));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Thing Description
    // ─────────────────────────────────────────────────────────────────────────

    /// Render the thing description. `ws_href` adds an alternate WebSocket link.
    pub fn description(&self, ws_href: Option<&str>) -> JsonValue {
        let href = self.inner.href.as_str();
        let def = &self.inner.compiled.def;

        let properties: Map<String, JsonValue> = self
            .inner
            .compiled
            .properties()
            .iter()
            .map(|p| (p.name().to_string(), p.describe(href)))
            .collect();
        let actions: Map<String, JsonValue> = self
            .inner
            .compiled
            .actions()
            .iter()
            .map(|a| (a.name().to_string(), a.describe(href)))
            .collect();
        let events: Map<String, JsonValue> = self
            .inner
            .compiled
            .events()
            .iter()
            .map(|e| (e.name().to_string(), e.describe(href)))
            .collect();

        let mut links = vec![
            json!({"rel": "properties", "href": format!("{}/properties", href)}),
            json!({"rel": "actions", "href": format!("{}/actions", href)}),
            json!({"rel": "events", "href": format!("{}/events", href)}),
        ];
        if let Some(ws) = ws_href {
            links.push(json!({"rel": "alternate", "href": ws}));
        }

        let mut desc = Map::new();
        desc.insert("id".into(), JsonValue::from(self.inner.id.as_str()));
        desc.insert("title".into(), JsonValue::from(self.inner.title.as_str()));
        desc.insert("@context".into(), JsonValue::from(def.context.as_str()));
        if !def.semantic_types.is_empty() {
            desc.insert("@type".into(), json!(def.semantic_types));
        }
        if let Some(description) = &def.description {
            desc.insert("description".into(), JsonValue::from(description.as_str()));
        }
        desc.insert("href".into(), JsonValue::from(href));
        desc.insert("properties".into(), JsonValue::Object(properties));
        desc.insert("actions".into(), JsonValue::Object(actions));
        desc.insert("events".into(), JsonValue::Object(events));
        desc.insert("links".into(), JsonValue::Array(links));
        JsonValue::Object(desc)
    }
}

impl std::fmt::Debug for ThingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThingContext")
            .field("id", &self.inner.id)
            .field("type_id", &self.type_id())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use thing_types::{Constraints, EventDef, PropertyDef, ThingDef, ValueType};
    use tokio::sync::mpsc;

    use crate::resolver::ServiceMap;
    use crate::thing_type::ThingType;
    use crate::compiler::compile_type;

    fn sensor(writes: Arc<AtomicUsize>) -> ThingContext {
        let def = ThingDef::new("sensor", "Sensor")
            .with_semantic_type("MultiLevelSensor")
            .add_property(
                PropertyDef::new("threshold", ValueType::Float64)
                    .with_constraints(Constraints::new().minimum(0.0).maximum(1.0)),
            )
            .add_event(EventDef::new("alarm").with_value_type(ValueType::Int16))
            .add_event(EventDef::new("note"));
        let thing_type = ThingType::new(def).on_write("threshold", move |_ctx, _value| {
            writes.fetch_add(1, Ordering::SeqCst);
        });
        let compiled = Arc::new(compile_type(&thing_type).unwrap());
        ThingContext::new("sensor-1", "Sensor One", compiled, 2, Arc::new(ServiceMap::new()))
    }

    #[test]
    fn test_write_hook_runs_after_success() {
        let writes = Arc::new(AtomicUsize::new(0));
        let thing = sensor(Arc::clone(&writes));

        thing.set_property("threshold", &json!(0.5)).unwrap();
        assert!(thing.set_property("threshold", &json!(2.0)).is_err());
        assert_eq!(writes.load(Ordering::SeqCst), 1);

        // Thing-side updates do not trigger the hook
        thing.update_property("threshold", 0.25).unwrap();
        assert_eq!(writes.load(Ordering::SeqCst), 1);
        assert_eq!(thing.get_property("threshold").unwrap(), json!(0.25));
    }

    #[tokio::test]
    async fn test_event_emit_and_subscribe() {
        let thing = sensor(Arc::new(AtomicUsize::new(0)));
        let (tx, mut rx) = mpsc::channel(8);
        let id = thing.subscribe(Arc::new(tx));
        thing.add_event_subscription(id, "alarm").unwrap();
        assert!(thing.add_event_subscription(id, "missing").is_err());

        thing.emit_event("alarm", json!(3)).unwrap();
        thing.emit_event("note", json!({"text": "hi"})).unwrap();
        assert!(thing.emit_event("alarm", json!("loud")).is_err());
        assert!(thing.emit_event("missing", JsonValue::Null).is_err());

        let msg: JsonValue = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(msg["messageType"], json!("event"));
        assert_eq!(msg["data"]["alarm"]["data"], json!(3));
        assert!(rx.try_recv().is_err());

        assert_eq!(thing.events(None).unwrap().len(), 2);
        assert_eq!(thing.events(Some("alarm")).unwrap().len(), 1);
    }

    #[test]
    fn test_event_capacity() {
        let thing = sensor(Arc::new(AtomicUsize::new(0)));
        for i in 0..5 {
            thing.emit_event("alarm", json!(i)).unwrap();
        }
        let data: Vec<_> = thing
            .events(Some("alarm"))
            .unwrap()
            .iter()
            .map(|r| r.data.clone())
            .collect();
        assert_eq!(data, vec![json!(3), json!(4)]);
    }

    #[test]
    fn test_description() {
        let thing = sensor(Arc::new(AtomicUsize::new(0)));
        let desc = thing.description(Some("ws://localhost/things/sensor-1"));

        assert_eq!(desc["id"], json!("sensor-1"));
        assert_eq!(desc["@type"], json!(["MultiLevelSensor"]));
        assert_eq!(desc["properties"]["threshold"]["type"], json!("number"));
        assert_eq!(desc["properties"]["threshold"]["maximum"], json!(1.0));
        assert_eq!(
            desc["properties"]["threshold"]["links"][0]["href"],
            json!("/things/sensor-1/properties/threshold")
        );
        assert_eq!(desc["events"]["alarm"]["type"], json!("integer"));
        assert_eq!(desc["links"][3]["rel"], json!("alternate"));
    }
}
