//! Dimmable lamp
//!
//! `on` and `brightness` properties, a slow `fade` action that steps the
//! brightness towards a target, an instant `toggle` action, and an
//! `overheated` event raised when a fade ends at a very high level.

use std::time::Duration;

use serde_json::json;
use tracing::debug;

use thing_runtime::{ActionRequest, HandlerError, ThingType};
use thing_types::{
    ActionDef, Constraints, EventDef, ParameterDef, PropertyDef, ThingDef, ThingValue, ValueType,
};

pub const TYPE_ID: &str = "lamp";

/// Fades ending at or above this level raise `overheated`
pub const OVERHEAT_LEVEL: i64 = 95;

const DEFAULT_FADE_MS: i64 = 1000;

/// How fades are stepped; injected into the `fade` handler
#[derive(Debug, Clone)]
pub struct FadeProfile {
    pub steps: u32,
}

impl Default for FadeProfile {
    fn default() -> Self {
        Self { steps: 10 }
    }
}

pub fn definition() -> ThingDef {
    let percent = || Constraints::new().minimum(0).maximum(100);

    ThingDef::new(TYPE_ID, "My Lamp")
        .with_description("A web connected lamp")
        .with_semantic_type("OnOffSwitch")
        .with_semantic_type("Light")
        .add_property(
            PropertyDef::new("on", ValueType::Boolean)
                .with_title("On/Off")
                .with_description("Whether the lamp is turned on")
                .with_semantic_type("OnOffProperty")
                .with_initial(json!(true)),
        )
        .add_property(
            PropertyDef::new("brightness", ValueType::Int32)
                .with_title("Brightness")
                .with_description("The level of light from 0-100")
                .with_semantic_type("BrightnessProperty")
                .with_unit("percent")
                .with_constraints(percent())
                .with_initial(json!(50)),
        )
        .add_action(
            ActionDef::new("fade")
                .with_title("Fade")
                .with_description("Fade the lamp to a given level")
                .with_semantic_type("FadeAction")
                .add_parameter(
                    ParameterDef::new("level", ValueType::Int32)
                        .with_unit("percent")
                        .with_constraints(percent()),
                )
                .add_parameter(
                    ParameterDef::new("duration", ValueType::Int64)
                        .with_unit("milliseconds")
                        .with_constraints(Constraints::new().minimum(1).nullable(true)),
                )
                .add_parameter(ParameterDef::injected::<FadeProfile>("profile")),
        )
        .add_action(
            ActionDef::new("toggle")
                .with_title("Toggle")
                .with_semantic_type("ToggleAction"),
        )
        .add_event(
            EventDef::new("overheated")
                .with_description("The lamp has exceeded its safe operating temperature")
                .with_semantic_type("OverheatedEvent")
                .with_value_type(ValueType::Int32)
                .with_unit("percent"),
        )
}

pub fn thing_type() -> ThingType {
    ThingType::new(definition())
        .on_action("fade", fade)
        .on_action_sync("toggle", toggle)
        .on_write("on", |thing, value| {
            debug!(thing_id = %thing.id(), on = %value, "Lamp switched");
        })
}

async fn fade(request: ActionRequest) -> Result<(), HandlerError> {
    let thing = request.thing().clone();
    let target = request
        .input()
        .get_i64("level")
        .ok_or_else(|| HandlerError::new("level is required"))?;
    let duration = request.input().get_i64("duration").unwrap_or(DEFAULT_FADE_MS);
    let profile = request
        .service::<FadeProfile>("profile")
        .unwrap_or_default();

    let start = thing
        .property_value("brightness")?
        .as_i64()
        .unwrap_or_default();
    let steps = profile.steps.max(1);
    let step_delay = Duration::from_millis(duration.max(0) as u64) / steps;
    let cancel = request.cancel_signal();

    for step in 1..=steps as i64 {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(thing_id = %thing.id(), action_id = %request.action().id(), "Fade cancelled");
                return Ok(());
            }
            _ = tokio::time::sleep(step_delay) => {}
        }
        let level = start + (target - start) * step / steps as i64;
        thing.update_property("brightness", ThingValue::Int(level))?;
    }

    if target >= OVERHEAT_LEVEL {
        thing.emit_event("overheated", json!(target))?;
    }
    Ok(())
}

fn toggle(request: &ActionRequest) -> Result<(), HandlerError> {
    let thing = request.thing();
    let on = thing.property_value("on")?.as_bool().unwrap_or_default();
    thing.update_property("on", !on)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use thing_runtime::{ActionStatus, RegistrySettings, ServiceMap, ThingRegistry};

    fn registry(steps: u32) -> ThingRegistry {
        let services = ServiceMap::new().with(Arc::new(FadeProfile { steps }));
        let registry = ThingRegistry::with_resolver(RegistrySettings::default(), Arc::new(services));
        registry.register_type(thing_type()).unwrap();
        registry
    }

    #[tokio::test]
    async fn test_fade_reaches_target_and_overheats() {
        let registry = registry(4);
        let lamp = registry.create_thing(TYPE_ID, "lamp-1", None).unwrap();

        let info = lamp
            .create_action("fade", &json!({"level": 100, "duration": 20}))
            .unwrap();
        lamp.actions_registry().execute(Arc::clone(&info), lamp.clone()).await;

        assert_eq!(info.status(), ActionStatus::Completed);
        assert_eq!(lamp.get_property("brightness").unwrap(), json!(100));
        let events = lamp.events(Some("overheated")).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, json!(100));
    }

    #[tokio::test]
    async fn test_cancelled_fade_stops_early() {
        let registry = registry(100);
        let lamp = registry.create_thing(TYPE_ID, "lamp-1", None).unwrap();

        let info = lamp
            .create_action("fade", &json!({"level": 0, "duration": 60000}))
            .unwrap();
        let task = lamp.spawn_action(Arc::clone(&info));
        tokio::time::sleep(Duration::from_millis(20)).await;
        info.cancel();
        task.await.unwrap();

        assert_eq!(info.status(), ActionStatus::Completed);
        assert_eq!(lamp.get_property("brightness").unwrap(), json!(50));
    }

    #[test]
    fn test_toggle() {
        let registry = registry(1);
        let lamp = registry.create_thing(TYPE_ID, "lamp-1", None).unwrap();
        let request = lamp.create_action("toggle", &serde_json::Value::Null).unwrap();
        assert_eq!(request.status(), ActionStatus::Created);

        tokio_test::block_on(lamp.actions_registry().execute(Arc::clone(&request), lamp.clone()));
        assert_eq!(lamp.get_property("on").unwrap(), json!(false));
    }

    #[test]
    fn test_fade_input_validation() {
        let registry = registry(1);
        let lamp = registry.create_thing(TYPE_ID, "lamp-1", None).unwrap();
        assert!(lamp.create_action("fade", &json!({"level": 101})).is_err());
        assert!(lamp.create_action("fade", &json!({"level": 10, "duration": 0})).is_err());
        assert!(lamp.create_action("fade", &json!({"duration": 10})).is_err());
        assert!(lamp.create_action("fade", &json!({"level": 10})).is_ok());
    }
}
