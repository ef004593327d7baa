//! Simulated humidity sensor with a read-only `level` that drifts over time

use std::time::Duration;

use rand::Rng;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use thing_runtime::{ThingContext, ThingType};
use thing_types::{Constraints, PropertyDef, ThingDef, ThingValue, ValueType};

pub const TYPE_ID: &str = "humidity-sensor";

/// Largest change applied per tick, in percent
const MAX_DRIFT: f64 = 2.0;

pub fn definition() -> ThingDef {
    ThingDef::new(TYPE_ID, "My Humidity Sensor")
        .with_description("A web connected humidity sensor")
        .with_semantic_type("MultiLevelSensor")
        .add_property(
            PropertyDef::read_only("level", ValueType::Float64)
                .with_title("Humidity")
                .with_description("The current humidity in %")
                .with_semantic_type("LevelProperty")
                .with_unit("percent")
                .with_constraints(Constraints::new().minimum(0).maximum(100))
                .with_initial(json!(50.0)),
        )
}

pub fn thing_type() -> ThingType {
    ThingType::new(definition())
}

/// Next reading: a bounded random step, clamped and rounded to 0.1
pub fn drift(current: f64, rng: &mut impl Rng) -> f64 {
    let next = current + rng.gen_range(-MAX_DRIFT..=MAX_DRIFT);
    (next.clamp(0.0, 100.0) * 10.0).round() / 10.0
}

/// Update `level` every `interval` until the task is aborted
pub fn spawn_simulation(thing: ThingContext, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let current = match thing.property_value("level") {
                Ok(value) => value.as_f64().unwrap_or(50.0),
                Err(e) => {
                    warn!(thing_id = %thing.id(), error = %e, "Sensor has no level property");
                    return;
                }
            };
            let next = drift(current, &mut rand::thread_rng());
            match thing.update_property("level", ThingValue::Float64(next)) {
                Ok(_) => trace!(thing_id = %thing.id(), level = next, "Humidity updated"),
                Err(e) => warn!(thing_id = %thing.id(), error = %e, "Failed to update humidity"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    use thing_runtime::{RegistrySettings, ThingRegistry};

    #[test]
    fn test_drift_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut level = 99.0;
        for _ in 0..1000 {
            let next = drift(level, &mut rng);
            assert!((0.0..=100.0).contains(&next));
            assert!((next - level).abs() <= MAX_DRIFT + 0.1);
            level = next;
        }
    }

    #[tokio::test]
    async fn test_level_is_read_only_to_clients() {
        let registry = ThingRegistry::new(RegistrySettings::default());
        registry.register_type(thing_type()).unwrap();
        let sensor = registry.create_thing(TYPE_ID, "humidity-1", None).unwrap();

        assert!(sensor.set_property("level", &json!(10.0)).is_err());
        assert_eq!(sensor.get_property("level").unwrap(), json!(50.0));

        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        sensor.subscribe(Arc::new(tx));
        let task = spawn_simulation(sensor.clone(), Duration::from_millis(10));
        let message = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        task.abort();

        let value: serde_json::Value = serde_json::from_str(&message).unwrap();
        assert_eq!(value["messageType"], json!("propertyStatus"));
        assert!(value["data"]["level"].is_number());
    }
}
