//! Linear Chain Example - A Two-Model Simulation
//!
//! A "counter" model publishes a growing value every tick; a "monitor"
//! model subscribes to it and prints what it sees. The supervisor spawns
//! each of them (and the three core services) in its own process by
//! re-executing this binary, so `main` must register everything before
//! calling `Simulation::run`.
//!
//! Run with: cargo run --example linear_chain

use cascade_rt::prelude::*;
use async_trait::async_trait;
use serde_json::{json, Value};

// Step 1: Implement your models
struct CounterModel {
    value: i64,
    limit: i64,
}

#[async_trait]
impl SimulationModel for CounterModel {
    async fn setup(&mut self, _setup: &mut ModelSetup<'_>) -> Result<DataMask, ModelError> {
        Ok(DataMask {
            publish: Some(serde_json::from_value(json!({"counters": null})).map_err(to_model_error)?),
            subscribe: Some(MaskTree::Branches(Default::default())),
        })
    }

    fn process_input(&mut self, _data: &[u8]) -> Result<bool, ModelError> {
        Ok(false)
    }

    fn update(
        &mut self,
        moment: Moment,
    ) -> Result<(Option<Vec<u8>>, Option<Timestamp>), ModelError> {
        self.value += 1;
        let payload = json!({"counters": {"main": {"value": self.value}}});
        let raw = serde_json::to_vec(&payload).map_err(to_model_error)?;
        let next_time = (moment.timestamp + 1 <= self.limit).then(|| moment.timestamp + 1);
        Ok((Some(raw), next_time))
    }
}

struct MonitorModel;

#[async_trait]
impl SimulationModel for MonitorModel {
    async fn setup(&mut self, _setup: &mut ModelSetup<'_>) -> Result<DataMask, ModelError> {
        Ok(DataMask {
            publish: Some(MaskTree::Branches(Default::default())),
            subscribe: Some(
                serde_json::from_value(json!({"counters": {"main": null}})).map_err(to_model_error)?,
            ),
        })
    }

    fn process_input(&mut self, data: &[u8]) -> Result<bool, ModelError> {
        let value: Value = serde_json::from_slice(data).map_err(to_model_error)?;
        println!("monitor saw: {value}");
        Ok(true)
    }

    fn update(
        &mut self,
        _moment: Moment,
    ) -> Result<(Option<Vec<u8>>, Option<Timestamp>), ModelError> {
        Ok((None, None))
    }
}

fn to_model_error(error: serde_json::Error) -> ModelError {
    ModelError::failure(error.to_string())
}

// Step 2: Provide factories for the registry
fn counter_factory(config: Value) -> Result<Box<dyn SimulationModel>, ModelError> {
    let limit = config.get("limit").and_then(Value::as_i64).unwrap_or(5);
    Ok(Box::new(CounterModel { value: 0, limit }))
}

fn monitor_factory(_config: Value) -> Result<Box<dyn SimulationModel>, ModelError> {
    Ok(Box::new(MonitorModel))
}

// Step 3: Configure and run
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut simulation = Simulation::new()?;
    simulation.register_model_type("counter", counter_factory);
    simulation.register_model_type("monitor", monitor_factory);
    simulation.configure(&json!({
        "name": "linear_chain",
        "simulation_info": {
            "mode": "time_oriented",
            "start_time": 0,
            "time_scale": 1.0,
            "reference_time": 0.0,
            "duration": 5
        },
        "models": [
            {"name": "counter", "type": "counter", "limit": 5},
            {"name": "monitor", "type": "monitor"}
        ]
    }))?;

    let code = simulation.run().await?;
    std::process::exit(code);
}
