use crate::model::SensorValue;
use crate::scheduler::Publisher;
use crate::sensor::{Measurement, Sensor};

use std::collections::BTreeMap;
use std::sync::RwLock;

/// Latest published value of every sensor, keyed by unique id.
#[derive(Debug, Default)]
pub struct StateStore {
    values: RwLock<BTreeMap<String, SensorValue>>,
}

impl StateStore {
    pub fn new() -> Self {
        StateStore::default()
    }

    pub fn get(&self, unique_id: &str) -> Option<SensorValue> {
        self.values
            .read()
            .ok()
            .and_then(|values| values.get(unique_id).cloned())
    }

    /// All values ordered by unique id.
    pub fn snapshot(&self) -> Vec<SensorValue> {
        self.values
            .read()
            .map(|values| values.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl Publisher for StateStore {
    fn publish(&self, sensor: &Sensor, value: &SensorValue) {
        if let Ok(mut values) = self.values.write() {
            values.insert(sensor.unique_id().to_string(), value.clone());
        } else {
            log::trace!("Unable to lock state store, skipping {}", sensor.name())
        }
    }
}
