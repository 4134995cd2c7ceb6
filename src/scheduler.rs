use crate::fetcher::{Fetcher, UpdateOutcome};
use crate::model::{SensorValue, Source};
use crate::sensor::Sensor;

use chrono::Local;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Host-platform sink for computed sensor values.
pub trait Publisher: Send + Sync {
    fn publish(&self, sensor: &Sensor, value: &SensorValue);

    fn fetch_completed(&self, _source: Source, _outcome: UpdateOutcome) {}
}

struct Group {
    fetcher: Arc<Fetcher>,
    dependents: Vec<Arc<Sensor>>,
}

/// Drives every fetcher and refreshes the sensors depending on it.
pub struct Poller {
    groups: BTreeMap<Source, Group>,
    publishers: Vec<Arc<dyn Publisher>>,
}

impl Default for Poller {
    fn default() -> Self {
        Poller::new()
    }
}

impl Poller {
    pub fn new() -> Self {
        Poller {
            groups: BTreeMap::new(),
            publishers: Vec::new(),
        }
    }

    pub fn add_fetcher(&mut self, fetcher: Fetcher) {
        self.groups.insert(
            fetcher.source(),
            Group {
                fetcher: Arc::new(fetcher),
                dependents: Vec::new(),
            },
        );
    }

    pub fn add_publisher(&mut self, publisher: Arc<dyn Publisher>) {
        self.publishers.push(publisher);
    }

    /// Attach `sensor` to the fetcher of its source. Returns false if no such fetcher exists.
    pub fn register_dependent(&mut self, sensor: Sensor) -> bool {
        match self.groups.get_mut(&sensor.source()) {
            Some(group) => {
                group.dependents.push(Arc::new(sensor));
                true
            }
            None => {
                log::warn!(
                    "No {} fetcher configured, dropping sensor {}",
                    sensor.source(),
                    sensor.name()
                );
                false
            }
        }
    }

    pub fn fetcher(&self, source: Source) -> Option<&Arc<Fetcher>> {
        self.groups.get(&source).map(|group| &group.fetcher)
    }

    pub fn sensors(&self) -> impl Iterator<Item = &Arc<Sensor>> + '_ {
        self.groups.values().flat_map(|group| group.dependents.iter())
    }

    /// Update every fetcher with an available dependent, then publish all dependents.
    pub async fn run_cycle(&self) {
        for (source, group) in self.groups.iter() {
            if group.dependents.is_empty() {
                continue;
            }

            let now = Local::now();
            if group.dependents.iter().any(|s| s.is_available(&now)) {
                let outcome = group.fetcher.update().await;
                for publisher in self.publishers.iter() {
                    publisher.fetch_completed(*source, outcome);
                }
            } else {
                log::info!("Outside availability window, not polling {}", source);
            }

            let payload = group.fetcher.latest_data();
            for sensor in group.dependents.iter() {
                let value = sensor.value(payload.as_deref(), &now);
                for publisher in self.publishers.iter() {
                    publisher.publish(sensor, &value);
                }
            }
        }
    }

    /// Run `run_cycle()` every `interval` until the task is dropped.
    pub async fn run(self: Arc<Self>, interval: Duration) {
        let mut timer = tokio::time::interval(interval);
        loop {
            timer.tick().await;
            self.run_cycle().await;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::endpoint;
    use crate::availability::Availability;
    use crate::fields::field_table;
    use crate::model::{DeviceModel, Scope};
    use crate::sensor::SensorOptions;
    use crate::store::StateStore;
    use chrono::NaiveTime;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Outcomes(Mutex<Vec<(Source, UpdateOutcome)>>);

    impl Publisher for Outcomes {
        fn publish(&self, _sensor: &Sensor, _value: &SensorValue) {}

        fn fetch_completed(&self, source: Source, outcome: UpdateOutcome) {
            self.0.lock().unwrap().push((source, outcome));
        }
    }

    fn sensor(key: &'static str, options: SensorOptions) -> Sensor {
        let descriptor = *field_table(DeviceModel::Symo).get(key).unwrap();
        Sensor::new("Fronius", key, descriptor, options)
    }

    fn fetcher(source: Source, url: String) -> Fetcher {
        Fetcher::new(
            source,
            url,
            Duration::from_secs(300),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn cycle_publishes_every_dependent() {
        let mut server = Server::new_async().await;
        let inverter = server
            .mock("GET", "/solar_api/v1/GetInverterRealtimeData.cgi")
            .match_query(Matcher::Any)
            .with_body(
                json!({"Body": {"Data": {"PAC": {"Value": 1234.567}, "DAY_ENERGY": {"Value": 5500}}}})
                    .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let powerflow = server
            .mock("GET", "/solar_api/v1/GetPowerFlowRealtimeData.fcgi")
            .with_body(json!({"Body": {"Data": {"Site": {"P_Grid": null}}}}).to_string())
            .expect(1)
            .create_async()
            .await;

        let host = server.host_with_port();
        let store = Arc::new(StateStore::new());
        let mut poller = Poller::new();
        poller.add_fetcher(fetcher(
            Source::Inverter,
            endpoint::inverter_url(&host, Scope::Device, "1"),
        ));
        poller.add_fetcher(fetcher(Source::PowerFlow, endpoint::power_flow_url(&host)));
        poller.add_publisher(store.clone());

        let options = SensorOptions::default();
        assert!(poller.register_dependent(sensor("ac_power", options)));
        assert!(poller.register_dependent(sensor("day_energy", options)));
        assert!(poller.register_dependent(sensor("grid_usage", options)));

        /* second cycle is throttled and reuses the cached payloads */
        poller.run_cycle().await;
        poller.run_cycle().await;

        assert_eq!(Some(1234.57), store.get("fronius_ac_power").unwrap().value);
        assert_eq!(Some(5.5), store.get("fronius_day_energy").unwrap().value);
        assert_eq!(Some(0.0), store.get("fronius_grid_usage").unwrap().value);
        assert_eq!(3, store.snapshot().len());

        inverter.assert_async().await;
        powerflow.assert_async().await;
    }

    #[test]
    fn sensor_without_fetcher_is_rejected() {
        let mut poller = Poller::new();
        let meter = sensor("smartmeter_power_ac", SensorOptions::default());
        assert!(!poller.register_dependent(meter));
        assert_eq!(0, poller.sensors().count());
    }

    #[tokio::test]
    async fn failed_fetch_publishes_unavailable() {
        let outcomes = Arc::new(Outcomes::default());
        let store = Arc::new(StateStore::new());
        let mut poller = Poller::new();
        poller.add_fetcher(fetcher(
            Source::PowerFlow,
            endpoint::power_flow_url("127.0.0.1:1"),
        ));
        poller.add_publisher(store.clone());
        poller.add_publisher(outcomes.clone());
        poller.register_dependent(sensor("house_load", SensorOptions::default()));

        poller.run_cycle().await;

        let value = store.get("fronius_house_load").unwrap();
        assert!(!value.available);
        assert_eq!("unavailable", value.state());
        assert_eq!(
            vec![(Source::PowerFlow, UpdateOutcome::Failed)],
            *outcomes.0.lock().unwrap()
        );
    }

    #[tokio::test]
    async fn closed_window_skips_fetch() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/solar_api/v1/GetPowerFlowRealtimeData.fcgi")
            .expect(0)
            .create_async()
            .await;

        /* window containing nothing but the instant of midnight */
        let midnight = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        let options = SensorOptions {
            availability: Availability::Window {
                start: midnight,
                stop: midnight,
            },
            ..SensorOptions::default()
        };

        let outcomes = Arc::new(Outcomes::default());
        let mut poller = Poller::new();
        poller.add_fetcher(fetcher(
            Source::PowerFlow,
            endpoint::power_flow_url(&server.host_with_port()),
        ));
        poller.add_publisher(outcomes.clone());
        poller.register_dependent(sensor("panel_status", options));

        poller.run_cycle().await;
        assert!(outcomes.0.lock().unwrap().is_empty());
        mock.assert_async().await;
    }
}
