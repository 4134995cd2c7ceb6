use fronius_rs::fetcher::UpdateOutcome;
use fronius_rs::model::{SensorValue, Source};
use fronius_rs::scheduler::Publisher;
use fronius_rs::sensor::Sensor;
use prometheus::{Encoder, GaugeVec, IntCounterVec, TextEncoder};

lazy_static! {
    static ref SENSOR_VALUE_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "fronius_sensor_value",
            "converted and rounded value of a monitored field",
        ),
        &["unique_id", "key", "unit"],
    )
    .unwrap();
    static ref SENSOR_AVAILABLE_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "fronius_sensor_available",
            "1 if the field currently has a value, 0 otherwise",
        ),
        &["unique_id", "key"],
    )
    .unwrap();
    static ref FETCH_COUNTER: IntCounterVec = register_int_counter_vec!(
        opts!(
            "fronius_fetch_total",
            "update attempts per data source, by outcome",
        ),
        &["source", "outcome"],
    )
    .unwrap();
}

/// Feeds sensor values and fetch outcomes to the default Prometheus registry.
pub struct PrometheusPublisher;

impl Publisher for PrometheusPublisher {
    fn publish(&self, _sensor: &Sensor, value: &SensorValue) {
        let labels = [value.unique_id.as_str(), value.key.as_str(), value.unit.as_str()];

        match value.value {
            Some(v) => SENSOR_VALUE_GAUGE.with_label_values(&labels).set(v),
            None => {
                /* Drop the series rather than exporting a made-up value */
                if SENSOR_VALUE_GAUGE.remove_label_values(&labels).is_err() {
                    log::trace!("No series to remove for {}", value.unique_id);
                }
            }
        }

        SENSOR_AVAILABLE_GAUGE
            .with_label_values(&[&value.unique_id, &value.key])
            .set(if value.available { 1.0 } else { 0.0 });
    }

    fn fetch_completed(&self, source: Source, outcome: UpdateOutcome) {
        FETCH_COUNTER
            .with_label_values(&[&source.to_string(), outcome.as_str()])
            .inc();
    }
}

/// Read metrics from Prometheus exporter registry.
pub fn read() -> Result<String, fronius_rs::Error> {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    encoder
        .encode(&metric_families, &mut buffer)
        .or(Err(fronius_rs::Error::FormatError))?;
    String::from_utf8(buffer).or(Err(fronius_rs::Error::FormatError))
}
