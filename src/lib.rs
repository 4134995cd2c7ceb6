pub mod api;
pub mod availability;
pub mod fetcher;
pub mod fields;
pub mod model;
pub mod scheduler;
pub mod sensor;
pub mod settings;
pub mod store;
mod throttle;

pub use api::Error;

use api::endpoint;
use fetcher::Fetcher;
use model::Source;
use scheduler::Poller;
use sensor::Sensor;
use settings::Settings;

fn fetcher(settings: &Settings, source: Source, url: String) -> Result<Fetcher, Error> {
    log::debug!("{} URL: {}", source, url);
    Fetcher::new(source, url, settings.min_interval, settings.timeout)
        .map(|fetcher| fetcher.with_max_age(settings.max_age))
}

/// Build a `Poller` with one fetcher per enabled data source and one sensor per selected field.
/// Publishers are added by the caller.
pub fn poller(settings: &Settings) -> Result<Poller, Error> {
    let table = fields::field_table(settings.device_model);
    let mut poller = Poller::new();

    poller.add_fetcher(fetcher(
        settings,
        Source::Inverter,
        endpoint::inverter_url(
            &settings.host,
            settings.sensor_options.scope,
            &settings.device_id,
        ),
    )?);
    if settings.powerflow {
        poller.add_fetcher(fetcher(
            settings,
            Source::PowerFlow,
            endpoint::power_flow_url(&settings.host),
        )?);
    }
    if settings.smartmeter {
        poller.add_fetcher(fetcher(
            settings,
            Source::SmartMeter,
            endpoint::meter_url(&settings.host, &settings.smartmeter_device_id),
        )?);
    }

    for name in settings.selected_fields(&table)? {
        if let Some(descriptor) = table.get(name) {
            poller.register_dependent(Sensor::new(
                &settings.name,
                name,
                *descriptor,
                settings.sensor_options,
            ));
        }
    }

    Ok(poller)
}

#[cfg(test)]
mod test {
    use super::*;
    use config::Config;

    #[test]
    fn poller_from_settings() {
        let mut c = Config::default();
        c.set("host", "192.168.1.20").unwrap();
        c.set("name", "Roof").unwrap();
        c.set("smartmeter", "true").unwrap();
        c.set("device_model", "gen24").unwrap();
        c.set("monitored_conditions", "ac_power,grid_usage,smartmeter_voltage_ac_phase_one")
            .unwrap();
        let settings = settings::from_config(c).unwrap();

        let poller = poller(&settings).unwrap();

        assert!(poller.fetcher(Source::Inverter).is_some());
        assert!(poller.fetcher(Source::PowerFlow).is_none());
        assert_eq!(
            "http://192.168.1.20/solar_api/v1/GetMeterRealtimeData.cgi?Scope=Device&DeviceId=0",
            poller.fetcher(Source::SmartMeter).unwrap().url()
        );

        let names: Vec<&str> = poller.sensors().map(|s| s.name()).collect();
        assert_eq!(
            vec!["Roof AC Power", "Roof SmartMeter Voltage AC Phase 1"],
            names
        );
        let meter = poller
            .sensors()
            .find(|s| s.source() == Source::SmartMeter)
            .unwrap();
        assert_eq!("SMARTMETER_VOLTAGE_01_F64", meter.descriptor().json_key);
    }
}
