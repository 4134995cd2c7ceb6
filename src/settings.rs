use crate::api::Error;
use crate::availability::Availability;
use crate::fields::FieldTable;
use crate::model::{DeviceModel, EnergyUnit, NullPolicy, PowerUnit, Scope, Source};
use crate::sensor::SensorOptions;

use chrono::NaiveTime;
use config::Config;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const ENV_PREFIX: &str = "FRONIUS";
const CONFIG_FILE: &str = "fronius";

/// Raw configuration as read from file and environment.
#[derive(Clone, Debug, Deserialize)]
pub struct FroniusConfig {
    host: String,
    device_id: String,
    scope: String,
    name: String,
    energy_unit: String,
    power_unit: String,
    powerflow: bool,
    smartmeter: bool,
    smartmeter_device_id: String,
    device_model: String,
    interval: u64,
    min_interval: u64,
    timeout: u64,
    #[serde(default)]
    max_age: Option<u64>,
    #[serde(default, deserialize_with = "string_or_list")]
    monitored_conditions: Option<Vec<String>>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    stop_time: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    null_as_zero: bool,
    hold_totals: bool,
}

/// Validated configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub host: String,
    pub device_id: String,
    pub name: String,
    pub powerflow: bool,
    pub smartmeter: bool,
    pub smartmeter_device_id: String,
    pub device_model: DeviceModel,
    pub interval: Duration,
    pub min_interval: Duration,
    pub timeout: Duration,
    pub max_age: Option<Duration>,
    /// `None` monitors every field.
    pub monitored_conditions: Option<Vec<String>>,
    pub sensor_options: SensorOptions,
}

/// Accept either a list or a comma-separated string, so the same key works from a TOML file and
/// from an environment variable.
fn string_or_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrList;

    impl<'de> Visitor<'de> for StringOrList {
        type Value = Option<Vec<String>>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a list of field names or a comma-separated string")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(Some(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            ))
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut names = Vec::new();
            while let Some(name) = seq.next_element::<String>()? {
                names.push(name);
            }
            Ok(Some(names))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(StringOrList)
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value
        .parse()
        .map_err(|_| Error::ConfigError(format!("Invalid {}: {}", key, value)))
}

fn parse_time(key: &str, value: &str) -> Result<NaiveTime, Error> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| Error::ConfigError(format!("Invalid {}: {}", key, value)))
}

fn with_defaults(settings: &mut Config) -> Result<(), config::ConfigError> {
    settings
        .set_default("device_id", "1")?
        .set_default("scope", "Device")?
        .set_default("name", "Fronius")?
        .set_default("energy_unit", "kWh")?
        .set_default("power_unit", "W")?
        .set_default("powerflow", false)?
        .set_default("smartmeter", false)?
        .set_default("smartmeter_device_id", "0")?
        .set_default("device_model", "symo")?
        .set_default("interval", 60i64)?
        .set_default("min_interval", 30i64)?
        .set_default("timeout", 10i64)?
        .set_default("null_as_zero", true)?
        .set_default("hold_totals", false)?;
    Ok(())
}

/// Read `fronius.{toml,yaml,json}` (optional) overridden by `FRONIUS_*` environment variables.
pub fn read_settings() -> Result<Settings, Error> {
    let mut settings = Config::default();
    settings
        .merge(config::File::with_name(CONFIG_FILE).required(false))
        .and_then(|s| s.merge(config::Environment::with_prefix(ENV_PREFIX)))
        .map_err(|e| Error::ConfigError(e.to_string()))?;

    from_config(settings)
}

/// Apply defaults to `settings` and validate the result.
pub fn from_config(mut settings: Config) -> Result<Settings, Error> {
    with_defaults(&mut settings).map_err(|e| Error::ConfigError(e.to_string()))?;

    settings
        .try_into::<FroniusConfig>()
        .map_err(|e| Error::ConfigError(e.to_string()))
        .and_then(FroniusConfig::validate)
}

impl FroniusConfig {
    fn availability(&self) -> Result<Availability, Error> {
        match (&self.start_time, &self.stop_time, self.latitude, self.longitude) {
            (Some(start), Some(stop), _, _) => Ok(Availability::Window {
                start: parse_time("start_time", start)?,
                stop: parse_time("stop_time", stop)?,
            }),
            (Some(_), None, _, _) | (None, Some(_), _, _) => Err(Error::ConfigError(
                String::from("start_time and stop_time must be set together"),
            )),
            (None, None, Some(latitude), Some(longitude)) => Ok(Availability::Daylight {
                latitude,
                longitude,
            }),
            (None, None, Some(_), None) | (None, None, None, Some(_)) => Err(Error::ConfigError(
                String::from("latitude and longitude must be set together"),
            )),
            (None, None, None, None) => Ok(Availability::Always),
        }
    }

    fn validate(self) -> Result<Settings, Error> {
        if self.host.trim().is_empty() {
            return Err(Error::ConfigError(String::from("host must not be empty")));
        }
        if self.interval == 0 {
            return Err(Error::ConfigError(String::from("interval must be positive")));
        }

        let sensor_options = SensorOptions {
            scope: parse::<Scope>("scope", &self.scope)?,
            energy_unit: parse::<EnergyUnit>("energy_unit", &self.energy_unit)?,
            power_unit: parse::<PowerUnit>("power_unit", &self.power_unit)?,
            null_policy: if self.null_as_zero {
                NullPolicy::Zero
            } else {
                NullPolicy::Unavailable
            },
            hold_totals: self.hold_totals,
            availability: self.availability()?,
        };

        Ok(Settings {
            device_model: parse::<DeviceModel>("device_model", &self.device_model)?,
            host: self.host,
            device_id: self.device_id,
            name: self.name,
            powerflow: self.powerflow,
            smartmeter: self.smartmeter,
            smartmeter_device_id: self.smartmeter_device_id,
            interval: Duration::from_secs(self.interval),
            min_interval: Duration::from_secs(self.min_interval),
            timeout: Duration::from_secs(self.timeout),
            max_age: self.max_age.map(Duration::from_secs),
            monitored_conditions: self.monitored_conditions,
            sensor_options,
        })
    }
}

impl Settings {
    fn source_enabled(&self, source: Source) -> bool {
        match source {
            Source::Inverter => true,
            Source::PowerFlow => self.powerflow,
            Source::SmartMeter => self.smartmeter,
        }
    }

    /// Field names to create sensors for: monitored, from an enabled source, and reported in the
    /// configured scope. Unknown names are an error.
    pub fn selected_fields(&self, table: &FieldTable) -> Result<Vec<&'static str>, Error> {
        let requested: Vec<&'static str> = match &self.monitored_conditions {
            Some(names) => names
                .iter()
                .map(|name| {
                    table
                        .names()
                        .find(|known| *known == name.as_str())
                        .ok_or_else(|| Error::ConfigError(format!("Unknown field: {}", name)))
                })
                .collect::<Result<_, _>>()?,
            None => table.names().collect(),
        };

        Ok(requested
            .into_iter()
            .filter(|name| match table.get(name) {
                Some(descriptor) => {
                    self.source_enabled(descriptor.source)
                        && (descriptor.source != Source::Inverter
                            || self.sensor_options.scope == Scope::Device
                            || descriptor.system)
                }
                None => false,
            })
            .collect())
    }
}
