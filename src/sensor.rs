use crate::availability::Availability;
use crate::model::{
    ConversionKind, EnergyUnit, FieldDescriptor, NullPolicy, Payload, PowerUnit, Scope,
    SensorValue, Source,
};
use chrono::{DateTime, TimeZone};
use serde_json::Value;

const DAY_ENERGY: &str = "DAY_ENERGY";
const PRECISION: f64 = 100.0;

/// What the host platform needs from a measurement.
pub trait Measurement {
    fn compute_value(&self, payload: &Payload) -> Option<f64>;
    fn unit(&self) -> &str;
    fn icon(&self) -> &str;
    fn unique_id(&self) -> &str;
}

/// Per-installation settings shared by all sensors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorOptions {
    pub scope: Scope,
    pub energy_unit: EnergyUnit,
    pub power_unit: PowerUnit,
    pub null_policy: NullPolicy,
    /// Report cumulative counters reading 0 as unavailable instead of 0.
    pub hold_totals: bool,
    pub availability: Availability,
}

impl Default for SensorOptions {
    fn default() -> Self {
        SensorOptions {
            scope: Scope::Device,
            energy_unit: EnergyUnit::KWh,
            power_unit: PowerUnit::W,
            null_policy: NullPolicy::Zero,
            hold_totals: false,
            availability: Availability::Always,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sensor {
    key: &'static str,
    descriptor: FieldDescriptor,
    name: String,
    unique_id: String,
    unit: String,
    options: SensorOptions,
}

/// Round to two decimals, ties to even.
pub fn round(value: f64) -> f64 {
    (value * PRECISION).round_ties_even() / PRECISION
}

/// Scale a raw reading from Wh/W to the configured unit.
pub fn convert(
    descriptor: &FieldDescriptor,
    raw: f64,
    energy_unit: EnergyUnit,
    power_unit: PowerUnit,
) -> f64 {
    match descriptor.conversion {
        ConversionKind::Energy => match energy_unit {
            EnergyUnit::MWh => raw / 1e6,
            EnergyUnit::KWh => raw / 1e3,
            EnergyUnit::Wh => raw,
        },
        ConversionKind::Power => match power_unit {
            PowerUnit::MW => raw / 1e6,
            PowerUnit::KW => raw / 1e3,
            PowerUnit::W => raw,
        },
        /* DAY_ENERGY is reported in Wh and always shown in kWh */
        ConversionKind::None if descriptor.json_key == DAY_ENERGY => raw / 1e3,
        ConversionKind::None => raw,
    }
}

fn display_unit(descriptor: &FieldDescriptor, options: &SensorOptions) -> &'static str {
    match descriptor.conversion {
        ConversionKind::Energy => options.energy_unit.as_str(),
        ConversionKind::Power => options.power_unit.as_str(),
        ConversionKind::None => descriptor.unit,
    }
}

fn slug(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_end_matches('_').to_string()
}

impl Sensor {
    pub fn new(
        client_name: &str,
        key: &'static str,
        descriptor: FieldDescriptor,
        options: SensorOptions,
    ) -> Self {
        let name = format!("{} {}", client_name, descriptor.display_name);
        Sensor {
            key,
            unique_id: slug(&name),
            unit: display_unit(&descriptor, &options).to_string(),
            name,
            descriptor,
            options,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> Source {
        self.descriptor.source
    }

    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    pub fn is_available<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.options.availability.is_available(now)
    }

    fn coalesce(&self, value: Option<f64>) -> Option<f64> {
        match (value, self.options.null_policy) {
            (Some(v), _) => Some(v),
            (None, NullPolicy::Zero) => Some(0.0),
            (None, NullPolicy::Unavailable) => None,
        }
    }

    fn read(&self, entry: &Value) -> Option<f64> {
        match (self.descriptor.source, self.options.scope) {
            (Source::Inverter, Scope::Device) => {
                self.coalesce(entry.get("Value").and_then(Value::as_f64))
            }
            (Source::Inverter, Scope::System) => {
                match entry.get("Values").and_then(Value::as_object) {
                    Some(values) => values
                        .values()
                        .map(|v| self.coalesce(v.as_f64()))
                        .sum::<Option<f64>>(),
                    None => self.coalesce(None),
                }
            }
            _ => self.coalesce(entry.as_f64()),
        }
    }

    /// Current value of this sensor, evaluated against `payload` at `now`.
    pub fn value<Tz: TimeZone>(
        &self,
        payload: Option<&Payload>,
        now: &DateTime<Tz>,
    ) -> SensorValue {
        let value = if self.is_available(now) {
            payload.and_then(|p| self.compute_value(p))
        } else {
            None
        };

        SensorValue {
            unique_id: self.unique_id.clone(),
            key: self.key.to_string(),
            name: self.name.clone(),
            value,
            unit: self.unit.clone(),
            icon: self.descriptor.icon.to_string(),
            available: value.is_some(),
        }
    }
}

impl Measurement for Sensor {
    fn compute_value(&self, payload: &Payload) -> Option<f64> {
        let raw = self.read(payload.get(self.descriptor.json_key)?)?;
        /* A sleeping inverter reports its counters as 0 */
        if self.options.hold_totals && self.descriptor.cumulative && raw == 0.0 {
            return None;
        }

        Some(round(convert(
            &self.descriptor,
            raw,
            self.options.energy_unit,
            self.options.power_unit,
        )))
    }

    fn unit(&self) -> &str {
        &self.unit
    }

    fn icon(&self) -> &str {
        self.descriptor.icon
    }

    fn unique_id(&self) -> &str {
        &self.unique_id
    }
}
