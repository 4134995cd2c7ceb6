use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Nested JSON object extracted from a Fronius response, e.g. `Body.Data`.
pub type Payload = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    Inverter,
    PowerFlow,
    SmartMeter,
}

impl Source {
    /// Path of the payload object inside the response body.
    pub fn payload_path(&self) -> &'static [&'static str] {
        match self {
            Source::Inverter | Source::SmartMeter => &["Body", "Data"],
            Source::PowerFlow => &["Body", "Data", "Site"],
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::Inverter => "inverter",
            Source::PowerFlow => "powerflow",
            Source::SmartMeter => "smartmeter",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    None,
    Power,
    Energy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub source: Source,
    pub json_key: &'static str,
    pub display_name: &'static str,
    pub unit: &'static str,
    pub conversion: ConversionKind,
    pub icon: &'static str,
    /// Reported by the inverter in `System` scope.
    pub system: bool,
    /// Annual or lifetime counter.
    pub cumulative: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Device,
    System,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Device => "Device",
            Scope::System => "System",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyUnit {
    Wh,
    KWh,
    MWh,
}

impl EnergyUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyUnit::Wh => "Wh",
            EnergyUnit::KWh => "kWh",
            EnergyUnit::MWh => "MWh",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUnit {
    W,
    KW,
    MW,
}

impl PowerUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerUnit::W => "W",
            PowerUnit::KW => "kW",
            PowerUnit::MW => "MW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceModel {
    Symo,
    Gen24,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPolicy {
    /// JSON `null` reads as 0.
    Zero,
    /// JSON `null` makes the sensor unavailable.
    Unavailable,
}

/// Error returned when a configuration string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl FromStr for Scope {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "device" => Ok(Scope::Device),
            "system" => Ok(Scope::System),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

impl FromStr for EnergyUnit {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wh" => Ok(EnergyUnit::Wh),
            "kwh" => Ok(EnergyUnit::KWh),
            "mwh" => Ok(EnergyUnit::MWh),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

impl FromStr for PowerUnit {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "w" => Ok(PowerUnit::W),
            "kw" => Ok(PowerUnit::KW),
            "mw" => Ok(PowerUnit::MW),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

impl FromStr for DeviceModel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "symo" => Ok(DeviceModel::Symo),
            "gen24" => Ok(DeviceModel::Gen24),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// Value of a single sensor as handed to the host platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorValue {
    pub unique_id: String,
    pub key: String,
    pub name: String,
    pub value: Option<f64>,
    pub unit: String,
    pub icon: String,
    pub available: bool,
}

impl SensorValue {
    /// Display state: the value with at least one decimal, or `unavailable`.
    pub fn state(&self) -> String {
        match self.value {
            Some(v) if self.available => format!("{:?}", v),
            _ => String::from("unavailable"),
        }
    }
}
