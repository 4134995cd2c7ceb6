use crate::model::{ConversionKind, DeviceModel, FieldDescriptor, Source};
use std::collections::BTreeMap;

const SOLAR_POWER: &str = "mdi:solar-power";
const SOLAR_PANEL: &str = "mdi:solar-panel";
const FLASH: &str = "mdi:flash";

const fn field(
    source: Source,
    json_key: &'static str,
    display_name: &'static str,
    unit: &'static str,
    conversion: ConversionKind,
    icon: &'static str,
) -> FieldDescriptor {
    FieldDescriptor {
        source,
        json_key,
        display_name,
        unit,
        conversion,
        icon,
        system: false,
        cumulative: false,
    }
}

const fn system(descriptor: FieldDescriptor) -> FieldDescriptor {
    FieldDescriptor {
        system: true,
        ..descriptor
    }
}

const fn cumulative(descriptor: FieldDescriptor) -> FieldDescriptor {
    FieldDescriptor {
        cumulative: true,
        ..descriptor
    }
}

use crate::model::ConversionKind::{Energy, None as Fixed, Power};
use crate::model::Source::{Inverter, PowerFlow, SmartMeter};

/* Fields as named by Symo firmware */
#[rustfmt::skip]
const FIELDS: &[(&str, FieldDescriptor)] = &[
    ("ac_power", system(field(Inverter, "PAC", "AC Power", "W", Power, SOLAR_POWER))),
    ("ac_current", field(Inverter, "IAC", "AC Current", "A", Fixed, SOLAR_POWER)),
    ("ac_voltage", field(Inverter, "UAC", "AC Voltage", "V", Fixed, SOLAR_POWER)),
    ("ac_frequency", field(Inverter, "FAC", "AC Frequency", "Hz", Fixed, SOLAR_POWER)),
    ("dc_current", field(Inverter, "IDC", "DC Current", "A", Fixed, SOLAR_POWER)),
    ("dc_voltage", field(Inverter, "UDC", "DC Voltage", "V", Fixed, SOLAR_POWER)),
    ("day_energy", system(field(Inverter, "DAY_ENERGY", "Day Energy", "kWh", Fixed, SOLAR_POWER))),
    ("year_energy", system(cumulative(field(Inverter, "YEAR_ENERGY", "Year Energy", "Wh", Energy, SOLAR_POWER)))),
    ("total_energy", system(cumulative(field(Inverter, "TOTAL_ENERGY", "Total Energy", "Wh", Energy, SOLAR_POWER)))),
    ("grid_usage", field(PowerFlow, "P_Grid", "Grid Usage", "W", Power, SOLAR_POWER)),
    ("house_load", field(PowerFlow, "P_Load", "House Load", "W", Power, SOLAR_POWER)),
    ("panel_status", field(PowerFlow, "P_PV", "Panel Status", "W", Power, SOLAR_PANEL)),
    ("battery_usage", field(PowerFlow, "P_Akku", "Battery Usage", "W", Power, SOLAR_POWER)),
    ("rel_autonomy", field(PowerFlow, "rel_Autonomy", "Autonomy", "%", Fixed, SOLAR_POWER)),
    ("rel_selfconsumption", field(PowerFlow, "rel_SelfConsumption", "Self Consumption", "%", Fixed, SOLAR_POWER)),
    ("smartmeter_current_ac_phase_one", field(SmartMeter, "Current_AC_Phase_1", "SmartMeter Current AC Phase 1", "A", Fixed, FLASH)),
    ("smartmeter_current_ac_phase_two", field(SmartMeter, "Current_AC_Phase_2", "SmartMeter Current AC Phase 2", "A", Fixed, FLASH)),
    ("smartmeter_current_ac_phase_three", field(SmartMeter, "Current_AC_Phase_3", "SmartMeter Current AC Phase 3", "A", Fixed, FLASH)),
    ("smartmeter_voltage_ac_phase_one", field(SmartMeter, "Voltage_AC_Phase_1", "SmartMeter Voltage AC Phase 1", "V", Fixed, FLASH)),
    ("smartmeter_voltage_ac_phase_two", field(SmartMeter, "Voltage_AC_Phase_2", "SmartMeter Voltage AC Phase 2", "V", Fixed, FLASH)),
    ("smartmeter_voltage_ac_phase_three", field(SmartMeter, "Voltage_AC_Phase_3", "SmartMeter Voltage AC Phase 3", "V", Fixed, FLASH)),
    ("smartmeter_power_ac", field(SmartMeter, "PowerReal_P_Sum", "SmartMeter Power AC", "W", Power, FLASH)),
    ("smartmeter_frequency", field(SmartMeter, "Frequency_Phase_Average", "SmartMeter Frequency", "Hz", Fixed, FLASH)),
    ("smartmeter_energy_ac_consumed", cumulative(field(SmartMeter, "EnergyReal_WAC_Sum_Consumed", "SmartMeter Energy AC Consumed", "Wh", Energy, FLASH))),
    ("smartmeter_energy_ac_sold", cumulative(field(SmartMeter, "EnergyReal_WAC_Sum_Produced", "SmartMeter Energy AC Sold", "Wh", Energy, FLASH))),
];

/* GEN24 firmware reports smart meter data under different keys */
const GEN24_KEYS: &[(&str, &str)] = &[
    ("smartmeter_current_ac_phase_one", "SMARTMETER_CURRENT_01_F64"),
    ("smartmeter_current_ac_phase_two", "SMARTMETER_CURRENT_02_F64"),
    ("smartmeter_current_ac_phase_three", "SMARTMETER_CURRENT_03_F64"),
    ("smartmeter_voltage_ac_phase_one", "SMARTMETER_VOLTAGE_01_F64"),
    ("smartmeter_voltage_ac_phase_two", "SMARTMETER_VOLTAGE_02_F64"),
    ("smartmeter_voltage_ac_phase_three", "SMARTMETER_VOLTAGE_03_F64"),
    ("smartmeter_power_ac", "SMARTMETER_POWERACTIVE_MEAN_SUM_F64"),
    ("smartmeter_frequency", "SMARTMETER_FREQUENCY_MEAN_F64"),
    ("smartmeter_energy_ac_consumed", "SMARTMETER_ENERGYACTIVE_CONSUMED_SUM_F64"),
    ("smartmeter_energy_ac_sold", "SMARTMETER_ENERGYACTIVE_PRODUCED_SUM_F64"),
];

/// Descriptor set for one device model, keyed by logical field name.
#[derive(Debug, Clone)]
pub struct FieldTable {
    fields: BTreeMap<&'static str, FieldDescriptor>,
}

impl FieldTable {
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldDescriptor)> + '_ {
        self.fields.iter().map(|(name, descriptor)| (*name, descriptor))
    }
}

/// Builds the descriptor set for `model`. Every call returns an independent table.
pub fn field_table(model: DeviceModel) -> FieldTable {
    let mut fields: BTreeMap<&'static str, FieldDescriptor> = FIELDS.iter().copied().collect();

    if model == DeviceModel::Gen24 {
        for (name, json_key) in GEN24_KEYS {
            if let Some(descriptor) = fields.get_mut(name) {
                descriptor.json_key = *json_key;
            }
        }
    }

    FieldTable { fields }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn symo_smartmeter_keys() {
        let table = field_table(DeviceModel::Symo);
        let voltage = table.get("smartmeter_voltage_ac_phase_one").unwrap();
        assert_eq!("Voltage_AC_Phase_1", voltage.json_key);
        assert_eq!(Source::SmartMeter, voltage.source);
    }

    #[test]
    fn gen24_remaps_smartmeter_keys_only() {
        let symo = field_table(DeviceModel::Symo);
        let gen24 = field_table(DeviceModel::Gen24);

        let voltage = gen24.get("smartmeter_voltage_ac_phase_one").unwrap();
        assert_eq!("SMARTMETER_VOLTAGE_01_F64", voltage.json_key);

        for (name, descriptor) in gen24.iter() {
            let original = symo.get(name).unwrap();
            assert_eq!(original.unit, descriptor.unit);
            assert_eq!(original.conversion, descriptor.conversion);
            assert_eq!(original.display_name, descriptor.display_name);
            if descriptor.source != Source::SmartMeter {
                assert_eq!(original.json_key, descriptor.json_key);
            }
        }
    }

    #[test]
    fn gen24_selection_does_not_leak_into_symo() {
        let _gen24 = field_table(DeviceModel::Gen24);
        let symo = field_table(DeviceModel::Symo);
        assert_eq!(
            "PowerReal_P_Sum",
            symo.get("smartmeter_power_ac").unwrap().json_key
        );
    }

    #[test]
    fn every_remapped_field_exists() {
        let table = field_table(DeviceModel::Symo);
        for (name, _) in GEN24_KEYS {
            assert!(table.get(name).is_some(), "{} missing", name);
        }
    }

    #[test]
    fn system_fields() {
        let table = field_table(DeviceModel::Symo);
        let system: Vec<&str> = table
            .iter()
            .filter(|(_, d)| d.system)
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            vec!["ac_power", "day_energy", "total_energy", "year_energy"],
            system
        );
    }
}
