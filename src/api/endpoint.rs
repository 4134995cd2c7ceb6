use crate::model::Scope;

pub type Endpoint = str;

pub const INVERTER_REALTIME_DATA: &Endpoint = "/solar_api/v1/GetInverterRealtimeData.cgi";
pub const POWER_FLOW_REALTIME_DATA: &Endpoint = "/solar_api/v1/GetPowerFlowRealtimeData.fcgi";
pub const METER_REALTIME_DATA: &Endpoint = "/solar_api/v1/GetMeterRealtimeData.cgi";

pub fn inverter_url(host: &str, scope: Scope, device_id: &str) -> String {
    format!(
        "http://{}{}?Scope={}&DeviceId={}&DataCollection=CommonInverterData",
        host,
        INVERTER_REALTIME_DATA,
        scope.as_str(),
        device_id
    )
}

pub fn power_flow_url(host: &str) -> String {
    format!("http://{}{}", host, POWER_FLOW_REALTIME_DATA)
}

pub fn meter_url(host: &str, device_id: &str) -> String {
    format!(
        "http://{}{}?Scope=Device&DeviceId={}",
        host, METER_REALTIME_DATA, device_id
    )
}
