use num_derive::FromPrimitive;
use serde::Deserialize;

/// `Head.Status.Code` values documented for Solar API v1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum StatusCode {
    Okay = 0,
    NotImplemented = 1,
    Uninitialized = 2,
    Initialized = 3,
    Running = 4,
    Timeout = 5,
    ArgumentError = 6,
    LnRequestError = 7,
    LnRequestTimeout = 8,
    LnParseError = 9,
    ConfigIoError = 10,
    NotSupported = 11,
    DeviceNotAvailable = 12,
    UnknownError = 255,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Status {
    pub code: u64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub user_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Head {
    pub status: Status,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::Value;
    use std::fs;
    use std::path::PathBuf;

    fn read_resource(filename: &str) -> String {
        let mut d = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        d.push(format!("resources/test/{}", filename));
        fs::read_to_string(d.as_path()).unwrap()
    }

    fn head(filename: &str) -> Head {
        let value: Value = serde_json::from_str(&read_resource(filename)).unwrap();
        serde_json::from_value(value["Head"].clone()).unwrap()
    }

    #[test]
    fn inverter_head() {
        let head = head("GetInverterRealtimeData_Device.json");
        assert_eq!(0, head.status.code);
        assert_eq!(Some("2019-06-12T15:31:06+02:00"), head.timestamp.as_deref());
    }

    #[test]
    fn error_head() {
        let head = head("GetInverterRealtimeData_Unavailable.json");
        let code: Option<StatusCode> = num::FromPrimitive::from_u64(head.status.code);
        assert_eq!(Some(StatusCode::DeviceNotAvailable), code);
        assert_eq!(
            Some("Device with ID 7 is not available"),
            head.status.user_message.as_deref()
        );
    }

    #[test]
    fn unknown_code() {
        let code: Option<StatusCode> = num::FromPrimitive::from_u64(42);
        assert_eq!(None, code);
    }
}
