pub mod endpoint;
pub mod error;
pub mod response;

use crate::model::{Payload, Source};
pub use error::Error;
use response::{Head, StatusCode};
use serde_json::Value;

use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub fn client(timeout: Duration) -> Result<reqwest::Client, Error> {
    reqwest::ClientBuilder::new()
        .timeout(timeout)
        .build()
        .or(Err(Error::InternalError))
}

/// Map transport-level failures (connect, timeout, body read) to Error
fn map_api_err(error: reqwest::Error) -> Error {
    match error.status() {
        Some(status) => Error::HttpStatusError(status.as_u16(), error.to_string()),
        None => Error::NetworkError(error.to_string()),
    }
}

/// Inspect `Head.Status.Code` of a decoded response. Any code but 0 means the inverter could not
/// serve the request, even though the HTTP status was 200. Responses without `Head` are accepted.
fn map_response_status(value: Value) -> Result<Value, Error> {
    let head = match value.get("Head") {
        Some(head) => serde_json::from_value::<Head>(head.clone())
            .map_err(|e| Error::ParseError(format!("Malformed Head: {}", e)))?,
        None => return Ok(value),
    };

    let status = head.status;
    match num::FromPrimitive::from_u64(status.code) {
        Some(StatusCode::Okay) => Ok(value),
        code => Err(Error::ApiError(
            status.code,
            format!(
                "{:?}: {}",
                code.unwrap_or(StatusCode::UnknownError),
                status
                    .user_message
                    .filter(|m| !m.is_empty())
                    .or(status.reason)
                    .unwrap_or_else(|| "(no error message received)".to_string())
            ),
        )),
    }
}

/// Walk `path` down from the response root and return the object found there.
pub fn extract_payload(value: Value, path: &[&str]) -> Result<Payload, Error> {
    let mut current = value;
    for key in path {
        current = match current {
            Value::Object(mut map) => map
                .remove(*key)
                .ok_or_else(|| Error::ParseError(format!("Missing key: {}", key)))?,
            _ => return Err(Error::ParseError(format!("Expected object above {}", key))),
        };
    }

    match current {
        Value::Object(map) => Ok(map),
        other => Err(Error::ParseError(format!(
            "Expected object at {}, found {}",
            path.join("."),
            other
        ))),
    }
}

async fn get(client: &reqwest::Client, url: &str) -> Result<Value, Error> {
    let response = client.get(url).send().await.map_err(map_api_err)?;

    let status = response.status();
    if status != http::StatusCode::OK {
        return Err(Error::HttpStatusError(
            status.as_u16(),
            format!("{} responded {}", url, status),
        ));
    }

    let text = response.text().await.map_err(map_api_err)?;
    log::trace!("url: {}, response_text: {}", url, text);

    serde_json::from_str::<Value>(&text)
        .map_err(|e| Error::ParseError(format!("{}: {}", e, text)))
        .and_then(map_response_status)
}

/// GET `url` and return the payload object of `source`.
pub async fn fetch(client: &reqwest::Client, url: &str, source: Source) -> Result<Payload, Error> {
    get(client, url)
        .await
        .and_then(|value| extract_payload(value, source.payload_path()))
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_power_flow_site() {
        let value = json!({"Body": {"Data": {"Site": {"P_Grid": -120.5, "P_PV": null}}}});
        let payload = extract_payload(value, Source::PowerFlow.payload_path()).unwrap();
        assert_eq!(Some(&json!(-120.5)), payload.get("P_Grid"));
        assert_eq!(Some(&Value::Null), payload.get("P_PV"));
    }

    #[test]
    fn extract_missing_key() {
        let value = json!({"Body": {"Data": {"PAC": {"Value": 1}}}});
        match extract_payload(value, Source::PowerFlow.payload_path()) {
            Err(Error::ParseError(message)) => assert!(message.contains("Site")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn extract_non_object() {
        let value = json!({"Body": {"Data": []}});
        assert!(matches!(
            extract_payload(value, Source::Inverter.payload_path()),
            Err(Error::ParseError(_))
        ));
    }

    #[test]
    fn status_ok_and_missing_head() {
        let ok = json!({"Head": {"Status": {"Code": 0, "Reason": "", "UserMessage": ""}}});
        assert!(map_response_status(ok).is_ok());
        assert!(map_response_status(json!({"Body": {}})).is_ok());
    }

    #[test]
    fn status_error() {
        let value = json!({"Head": {"Status": {"Code": 12, "Reason": "Device not available", "UserMessage": ""}}});
        match map_response_status(value) {
            Err(Error::ApiError(code, message)) => {
                assert_eq!(12, code);
                assert_eq!("DeviceNotAvailable: Device not available", message);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn status_unknown_code() {
        let value = json!({"Head": {"Status": {"Code": 77}}});
        assert!(matches!(
            map_response_status(value),
            Err(Error::ApiError(77, _))
        ));
    }
}
