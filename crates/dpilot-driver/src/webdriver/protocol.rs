//! W3C WebDriver wire format
//!
//! Every response body is `{"value": ...}`. Errors carry
//! `{"value": {"error": "<code>", "message": "..."}}` with a 4xx/5xx status.

use dpilot_core::prelude::*;
use serde::Deserialize;
use serde_json::Value;

use super::driver::ElementId;

/// Key of a web element reference in W3C responses
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f50ae58f3a4";

/// Pre-W3C element key, still sent by some servers
pub const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// Error code for a lookup that matched nothing
pub const NO_SUCH_ELEMENT: &str = "no such element";

/// Error code for an element that left the view hierarchy after lookup
pub const STALE_ELEMENT_REFERENCE: &str = "stale element reference";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

/// Unwrap a response body into its `value`, mapping error payloads
pub fn parse_response(status: u16, body: &str) -> Result<Value> {
    let envelope: Envelope = serde_json::from_str(body).map_err(|e| {
        Error::session(format!(
            "Malformed response (HTTP {}): {}: {}",
            status,
            e,
            truncate(body, 200)
        ))
    })?;

    if let Ok(wire) = serde_json::from_value::<WireError>(envelope.value.clone()) {
        return Err(Error::webdriver(wire.error, wire.message));
    }

    if !(200..300).contains(&status) {
        return Err(Error::session(format!(
            "HTTP {}: {}",
            status,
            truncate(body, 200)
        )));
    }

    Ok(envelope.value)
}

/// Session id from a new-session response value
pub fn parse_session_id(value: &Value) -> Result<String> {
    value
        .get("sessionId")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::session("New session response has no sessionId"))
}

/// One element reference
pub fn parse_element(value: &Value) -> Result<ElementId> {
    value
        .get(ELEMENT_KEY)
        .or_else(|| value.get(LEGACY_ELEMENT_KEY))
        .and_then(Value::as_str)
        .map(ElementId::new)
        .ok_or_else(|| Error::session(format!("Not an element reference: {}", value)))
}

/// Result of a find-elements request
pub fn parse_elements(value: &Value) -> Result<Vec<ElementId>> {
    value
        .as_array()
        .ok_or_else(|| Error::session(format!("Expected an element list, got {}", value)))?
        .iter()
        .map(parse_element)
        .collect()
}

pub fn parse_bool(value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| Error::session(format!("Expected a boolean, got {}", value)))
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
