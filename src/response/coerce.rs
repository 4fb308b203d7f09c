//! Return-value coercion.
//!
//! Rules, first match wins:
//! 1. prepared response: sent as-is
//! 2. mapping with `ok`, or with an object under `error`: JSON verbatim
//! 3. other mapping or sequence: `{ok: true, data}`
//! 4. bytes: `application/octet-stream`
//! 5. string: JSON if it parses (verbatim when it is an `ok`/`error` mapping,
//!    wrapped otherwise), plain text if it does not
//! 6. nothing: `{ok: true, data: null}`
//! 7. anything else: its string form, wrapped

use axum::http::StatusCode;
use serde_json::Value;

use crate::response::envelope::ResponseEnvelope;

/// What a routine handed back, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutput {
    /// A response built with the script response API.
    Prepared(ResponseEnvelope),
    /// A map or array.
    Json(Value),
    Bytes(Vec<u8>),
    Text(String),
    Empty,
    /// Scalars and opaque values, already rendered to a string.
    Other(String),
}

/// Turn a routine's output into the response that goes on the wire.
pub fn normalize(output: HandlerOutput) -> ResponseEnvelope {
    match output {
        HandlerOutput::Prepared(envelope) => envelope,
        HandlerOutput::Json(value) if carries_envelope(&value) => {
            ResponseEnvelope::json(StatusCode::OK, &value)
        }
        HandlerOutput::Json(value) => ResponseEnvelope::success(value),
        HandlerOutput::Bytes(bytes) => ResponseEnvelope::bytes(StatusCode::OK, bytes),
        HandlerOutput::Text(text) => match serde_json::from_str::<Value>(&text) {
            Ok(parsed) if mentions_envelope_keys(&parsed) => {
                ResponseEnvelope::json(StatusCode::OK, &parsed)
            }
            Ok(parsed) => ResponseEnvelope::success(parsed),
            Err(_) => ResponseEnvelope::text(StatusCode::OK, text),
        },
        HandlerOutput::Empty => ResponseEnvelope::success(Value::Null),
        HandlerOutput::Other(rendered) => ResponseEnvelope::success(Value::String(rendered)),
    }
}

/// A returned mapping owns its envelope when it has `ok` or an `error` object.
fn carries_envelope(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            map.contains_key("ok") || map.get("error").is_some_and(Value::is_object)
        }
        _ => false,
    }
}

/// A JSON string owns its envelope when it decodes to a mapping with `ok` or `error`.
fn mentions_envelope_keys(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.contains_key("ok") || map.contains_key("error"),
        _ => false,
    }
}
