//! Script engine setup and the response API exposed to routines.
//!
//! Routines build a prepared response with:
//!
//! ```text
//! response(201, #{ id: 7 })                 // JSON body
//! text_response(200, "pong")
//! json_response(200, [1, 2, 3])
//! redirect("/login")
//! response(200, "<p>hi</p>").with_content_type("text/html").with_header("x-a", "1")
//! ```

use axum::http::{header, StatusCode};
use rhai::{Blob, Dynamic, Engine, EvalAltResult, ImmutableString};

use crate::response::envelope::{ResponseEnvelope, JSON_CONTENT_TYPE};

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

/// Engine used to load and run handler units.
pub fn handler_engine() -> Engine {
    let mut engine = Engine::new();

    engine.on_print(|text| tracing::info!(target: "treeserve::script", "{text}"));
    engine.on_debug(|text, source, position| {
        tracing::debug!(
            target: "treeserve::script",
            source = source.unwrap_or("-"),
            position = %position,
            "{text}"
        )
    });

    register_response_api(&mut engine);
    engine
}

fn register_response_api(engine: &mut Engine) {
    engine
        .register_type_with_name::<ResponseEnvelope>("Response")
        .register_fn("response", response)
        .register_fn("json_response", json_response)
        .register_fn("text_response", text_response)
        .register_fn("redirect", redirect)
        .register_fn("with_header", with_header)
        .register_fn("with_content_type", with_content_type)
        .register_fn("with_status", with_status)
        .register_get("status", |r: &mut ResponseEnvelope| i64::from(r.status.as_u16()));
}

fn status_code(code: i64) -> ScriptResult<StatusCode> {
    u16::try_from(code)
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| format!("invalid HTTP status code {code}").into())
}

/// Body type decides the content type: string, blob, unit, or JSON.
fn response(status: i64, body: Dynamic) -> ScriptResult<ResponseEnvelope> {
    let status = status_code(status)?;
    if body.is_unit() {
        return Ok(ResponseEnvelope::new(status));
    }
    if let Some(bytes) = body.read_lock::<Blob>().map(|b| b.to_vec()) {
        return Ok(ResponseEnvelope::bytes(status, bytes));
    }
    if let Some(text) = body.read_lock::<ImmutableString>().map(|s| s.as_str().to_string()) {
        return Ok(ResponseEnvelope::text(status, text));
    }
    json_response_for(status, &body)
}

fn json_response(status: i64, body: Dynamic) -> ScriptResult<ResponseEnvelope> {
    json_response_for(status_code(status)?, &body)
}

fn json_response_for(status: StatusCode, body: &Dynamic) -> ScriptResult<ResponseEnvelope> {
    let value: serde_json::Value = rhai::serde::from_dynamic(body)?;
    let bytes = serde_json::to_vec(&value).map_err(|e| e.to_string())?;
    Ok(ResponseEnvelope::new(status).with_body(bytes, JSON_CONTENT_TYPE))
}

fn text_response(status: i64, text: &str) -> ScriptResult<ResponseEnvelope> {
    Ok(ResponseEnvelope::text(status_code(status)?, text))
}

fn redirect(location: &str) -> ResponseEnvelope {
    ResponseEnvelope::new(StatusCode::FOUND).with_header(header::LOCATION.as_str(), location)
}

fn with_header(response: &mut ResponseEnvelope, name: &str, value: &str) -> ResponseEnvelope {
    response.headers.push((name.to_string(), value.to_string()));
    response.clone()
}

fn with_content_type(response: &mut ResponseEnvelope, content_type: &str) -> ResponseEnvelope {
    response.content_type = Some(content_type.to_string());
    response.clone()
}

fn with_status(response: &mut ResponseEnvelope, status: i64) -> ScriptResult<ResponseEnvelope> {
    response.status = status_code(status)?;
    Ok(response.clone())
}
