//! The final, transport-ready response.
//!
//! # Responsibilities
//! - Hold status, content type, extra headers and body bytes
//! - Build success (`{ok: true, data}`) and error (`{ok: false, error}`) envelopes
//! - Convert into an axum response
//!
//! # Design Decisions
//! - Handler-supplied headers are kept as strings and validated only when the
//!   response is built; invalid ones are dropped with a warning

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use uuid::Uuid;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Status, content type, extra headers and body of one response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    request_id: Option<String>,
}

impl ResponseEnvelope {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            content_type: None,
            headers: Vec::new(),
            body: Vec::new(),
            request_id: None,
        }
    }

    /// Serialize `value` as the JSON body.
    pub fn json(status: StatusCode, value: &Value) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_else(|_| b"null".to_vec());
        Self::new(status).with_body(body, JSON_CONTENT_TYPE)
    }

    pub fn text(status: StatusCode, text: impl Into<String>) -> Self {
        Self::new(status).with_body(text.into().into_bytes(), TEXT_CONTENT_TYPE)
    }

    pub fn html(status: StatusCode, html: impl Into<String>) -> Self {
        Self::new(status).with_body(html.into().into_bytes(), HTML_CONTENT_TYPE)
    }

    pub fn bytes(status: StatusCode, bytes: Vec<u8>) -> Self {
        Self::new(status).with_body(bytes, OCTET_STREAM)
    }

    /// `{ok: true, data: value}` with status 200.
    pub fn success(data: Value) -> Self {
        Self::json(StatusCode::OK, &json!({ "ok": true, "data": data }))
    }

    /// `{ok: false, error: {code, message, detail, request_id}}` with a fresh
    /// correlation id.
    pub fn error(status: StatusCode, message: &str, detail: Option<String>) -> Self {
        let request_id = Uuid::new_v4().to_string();
        let payload = json!({
            "ok": false,
            "error": {
                "code": status.as_u16(),
                "message": message,
                "detail": detail,
                "request_id": request_id,
            }
        });
        let mut envelope = Self::json(status, &payload);
        envelope.request_id = Some(request_id);
        envelope
    }

    pub fn with_body(mut self, body: Vec<u8>, content_type: &str) -> Self {
        self.body = body;
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Correlation id of a framework-synthesized error.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        if let Some(content_type) = self.content_type {
            match HeaderValue::from_str(&content_type) {
                Ok(value) => {
                    headers.insert(header::CONTENT_TYPE, value);
                }
                Err(_) => {
                    tracing::warn!(content_type = %content_type, "Dropping invalid content type");
                }
            }
        }

        for (name, value) in self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::warn!(header = %name, "Dropping invalid response header"),
            }
        }

        response
    }
}
