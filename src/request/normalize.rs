//! Content-type dispatch into a [`UnifiedRequest`].

use std::borrow::Cow;
use std::collections::BTreeMap;

use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::request::charset::decode_dropping_invalid;
use crate::request::form::parse_pairs;
use crate::request::multipart::parse_multipart;
use crate::request::types::UnifiedRequest;

/// Media type of a Content-Type value: the part before `;`, trimmed and lower-cased.
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Build the unified request from the request head and the complete body.
pub fn normalize(parts: &Parts, body: Vec<u8>) -> UnifiedRequest {
    let content_type_header = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let content_type = media_type(content_type_header);

    let raw_path = parts.uri.path().to_string();
    let path = urlencoding::decode(&raw_path)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw_path.clone());

    let mut request = UnifiedRequest {
        method: parts.method.as_str().to_string(),
        query: parts.uri.query().map(parse_pairs).unwrap_or_default(),
        headers: collect_headers(&parts.headers),
        raw_path,
        path,
        content_type,
        ..UnifiedRequest::default()
    };

    match request.content_type.as_str() {
        "application/json" => match std::str::from_utf8(&body) {
            Ok(text) => {
                request.json = if text.is_empty() {
                    None
                } else {
                    serde_json::from_str(text).ok()
                };
                request.text = Some(text.to_string());
            }
            Err(_) => {
                request.text = Some(decode_dropping_invalid(&body));
            }
        },
        "application/x-www-form-urlencoded" => {
            let text = decode_dropping_invalid(&body);
            request.form = parse_pairs(&text);
            request.text = Some(text);
        }
        "multipart/form-data" => match parse_multipart(content_type_header, &body) {
            Ok(form) => {
                request.form = form.fields;
                request.files = form.files;
            }
            Err(err) => {
                tracing::debug!(error = %err, "Malformed multipart body, continuing without fields");
            }
        },
        _ => {
            request.text = std::str::from_utf8(&body).ok().map(str::to_string);
        }
    }

    request.body = body;
    request
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut collected: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    collected
}
