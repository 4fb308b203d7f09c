//! Conversions between requests, script values and handler output.

use rhai::{Array, Blob, Dynamic, Map};

use crate::request::{FieldValue, Params, UnifiedRequest};
use crate::response::{HandlerOutput, ResponseEnvelope};

/// The request as the object map routines receive.
pub fn request_to_dynamic(request: &UnifiedRequest) -> Dynamic {
    let mut map = Map::new();
    map.insert("method".into(), request.method.clone().into());
    map.insert("path".into(), request.path.clone().into());
    map.insert("raw_path".into(), request.raw_path.clone().into());
    map.insert("query".into(), params_to_dynamic(&request.query));
    map.insert("content_type".into(), request.content_type.clone().into());
    map.insert("body".into(), Dynamic::from_blob(request.body.clone()));
    map.insert("form".into(), params_to_dynamic(&request.form));

    let headers: Map = request
        .headers
        .iter()
        .map(|(name, value)| (name.as_str().into(), value.clone().into()))
        .collect();
    map.insert("headers".into(), Dynamic::from_map(headers));

    let text = request
        .text
        .clone()
        .map(Dynamic::from)
        .unwrap_or(Dynamic::UNIT);
    map.insert("text".into(), text);

    let json = request
        .json
        .as_ref()
        .and_then(|value| rhai::serde::to_dynamic(value).ok())
        .unwrap_or(Dynamic::UNIT);
    map.insert("json".into(), json);

    let files: Map = request
        .files
        .iter()
        .map(|(field, file)| {
            let mut entry = Map::new();
            entry.insert("filename".into(), file.filename.clone().into());
            entry.insert("content_type".into(), file.content_type.clone().into());
            entry.insert("bytes".into(), Dynamic::from_blob(file.bytes.clone()));
            (field.as_str().into(), Dynamic::from_map(entry))
        })
        .collect();
    map.insert("files".into(), Dynamic::from_map(files));

    Dynamic::from_map(map)
}

fn params_to_dynamic(params: &Params) -> Dynamic {
    let map: Map = params
        .iter()
        .map(|(key, value)| {
            let value = match value {
                FieldValue::Single(value) => Dynamic::from(value.clone()),
                FieldValue::Multiple(values) => Dynamic::from_array(
                    values.iter().cloned().map(Dynamic::from).collect::<Array>(),
                ),
            };
            (key.into(), value)
        })
        .collect();
    Dynamic::from_map(map)
}

/// Sort a routine's return value into one of the coercion variants.
pub fn classify(value: Dynamic) -> HandlerOutput {
    if let Some(prepared) = value.read_lock::<ResponseEnvelope>() {
        return HandlerOutput::Prepared(ResponseEnvelope::clone(&prepared));
    }
    if value.is_unit() {
        return HandlerOutput::Empty;
    }
    if value.is_map() || value.is_array() {
        return match rhai::serde::from_dynamic::<serde_json::Value>(&value) {
            Ok(json) => HandlerOutput::Json(json),
            Err(_) => HandlerOutput::Other(value.to_string()),
        };
    }
    if let Some(bytes) = value.read_lock::<Blob>() {
        return HandlerOutput::Bytes(bytes.to_vec());
    }
    if value.is_string() {
        return HandlerOutput::Text(value.to_string());
    }
    HandlerOutput::Other(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::engine::handler_engine;
    use crate::request::UploadedFile;
    use serde_json::json;

    fn eval(script: &str) -> Dynamic {
        handler_engine().eval::<Dynamic>(script).unwrap()
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(eval("#{ x: 1 }")),
            HandlerOutput::Json(json!({ "x": 1 }))
        );
        assert_eq!(classify(eval("[1, \"a\"]")), HandlerOutput::Json(json!([1, "a"])));
        assert_eq!(classify(eval("\"hi\"")), HandlerOutput::Text("hi".into()));
        assert_eq!(classify(eval("()")), HandlerOutput::Empty);
        assert_eq!(classify(eval("42")), HandlerOutput::Other("42".into()));
        assert_eq!(classify(eval("true")), HandlerOutput::Other("true".into()));
        assert_eq!(
            classify(eval("blob(3, 0x7a)")),
            HandlerOutput::Bytes(b"zzz".to_vec())
        );
        assert!(matches!(
            classify(eval("text_response(200, \"x\")")),
            HandlerOutput::Prepared(_)
        ));
    }

    #[test]
    fn test_request_map_fields() {
        let mut request = UnifiedRequest {
            method: "POST".into(),
            path: "/a b".into(),
            raw_path: "/a%20b".into(),
            content_type: "application/json".into(),
            body: br#"{"n":[1,2]}"#.to_vec(),
            text: Some(r#"{"n":[1,2]}"#.into()),
            json: Some(json!({ "n": [1, 2] })),
            ..UnifiedRequest::default()
        };
        request.query.append("tag", "x");
        request.query.append("tag", "y");
        request.headers.insert("x-token".into(), "t".into());
        request.files.insert(
            "upload".into(),
            UploadedFile {
                filename: "a.txt".into(),
                content_type: "text/plain".into(),
                bytes: b"hi".to_vec(),
            },
        );

        let engine = handler_engine();
        let mut scope = rhai::Scope::new();
        scope.push("req", request_to_dynamic(&request));
        let summary = engine
            .eval_with_scope::<String>(
                &mut scope,
                r#"
                `${req.method} ${req.path} ${req.raw_path} ${req.query.tag[1]} ${req.json.n[1]} `
                    + `${req.headers["x-token"]} ${req.files.upload.filename} ${req.files.upload.bytes.len()} `
                    + `${req.body.len()} ${req.form.len()} ${type_of(req.text)}`
                "#,
            )
            .unwrap();
        assert_eq!(summary, "POST /a b /a%20b y 2 t a.txt 2 11 0 string");
    }

    #[test]
    fn test_missing_text_and_json_are_unit() {
        let engine = handler_engine();
        let mut scope = rhai::Scope::new();
        scope.push("req", request_to_dynamic(&UnifiedRequest::default()));
        let result = engine
            .eval_with_scope::<bool>(&mut scope, "req.text == () && req.json == ()")
            .unwrap();
        assert!(result);
    }
}
