//! Routine invocation.
//!
//! Routines take the request map. Older routines take the body text instead;
//! when the first call fails because the routine cannot work with a map, it
//! is called once more with the text.

use rhai::{CallFnOptions, Dynamic, Engine, EvalAltResult, Scope};
use thiserror::Error;

use crate::handlers::loader::HandlerUnit;
use crate::handlers::value::{classify, request_to_dynamic};
use crate::request::UnifiedRequest;
use crate::response::HandlerOutput;

/// A routine failed while running.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct InvokeError {
    pub routine: String,
    pub error: Box<EvalAltResult>,
    /// The error comes from the second, text-body attempt.
    pub retried_with_text: bool,
}

/// Call `routine` in `unit` with the request.
pub fn invoke(
    engine: &Engine,
    unit: &HandlerUnit,
    routine: &str,
    request: &UnifiedRequest,
) -> Result<HandlerOutput, InvokeError> {
    match call(engine, unit, routine, request_to_dynamic(request)) {
        Ok(value) => Ok(classify(value)),
        Err(error) if rejects_request_shape(&error) => {
            tracing::debug!(
                unit = %unit.id,
                routine,
                error = %error,
                "Routine rejected the request map, retrying with text body"
            );
            let text = request.text.clone().unwrap_or_default();
            call(engine, unit, routine, Dynamic::from(text))
                .map(classify)
                .map_err(|error| InvokeError {
                    routine: routine.to_string(),
                    error,
                    retried_with_text: true,
                })
        }
        Err(error) => Err(InvokeError {
            routine: routine.to_string(),
            error,
            retried_with_text: false,
        }),
    }
}

fn call(
    engine: &Engine,
    unit: &HandlerUnit,
    routine: &str,
    argument: Dynamic,
) -> Result<Dynamic, Box<EvalAltResult>> {
    // Top-level statements already ran when the unit was loaded.
    let options = CallFnOptions::new().eval_ast(false);
    engine.call_fn_with_options::<Dynamic>(options, &mut Scope::new(), &unit.ast, routine, (argument,))
}

/// Errors that mean "this routine does not accept a map".
fn rejects_request_shape(error: &EvalAltResult) -> bool {
    match error {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => rejects_request_shape(inner),
        EvalAltResult::ErrorFunctionNotFound(..)
        | EvalAltResult::ErrorMismatchDataType(..)
        | EvalAltResult::ErrorMismatchOutputType(..)
        | EvalAltResult::ErrorIndexingType(..)
        | EvalAltResult::ErrorDotExpr(..) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::engine::handler_engine;
    use crate::handlers::loader::UnitLoader;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn run(source: &str, routine: &str, request: &UnifiedRequest) -> Result<HandlerOutput, InvokeError> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("unit.rhai");
        std::fs::write(&path, source).unwrap();
        let loader = UnitLoader::new(Arc::new(handler_engine()));
        let unit = loader.load(&path, "unit.rhai", true).unwrap();
        invoke(loader.engine(), &unit, routine, request)
    }

    fn json_request(body: &str) -> UnifiedRequest {
        UnifiedRequest {
            method: "POST".into(),
            content_type: "application/json".into(),
            body: body.as_bytes().to_vec(),
            text: Some(body.into()),
            json: serde_json::from_str(body).ok(),
            ..UnifiedRequest::default()
        }
    }

    #[test]
    fn test_routine_receives_request_map() {
        let output = run(
            "fn handle_request(req) { #{ sum: req.json.a + req.json.b } }",
            "handle_request",
            &json_request(r#"{"a": 2, "b": 3}"#),
        )
        .unwrap();
        assert_eq!(output, HandlerOutput::Json(json!({ "sum": 5 })));
    }

    #[test]
    fn test_text_signature_retry() {
        let output = run(
            "fn shout(text) { text.to_upper() }",
            "shout",
            &json_request(r#""quiet""#),
        )
        .unwrap();
        assert_eq!(output, HandlerOutput::Text(r#""QUIET""#.into()));
    }

    #[test]
    fn test_runtime_error_is_not_retried() {
        let err = run(
            r#"fn handle_request(req) { throw "database unavailable"; }"#,
            "handle_request",
            &json_request("{}"),
        )
        .unwrap_err();
        assert!(!err.retried_with_text);
        assert!(err.to_string().contains("database unavailable"));
    }

    #[test]
    fn test_retry_failure_is_reported() {
        let err = run(
            "fn two(a, b) { a + b }",
            "two",
            &json_request("{}"),
        )
        .unwrap_err();
        assert!(err.retried_with_text);
    }
}
