//! Per-request pipeline for dynamically resolved handlers.
//!
//! # Responsibilities
//! - Route by method: POST to handlers, GET/HEAD to files, anything else 405
//! - Enforce the body cap and build the unified request
//! - Resolve, invoke and coerce on the blocking pool
//!
//! # Design Decisions
//! - One config snapshot per request, so a concurrent config swap never
//!   mixes settings within a request
//! - Body decoding and handler code run in `spawn_blocking`: both can take
//!   long and must not stall the async workers
//! - The blocking task owns a clone of the admission lease, so a dropped
//!   connection cannot free the token while its routine is still running
//! - Handler failures are logged with the full script error; the client only
//!   sees the message and a correlation id

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::Method;
use axum::response::{IntoResponse, Response};

use crate::config::ServerConfig;
use crate::error::DispatchError;
use crate::handlers::{invoke, UnitLoader};
use crate::http::server::AppState;
use crate::http::static_files;
use crate::net::AdmissionLease;
use crate::observability::metrics;
use crate::request::{normalize, UnifiedRequest};
use crate::response::{self, ResponseEnvelope};
use crate::routing::Resolver;
use crate::security::limits::{check_declared_length, read_body};

/// Fallback handler for every path not claimed by a fixed route.
pub async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    let result = match method {
        Method::POST => handle_post(&state, request).await,
        Method::GET | Method::HEAD => {
            let config = state.config.load_full();
            static_files::serve(&config, request.uri().path()).await
        }
        other => Err(DispatchError::MethodNotAllowed(other.to_string())),
    };

    match result {
        Ok(envelope) => envelope.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle_post(state: &AppState, request: Request) -> Result<ResponseEnvelope, DispatchError> {
    let config = state.config.load_full();
    let limit = config.limits.max_body_bytes;

    let (mut parts, body) = request.into_parts();
    check_declared_length(&parts.headers, limit)?;
    let body = read_body(body, limit).await?;

    let lease = parts.extensions.remove::<AdmissionLease>();
    let loader = Arc::clone(&state.loader);
    tokio::task::spawn_blocking(move || {
        let request = normalize(&parts, body);
        tracing::debug!(
            path = %request.path,
            content_type = %request.content_type,
            body_bytes = request.body.len(),
            "Dispatching request"
        );
        let result = execute(&config, &loader, &request);
        drop(lease);
        result
    })
    .await
    .map_err(|err| DispatchError::Internal(err.to_string()))?
}

/// Resolve, invoke and coerce. Runs on the blocking pool.
fn execute(
    config: &ServerConfig,
    loader: &UnitLoader,
    request: &UnifiedRequest,
) -> Result<ResponseEnvelope, DispatchError> {
    let resolution = Resolver::new(&config.handlers, loader).resolve(&request.path)?;
    let descriptor = &resolution.descriptor;

    tracing::debug!(
        unit = %descriptor.unit,
        routine = %descriptor.routine,
        style = descriptor.style.as_str(),
        "Handler resolved"
    );

    match invoke(loader.engine(), &resolution.unit, &descriptor.routine, request) {
        Ok(output) => Ok(response::normalize(output)),
        Err(err) => {
            metrics::record_handler_error();
            let failure = DispatchError::Handler {
                unit: descriptor.unit.clone(),
                routine: descriptor.routine.clone(),
                detail: err.to_string(),
            };
            let envelope = failure.to_envelope();
            tracing::error!(
                request_id = envelope.request_id().unwrap_or("-"),
                unit = %descriptor.unit,
                routine = %descriptor.routine,
                retried_with_text = err.retried_with_text,
                error = ?err.error,
                "Handler raised an error"
            );
            Ok(envelope)
        }
    }
}
