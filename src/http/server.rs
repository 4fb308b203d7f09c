//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: documentation routes plus the dispatch fallback
//! - Wire up middleware (admission, CORS, request ID, tracing, metrics)
//! - Apply live configuration updates
//! - Serve until shutdown, draining admitted requests

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, HOST,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::config::ServerConfig;
use crate::docs::{build_document, DOCS_PAGE};
use crate::error::DispatchError;
use crate::handlers::{handler_engine, UnitLoader};
use crate::http::dispatch::dispatch;
use crate::net::{admission_middleware, Governor};
use crate::observability::metrics;
use crate::response::ResponseEnvelope;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Current configuration; swapped whole on reload.
    pub config: Arc<ArcSwap<ServerConfig>>,
    pub loader: Arc<UnitLoader>,
    pub governor: Governor,
}

/// HTTP server for the handler tree.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        let state = AppState {
            governor: Governor::new(config.limits.max_concurrency),
            loader: Arc::new(UnitLoader::new(Arc::new(handler_engine()))),
            config: Arc::new(ArcSwap::from_pointee(config)),
        };

        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers added later wrap the ones added earlier, so the request passes
    /// metrics → request id → trace → CORS → preflight → governor → timeout.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.config.load();
        let governor = state.governor.clone();

        let mut router = Router::new()
            .route("/__api/spec", get(spec_json).fallback(dispatch))
            .route("/__api/spec.json", get(spec_json).fallback(dispatch))
            .route("/__api", get(docs_page).fallback(dispatch))
            .route("/__api/docs", get(docs_page).fallback(dispatch))
            .fallback(dispatch)
            .with_state(state.clone());

        if let Some(secs) = config.timeouts.request_secs {
            router = router.layer(TimeoutLayer::new(Duration::from_secs(secs)));
        }

        router
            .layer(middleware::from_fn_with_state(governor, admission_middleware))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(request_span))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(SetResponseHeaderLayer::overriding(
                        ACCESS_CONTROL_ALLOW_ORIGIN,
                        HeaderValue::from_static("*"),
                    ))
                    .layer(SetResponseHeaderLayer::overriding(
                        ACCESS_CONTROL_ALLOW_METHODS,
                        HeaderValue::from_static("GET, POST, OPTIONS"),
                    ))
                    .layer(SetResponseHeaderLayer::overriding(
                        ACCESS_CONTROL_ALLOW_HEADERS,
                        HeaderValue::from_static("Content-Type, Authorization"),
                    ))
                    .layer(middleware::from_fn(preflight)),
            )
            .layer(middleware::from_fn(metrics::track_requests))
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configuration updates received on `config_updates` apply to the next
    /// request. The server stops accepting once `shutdown` fires and returns
    /// after admitted requests have completed.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ServerConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_concurrency = self.state.governor.capacity(),
            "HTTP server starting"
        );

        let config = Arc::clone(&self.state.config);
        tokio::spawn(async move {
            while let Some(update) = config_updates.recv().await {
                apply_update(&config, update);
            }
        });

        let governor = self.state.governor.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!(in_flight = governor.in_flight(), "Draining admitted requests");
                governor.close();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Snapshot of the current config.
    pub fn config(&self) -> Arc<ServerConfig> {
        self.state.config.load_full()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Swap in a reloaded config. Listener and governor settings stay as started.
fn apply_update(current: &ArcSwap<ServerConfig>, update: ServerConfig) {
    let previous = current.load();
    if **previous == update {
        tracing::debug!("Config reloaded without changes");
        return;
    }
    if previous.listener.bind_address != update.listener.bind_address {
        tracing::warn!(
            bind_address = %update.listener.bind_address,
            "Bind address changes take effect after a restart"
        );
    }
    if previous.limits.max_concurrency != update.limits.max_concurrency {
        tracing::warn!(
            max_concurrency = update.limits.max_concurrency,
            "Concurrency limit changes take effect after a restart"
        );
    }
    if previous.timeouts != update.timeouts {
        tracing::warn!("Timeout changes take effect after a restart");
    }

    tracing::info!(
        root = %update.handlers.root.display(),
        hot_reload = update.handlers.hot_reload,
        "Configuration updated"
    );
    current.store(Arc::new(update));
}

fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}

/// Answer CORS preflight without taking an admission token.
async fn preflight(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    next.run(request).await
}

/// `GET /__api/spec[.json]`
async fn spec_json(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let config = state.config.load_full();
    if !config.docs.enabled {
        return DispatchError::NotFound("/__api/spec".to_string()).into_response();
    }

    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match tokio::task::spawn_blocking(move || build_document(&config, host.as_deref())).await {
        Ok(document) => ResponseEnvelope::json(StatusCode::OK, &document).into_response(),
        Err(err) => DispatchError::Internal(err.to_string()).into_response(),
    }
}

/// `GET /__api[/docs]`
async fn docs_page(State(state): State<AppState>) -> Response {
    if !state.config.load().docs.enabled {
        return DispatchError::NotFound("/__api/docs".to_string()).into_response();
    }
    ResponseEnvelope::html(StatusCode::OK, DOCS_PAGE).into_response()
}
