//! HTTP surface: routes, handlers, middleware and startup.
//!
//! ```text
//! GET    /health            liveness probe
//! POST   /api/process-pdf   multipart `pdf` → CSV artifacts
//! GET    /api/consent       current consent decision (from the cookie)
//! PUT    /api/consent       record a decision, sets the cookie
//! DELETE /api/consent       forget the decision, expires the cookie
//! ```

use crate::config::ProxyConfig;
use crate::consent::{ConsentState, ConsentStore, CookieJar};
use crate::error::{ConfigError, OperationError};
use crate::proxy::ConversionProxy;
use crate::response::ConversionResult;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Service name reported by `/health`.
pub const SERVICE_NAME: &str = "pdf2csv-proxy";

/// Shared, immutable handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub proxy: Arc<ConversionProxy>,
}

/// Build the full application router for `config`.
pub fn app(config: &ProxyConfig) -> Result<Router, ConfigError> {
    let proxy = ConversionProxy::new(config)?;
    Ok(router(proxy, config.max_upload_bytes))
}

/// Router over an existing proxy.
pub fn router(proxy: ConversionProxy, max_upload_bytes: usize) -> Router {
    let state = AppState {
        proxy: Arc::new(proxy),
    };
    Router::new()
        .route("/health", get(health))
        .route("/api/process-pdf", post(process_pdf))
        .route(
            "/api/consent",
            get(get_consent).put(put_consent).delete(delete_consent),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C or SIGTERM.
pub async fn serve(router: Router, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Server ready and accepting connections");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
    info!("Shutting down gracefully...");
}

// ── Handlers ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
    })
}

async fn process_pdf(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ConversionResult>, OperationError> {
    let result = state.proxy.handle_multipart(multipart?).await?;
    Ok(Json(result))
}

/// Body of `PUT /api/consent`.
#[derive(Debug, Deserialize)]
pub struct ConsentDecision {
    pub accepted: bool,
}

/// Body of every `/api/consent` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentStatus {
    pub state: ConsentState,
    pub has_consent: bool,
    pub is_accepted: bool,
}

impl ConsentStatus {
    fn of(store: &ConsentStore<CookieJar>) -> Self {
        Self {
            state: store.get_consent(),
            has_consent: store.has_consent(),
            is_accepted: store.is_accepted(),
        }
    }
}

/// Render the store's state plus any `Set-Cookie` directives it produced.
fn consent_response(store: ConsentStore<CookieJar>) -> Response {
    let mut response = Json(ConsentStatus::of(&store)).into_response();
    store.persistence().apply_to(response.headers_mut());
    response
}

async fn get_consent(headers: HeaderMap) -> Response {
    consent_response(ConsentStore::new(CookieJar::from_headers(&headers)))
}

async fn put_consent(
    headers: HeaderMap,
    decision: Result<Json<ConsentDecision>, JsonRejection>,
) -> Result<Response, OperationError> {
    let Json(decision) = decision?;
    let store = ConsentStore::new(CookieJar::from_headers(&headers));
    store.set_consent(decision.accepted);
    Ok(consent_response(store))
}

async fn delete_consent(headers: HeaderMap) -> Response {
    let store = ConsentStore::new(CookieJar::from_headers(&headers));
    store.clear_consent();
    consent_response(store)
}

/// Turn a handler panic into the generic internal error body.
fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("<non-string panic payload>");
    error!(panic = detail, "Handler panicked");
    OperationError::internal(None).into_response()
}
