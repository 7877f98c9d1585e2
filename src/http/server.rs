//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create the Axum Router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Resolve each request against the current route snapshot
//! - Forward to the primary upstream
//! - Gate, capture and dispatch asynchronous reports
//! - Apply configuration reloads and shut down gracefully

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode, Version},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Configuration;
use crate::dedup::{Admission, DedupError, IdentityToken, ReportGate};
use crate::http::capture::CapturingBody;
use crate::http::headers::{self, X_REQUEST_ID};
use crate::http::report::{ReportJob, Reporter};
use crate::http::upstream::{self, HttpClient};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::routing::{resolve_request, DispatchPlan, SharedSnapshot};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedSnapshot>,
    pub client: HttpClient,
    pub gate: Arc<ReportGate>,
    pub reporter: Reporter,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    shared: Arc<SharedSnapshot>,
}

impl HttpServer {
    /// Create a server with a file-backed report gate in the configured
    /// dedup directory.
    pub fn new(config: Configuration) -> Result<Self, DedupError> {
        let gate = Arc::new(ReportGate::from_config(&config.dedup)?);
        Ok(Self::with_gate(config, gate))
    }

    /// Create a server around an existing gate.
    pub fn with_gate(config: Configuration, gate: Arc<ReportGate>) -> Self {
        let timeout = config.timeout;
        let shared = Arc::new(SharedSnapshot::new(config));
        let client = upstream::build_client();

        let state = AppState {
            shared: shared.clone(),
            client: client.clone(),
            reporter: Reporter::new(client, gate.clone()),
            gate,
        };

        Self {
            router: Self::build_router(timeout, state),
            shared,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(timeout: Duration, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(timeout))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Live configuration and route table.
    pub fn shared(&self) -> Arc<SharedSnapshot> {
        self.shared.clone()
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Every configuration received on `config_updates` is published as a
    /// new snapshot; requests already in flight finish on the old one.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<Configuration>,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let shared = self.shared.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                shared.publish(config);
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.recv().await })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Resolves the route, forwards to the primary upstream and, when the route
/// asks for it, captures the response for an asynchronous report.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let snapshot = state.shared.load();
    let config = &snapshot.config;

    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());
    let authority = headers::request_authority(&request).unwrap_or_default();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        host = %authority,
        path = %path,
        headers = %headers::format_visible(request.headers(), &config.visible_headers),
        "Proxying request"
    );

    // 1. Match Route
    let matches = resolve_request(&snapshot.table, &authority, &path);
    let Some(plan) = DispatchPlan::from_matches(matches) else {
        tracing::warn!(request_id = %request_id, host = %authority, path = %path, "No route matched");
        metrics::record_route_miss();
        return (StatusCode::NOT_FOUND, "No matching route found").into_response();
    };

    // 2. Dedup check, before anything is forwarded
    let admitted = if plan.wants_report() {
        admit(
            &state.gate,
            &config.dedup.session_cookie,
            request.headers(),
            &path,
            &request_id,
        )
    } else {
        None
    };
    let replicated = admitted
        .as_ref()
        .map(|_| headers::replicate_headers(request.headers(), &config.header_to_replicate));

    // 3. Forward to primary
    let upstream_request = match prepare_upstream_request(request, &plan.primary, &path_and_query) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(request_id = %request_id, upstream = %plan.primary, error = %e, "Invalid upstream URI");
            metrics::record_request(method.as_str(), 502, &plan.primary, start_time);
            return (StatusCode::BAD_GATEWAY, "Invalid upstream").into_response();
        }
    };

    let response = match state.client.request(upstream_request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(request_id = %request_id, upstream = %plan.primary, error = %e, "Upstream error");
            metrics::record_request(method.as_str(), 502, &plan.primary, start_time);
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    let status = response.status();
    metrics::record_request(method.as_str(), status.as_u16(), &plan.primary, start_time);

    let (mut parts, body) = response.into_parts();
    headers::strip_hop_by_hop(&mut parts.headers);

    let Some(token) = admitted else {
        return Response::from_parts(parts, Body::new(body));
    };

    // 4. Report path: stream to the client, keep the first body_max_len
    //    bytes, then claim and dispatch once the body is complete.
    let job = ReportJob {
        token,
        targets: plan.reports,
        path_and_query,
        headers: replicated.unwrap_or_default(),
        request_id,
    };
    let reporter = state.reporter.clone();
    let body = CapturingBody::new(body, config.body_max_len, move |captured| {
        reporter.dispatch(job, captured);
    });

    Response::from_parts(parts, Body::new(body))
}

/// Pre-forward dedup check. `None` means the request is served without a report.
fn admit(
    gate: &ReportGate,
    cookie_name: &str,
    request_headers: &HeaderMap,
    path: &str,
    request_id: &str,
) -> Option<IdentityToken> {
    let session = headers::session_cookie(request_headers, cookie_name);
    match gate.check(path, session.as_deref()) {
        Ok(Admission::Fresh(token)) => Some(token),
        Ok(Admission::Duplicate(token)) => {
            metrics::record_dedup("duplicate");
            tracing::debug!(request_id = %request_id, token = %token, "Report already dispatched, skipping");
            None
        }
        Err(DedupError::MissingIdentityInput { cookie }) => {
            metrics::record_dedup("no_session");
            tracing::debug!(request_id = %request_id, cookie = %cookie, "No session cookie, serving without report");
            None
        }
        Err(e) => {
            metrics::record_dedup("error");
            tracing::warn!(request_id = %request_id, error = %e, "Dedup check failed, serving without report");
            None
        }
    }
}

/// Rewrite the inbound request for the upstream: absolute URI, no `Host`
/// (the client sets it from the URI), no hop-by-hop headers.
fn prepare_upstream_request(
    request: Request<Body>,
    upstream_base: &str,
    path_and_query: &str,
) -> Result<Request<Body>, axum::http::uri::InvalidUri> {
    let (mut parts, body) = request.into_parts();
    parts.uri = upstream::upstream_uri(upstream_base, path_and_query)?;
    parts.version = Version::HTTP_11;
    parts.headers.remove(header::HOST);
    headers::strip_hop_by_hop(&mut parts.headers);
    Ok(Request::from_parts(parts, body))
}
