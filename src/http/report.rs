//! Fire-and-forget delivery of captured responses to report upstreams.
//!
//! # Responsibilities
//! - Claim the token with the captured body once the client response ends
//! - POST the captured body to every report target
//! - Carry the replicated inbound headers and the identity token
//! - Release the marker and capture once every target has been tried
//!
//! # Design Decisions
//! - Runs on its own task; the client response never waits for it
//! - Delivery failures are logged and counted, never surfaced to the client

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::dedup::{Claim, IdentityToken, ReportGate};
use crate::http::headers::X_REPORT_TOKEN;
use crate::http::upstream::{upstream_uri, HttpClient};
use crate::observability::metrics;

/// Errors from one report delivery attempt.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid report URI for {0}")]
    InvalidUri(String),

    #[error("Report request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("Report rejected with status {0}")]
    Rejected(StatusCode),
}

/// Everything a report needs once the primary response has been served.
#[derive(Debug, Clone)]
pub struct ReportJob {
    pub token: IdentityToken,
    pub targets: Vec<String>,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub request_id: String,
}

/// Sends reports in the background.
#[derive(Debug, Clone)]
pub struct Reporter {
    client: HttpClient,
    gate: Arc<ReportGate>,
}

impl Reporter {
    pub fn new(client: HttpClient, gate: Arc<ReportGate>) -> Self {
        Self { client, gate }
    }

    /// Claim `job.token` with `captured` and, if this request owns it, send
    /// the report. Runs in the background; the handle is only useful to tests.
    pub fn dispatch(&self, job: ReportJob, captured: Bytes) -> JoinHandle<()> {
        let reporter = self.clone();
        tokio::spawn(async move { reporter.claim_and_run(job, captured).await })
    }

    async fn claim_and_run(&self, job: ReportJob, captured: Bytes) {
        tracing::debug!(
            request_id = %job.request_id,
            body = %String::from_utf8_lossy(&captured),
            "Captured upstream response"
        );

        match self.gate.claim(job.token.clone(), &captured) {
            Ok(Claim::Owned(_)) => {
                metrics::record_dedup("fresh");
                self.run(job).await;
            }
            Ok(Claim::Lost(token)) => {
                metrics::record_dedup("lost");
                tracing::debug!(request_id = %job.request_id, token = %token, "Another request owns this report");
            }
            Err(e) => {
                metrics::record_dedup("error");
                tracing::warn!(request_id = %job.request_id, error = %e, "Report skipped: marker not recorded");
            }
        }
    }

    async fn run(&self, job: ReportJob) {
        match self.gate.captured(&job.token) {
            Ok(body) => {
                let body = Bytes::from(body);
                for target in &job.targets {
                    match self.send(target, &job, body.clone()).await {
                        Ok(status) => {
                            metrics::record_report("delivered");
                            tracing::info!(
                                request_id = %job.request_id,
                                token = %job.token,
                                target = %target,
                                status = %status,
                                "Report delivered"
                            );
                        }
                        Err(e) => {
                            metrics::record_report("failed");
                            tracing::warn!(
                                request_id = %job.request_id,
                                token = %job.token,
                                target = %target,
                                error = %e,
                                "Report delivery failed"
                            );
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(request_id = %job.request_id, token = %job.token, error = %e, "Captured body unavailable");
            }
        }

        if let Err(e) = self.gate.release(&job.token) {
            tracing::warn!(token = %job.token, error = %e, "Failed to release report marker");
        }
    }

    async fn send(&self, target: &str, job: &ReportJob, body: Bytes) -> Result<StatusCode, ReportError> {
        let uri = upstream_uri(target, &job.path_and_query)
            .map_err(|_| ReportError::InvalidUri(target.to_string()))?;

        let mut builder = Request::builder().method(Method::POST).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(job.headers.clone());
            if let Ok(value) = HeaderValue::from_str(job.token.as_str()) {
                headers.insert(X_REPORT_TOKEN, value);
            }
        }
        let request = builder
            .body(Body::from(body))
            .map_err(|_| ReportError::InvalidUri(target.to_string()))?;

        let response = self.client.request(request).await?;
        let status = response.status();
        if status.is_success() {
            Ok(status)
        } else {
            Err(ReportError::Rejected(status))
        }
    }
}
