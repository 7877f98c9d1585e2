//! Shared utilities for the proxy integration tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use report_proxy::config::{self, Configuration};
use report_proxy::dedup::ReportGate;
use report_proxy::{HttpServer, Shutdown};

/// Start a raw mock backend that returns a fixed response.
#[allow(dead_code)]
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let response_str = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    response.len(),
                    response
                );
                let _ = socket.write_all(response_str.as_bytes()).await;
                let _ = socket.shutdown().await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            });
        }
    });

    addr
}

/// One request as seen by a [`RecordingBackend`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Backend that answers every request with a fixed response and keeps a log.
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    pub addr: SocketAddr,
    log: Arc<Mutex<Vec<Recorded>>>,
}

impl RecordingBackend {
    pub async fn start(status: u16, response: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        let recorder = log.clone();
        let app = Router::new().fallback(move |request: Request<Body>| {
            let recorder = recorder.clone();
            async move {
                let (parts, body) = request.into_parts();
                let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
                recorder.lock().unwrap().push(Recorded {
                    method: parts.method.to_string(),
                    path: parts
                        .uri
                        .path_and_query()
                        .map(|pq| pq.as_str().to_string())
                        .unwrap_or_default(),
                    headers: parts.headers,
                    body: body.to_vec(),
                });
                (StatusCode::from_u16(status).unwrap(), response)
            }
        });

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, log }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    /// Poll until at least `count` requests arrived or two seconds passed.
    pub async fn wait_for(&self, count: usize) -> Vec<Recorded> {
        for _ in 0..100 {
            let seen = self.requests();
            if seen.len() >= count {
                return seen;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.requests()
    }
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Environment for a proxy on 127.0.0.1 with markers under `dedup_dir`.
pub fn proxy_env(routes: &str, dedup_dir: &Path) -> HashMap<String, String> {
    HashMap::from([
        ("PROXY_CONFIGURATION".to_string(), routes.to_string()),
        ("DEDUP_DIR".to_string(), dedup_dir.display().to_string()),
        ("LISTEN_HOST".to_string(), "127.0.0.1".to_string()),
        ("LOG_LEVEL".to_string(), "debug".to_string()),
    ])
}

pub fn build_config(env: &HashMap<String, String>) -> Configuration {
    config::load_from(env).unwrap()
}

/// A proxy running in the background of the current test.
pub struct RunningProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub updates: mpsc::UnboundedSender<Configuration>,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_proxy(config: Configuration) -> RunningProxy {
    let server = HttpServer::new(config).unwrap();
    serve(server).await
}

#[allow(dead_code)]
pub async fn start_proxy_with_gate(config: Configuration, gate: Arc<ReportGate>) -> RunningProxy {
    serve(HttpServer::with_gate(config, gate)).await
}

async fn serve(server: HttpServer) -> RunningProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();

    tokio::spawn(server.run(listener, config_updates, shutdown.subscribe()));
    tokio::time::sleep(Duration::from_millis(50)).await;

    RunningProxy {
        addr,
        shutdown,
        updates,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}
