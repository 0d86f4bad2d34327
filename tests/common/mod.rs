//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use testforge_connect::config::ClientConfig;
use testforge_connect::endpoints::{EndpointCandidate, OriginKind};

/// How the mock answers a path.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(u16, String),
    Text(u16, String),
    /// Accept the request and never answer.
    Hang,
    /// Close the connection without answering.
    Close,
}

impl Reply {
    pub fn json(status: u16, body: &str) -> Self {
        Reply::Json(status, body.to_string())
    }

    pub fn text(status: u16, body: &str) -> Self {
        Reply::Text(status, body.to_string())
    }

    pub fn healthy() -> Self {
        Reply::json(200, r#"{"status":"ok"}"#)
    }
}

/// One request as the mock saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

#[derive(Default)]
struct MockState {
    routes: HashMap<String, Reply>,
    requests: Vec<RecordedRequest>,
}

/// Path-aware mock backend with programmable replies.
///
/// `/api/health` answers `{"status":"ok"}` until told otherwise; unknown
/// paths answer 404 with a JSON error.
#[derive(Clone)]
pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(MockState::default()));
        state
            .lock()
            .unwrap()
            .routes
            .insert("/api/health".to_string(), Reply::healthy());

        let shared = state.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((socket, _)) => {
                        let state = shared.clone();
                        tokio::spawn(async move {
                            serve(socket, state).await;
                        });
                    }
                    Err(_) => break,
                }
            }
        });

        Self { addr, state }
    }

    /// Start a backend whose health endpoint fails with `status`.
    pub async fn unhealthy(status: u16) -> Self {
        let backend = Self::start().await;
        backend.route("/api/health", Reply::json(status, r#"{"status":"down"}"#));
        backend
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn candidate(&self) -> EndpointCandidate {
        EndpointCandidate::new(self.url(), OriginKind::Local)
    }

    pub fn route(&self, path: &str, reply: Reply) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(path.to_string(), reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }

    pub fn total_hits(&self) -> usize {
        self.requests().len()
    }
}

async fn serve(mut socket: TcpStream, state: Arc<Mutex<MockState>>) {
    let Some(request) = read_request(&mut socket).await else {
        return;
    };

    let reply = {
        let mut state = state.lock().unwrap();
        let reply = state
            .routes
            .get(&request.path)
            .cloned()
            .unwrap_or_else(|| Reply::json(404, r#"{"error":"Not found"}"#));
        state.requests.push(request);
        reply
    };

    let (status, content_type, body) = match reply {
        Reply::Json(status, body) => (status, "application/json", body),
        Reply::Text(status, body) => (status, "text/html", body),
        Reply::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            return;
        }
        Reply::Close => return,
    };

    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason(status),
        content_type,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// A base URL nothing listens on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub async fn dead_candidate() -> EndpointCandidate {
    EndpointCandidate::new(dead_url().await, OriginKind::Local)
}

/// Client config with short deadlines and no proxy, for loopback tests.
pub fn test_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.endpoints.use_system_proxy = false;
    config.timeouts.request_ms = 2_000;
    config.timeouts.probe_ms = 1_000;
    config.health_check.enabled = false;
    config
}

/// Poll `check` every 20ms until it holds or `limit` elapses.
pub async fn wait_for(limit: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
