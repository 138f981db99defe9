// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP/JSON control API for the erase agent.
//
// The agent is driven remotely (originally by a companion mobile app), so
// the API speaks plain HTTP/1.1 with JSON bodies.  It operates directly on
// raw TCP: a full HTTP framework is unnecessary overhead for seven routes
// with query-string parameters and no request bodies.  We parse the request
// line and headers ourselves and answer with `Connection: close`.
//
// # Routes
//
//   GET  /status              agent liveness + active-job projection
//   GET  /list-devices        mounted volumes visible to the agent
//   POST /wipe?device=&method= start an erase job
//   POST /emergency-stop      cooperative cancellation of the active job
//   GET  /certificates        stored certificate ids
//   GET  /certificates/{id}   one certificate plus its detached signature
//   GET  /public-key          the agent's Ed25519 verification key
//
// # Authentication
//
// Every route requires the `X-API-Key` header to match the configured key.
// The comparison is constant-time; a mismatch yields 401 with no detail.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use scrubwerk_attest::Signature;
use scrubwerk_core::error::{Result, ScrubwerkError};
use scrubwerk_core::types::EraseMethod;

use crate::services::AgentServices;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum bytes to read from a connection before rejecting it.  Requests
/// carry everything in the query string, so this is generous already.
const MAX_REQUEST_BYTES: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Minimal HTTP request parser
// ---------------------------------------------------------------------------

/// A parsed request line plus headers.  Bodies are ignored: every route
/// takes its parameters from the query string.
#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    query: String,
    headers: HashMap<String, String>,
}

impl HttpRequest {
    /// First query parameter with the given name, percent-decoded.
    fn query_param(&self, name: &str) -> Option<String> {
        self.query.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if key == name {
                Some(percent_decode(value))
            } else {
                None
            }
        })
    }

    fn header(&self, name: &str) -> &str {
        self.headers.get(name).map(String::as_str).unwrap_or("")
    }
}

/// Parse the request line and headers of an HTTP/1.1 request.
///
/// Returns `None` if the bytes do not look like HTTP.  The path is kept
/// verbatim (certificate ids are validated downstream); query values are
/// percent-decoded on access.
fn parse_request(data: &[u8]) -> Option<HttpRequest> {
    let header_end = find_subsequence(data, b"\r\n\r\n")?;
    let head = std::str::from_utf8(&data[..header_end]).ok()?;

    let mut lines = head.lines();
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?;
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), query.to_string()),
        None => (target.to_string(), String::new()),
    };

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    Some(HttpRequest {
        method,
        path,
        query,
        headers,
    })
}

/// Find the first occurrence of `needle` in `haystack`.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Decode `%XX` escapes and `+` spaces.  Malformed escapes pass through
/// untouched rather than failing the whole request.
fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hi = (bytes[i + 1] as char).to_digit(16);
                let lo = (bytes[i + 2] as char).to_digit(16);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi * 16 + lo) as u8);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Frame a JSON body in a minimal HTTP/1.1 response.
fn http_payload(status: u16, reason: &str, body: &Value) -> Vec<u8> {
    let json = body.to_string();
    let mut bytes = format!(
        "HTTP/1.1 {status} {reason}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n",
        json.len()
    )
    .into_bytes();
    bytes.extend_from_slice(json.as_bytes());
    bytes
}

/// Map an engine error onto the route's status code.
fn error_reply(e: &ScrubwerkError) -> (u16, &'static str, Value) {
    let (status, reason) = match e {
        ScrubwerkError::UnsafeTarget(_) => (403, "Forbidden"),
        ScrubwerkError::TargetNotFound(_) => (404, "Not Found"),
        ScrubwerkError::AlreadyRunning => (409, "Conflict"),
        _ => (500, "Internal Server Error"),
    };
    (status, reason, json!({ "error": e.to_string() }))
}

// ---------------------------------------------------------------------------
// Shared state passed to connection handlers
// ---------------------------------------------------------------------------

struct SharedState {
    services: AgentServices,
    /// Counter of active connections, readable from the server handle.
    active_connections: Arc<AtomicU32>,
}

// ---------------------------------------------------------------------------
// AgentServer
// ---------------------------------------------------------------------------

/// The embedded control-API server.
///
/// Binds a TCP listener and accepts connections until stopped.  Each
/// connection is handled in its own task; destructive work never runs on
/// connection tasks — `/wipe` only hands the job to the engine's worker.
pub struct AgentServer {
    port: u16,
    bound_port: Option<u16>,
    /// Notification handle used to signal a graceful shutdown.
    shutdown_signal: Arc<Notify>,
    task_handle: Option<JoinHandle<()>>,
    active_connections: Arc<AtomicU32>,
}

impl AgentServer {
    /// Create a server for the given port (0 picks an ephemeral port).
    pub fn new(port: u16) -> Self {
        Self {
            port,
            bound_port: None,
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
            active_connections: Arc::new(AtomicU32::new(0)),
        }
    }

    /// The port actually bound, once `start` has succeeded.
    pub fn port(&self) -> u16 {
        self.bound_port.unwrap_or(self.port)
    }

    pub fn active_connections(&self) -> u32 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Bind `0.0.0.0:{port}` and spawn the accept loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the port is already in use or the listener
    /// cannot be created.
    pub async fn start(&mut self, services: AgentServices) -> Result<()> {
        if self.task_handle.is_some() {
            debug!(port = self.port(), "agent API already running");
            return Ok(());
        }

        let bind_addr: SocketAddr = ([0, 0, 0, 0], self.port).into();
        let listener = TcpListener::bind(bind_addr).await?;
        let bound = listener.local_addr().map(|a| a.port()).unwrap_or(self.port);
        self.bound_port = Some(bound);
        info!(port = bound, "agent API listening");

        let shared = Arc::new(SharedState {
            services,
            active_connections: Arc::clone(&self.active_connections),
        });
        let shutdown = Arc::clone(&self.shutdown_signal);

        let handle = tokio::spawn(async move {
            Self::accept_loop(listener, shutdown, shared).await;
        });
        self.task_handle = Some(handle);
        Ok(())
    }

    /// Gracefully stop the server.  Connections that are mid-transfer are
    /// allowed to finish; the active erase job, if any, keeps running.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(handle) = self.task_handle.take() {
            info!(port = self.port(), "stopping agent API");
            self.shutdown_signal.notify_one();
            handle
                .await
                .map_err(|e| std::io::Error::other(format!("accept loop join: {e}")))?;
            info!("agent API stopped");
        }
        Ok(())
    }

    /// The main accept loop.  Runs until the shutdown signal is received.
    async fn accept_loop(listener: TcpListener, shutdown: Arc<Notify>, shared: Arc<SharedState>) {
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("accept loop received shutdown signal");
                    break;
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            let state = Arc::clone(&shared);
                            tokio::spawn(async move {
                                state.active_connections.fetch_add(1, Ordering::Relaxed);
                                if let Err(e) = handle_connection(stream, peer_addr, &state).await {
                                    warn!(peer = %peer_addr, error = %e, "connection handler error");
                                }
                                state.active_connections.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                        }
                    }
                }
            }
        }
    }
}

/// Handle a single connection: read the head of the request, authenticate,
/// dispatch, reply, close.
async fn handle_connection(
    mut stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &SharedState,
) -> Result<()> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        if find_subsequence(&buf, b"\r\n\r\n").is_some() {
            break;
        }
        if buf.len() > MAX_REQUEST_BYTES {
            let payload = http_payload(400, "Bad Request", &json!({"error": "request too large"}));
            stream.write_all(&payload).await?;
            return Ok(());
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            // Client went away before completing the request head.
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let Some(request) = parse_request(&buf) else {
        warn!(peer = %peer_addr, "malformed request");
        let payload = http_payload(400, "Bad Request", &json!({"error": "malformed request"}));
        stream.write_all(&payload).await?;
        return Ok(());
    };

    if !authorized(&request, &state.services.config().api_key) {
        warn!(peer = %peer_addr, path = %request.path, "unauthorized request");
        let payload = http_payload(401, "Unauthorized", &json!({"error": "Unauthorized"}));
        stream.write_all(&payload).await?;
        return Ok(());
    }

    debug!(peer = %peer_addr, method = %request.method, path = %request.path, "request");
    let (status, reason, body) = dispatch(&state.services, &request);
    let payload = http_payload(status, reason, &body);
    stream.write_all(&payload).await?;
    stream.flush().await?;
    info!(peer = %peer_addr, path = %request.path, status, "response sent");
    Ok(())
}

/// Constant-time API-key check.
fn authorized(request: &HttpRequest, expected: &str) -> bool {
    let provided = request.header("x-api-key");
    ring::constant_time::verify_slices_are_equal(provided.as_bytes(), expected.as_bytes()).is_ok()
}

// ---------------------------------------------------------------------------
// Route dispatch
// ---------------------------------------------------------------------------

/// Route the authenticated request.  Pure: takes services and the request,
/// returns status + JSON, no socket involved.
fn dispatch(services: &AgentServices, request: &HttpRequest) -> (u16, &'static str, Value) {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/status") => status_route(services),
        ("GET", "/list-devices") => list_devices_route(),
        ("POST", "/wipe") => wipe_route(services, request),
        ("POST", "/emergency-stop") => emergency_stop_route(services),
        ("GET", "/certificates") => certificates_route(services),
        ("GET", "/public-key") => public_key_route(services),
        ("GET", path) if path.starts_with("/certificates/") => {
            certificate_detail_route(services, &path["/certificates/".len()..])
        }
        _ => (404, "Not Found", json!({"error": "not found"})),
    }
}

fn status_route(services: &AgentServices) -> (u16, &'static str, Value) {
    let job = services.engine().status().map(|job| {
        json!({
            "state": job.state,
            "progress": job.progress,
            "target": job.target.display_path(),
            "method": job.method,
            "started_at": job.started_at,
            "ended_at": job.ended_at,
            "error": job.error,
        })
    });
    (
        200,
        "OK",
        json!({
            "status": "online",
            "wipe_active": services.engine().is_busy(),
            "job": job,
        }),
    )
}

fn list_devices_route() -> (u16, &'static str, Value) {
    let devices = scrubwerk_engine::devices::list_volumes();
    (200, "OK", json!({ "devices": devices }))
}

fn wipe_route(services: &AgentServices, request: &HttpRequest) -> (u16, &'static str, Value) {
    let device = match request.query_param("device") {
        Some(device) if !device.is_empty() => device,
        _ => {
            return (
                400,
                "Bad Request",
                json!({"error": "Missing 'device' parameter"}),
            );
        }
    };

    let method = match request.query_param("method") {
        None => EraseMethod::Secure,
        Some(name) => match EraseMethod::from_name(&name) {
            Some(method) => method,
            None => {
                return (
                    400,
                    "Bad Request",
                    json!({"error": format!("unknown method '{name}'")}),
                );
            }
        },
    };

    match services.engine().start(&device, method) {
        Ok(job_id) => (
            200,
            "OK",
            json!({
                "status": "wipe_started",
                "target_received": device,
                "method": method.name(),
                "job_id": job_id,
                "message": "erase job accepted",
            }),
        ),
        Err(e) => error_reply(&e),
    }
}

fn emergency_stop_route(services: &AgentServices) -> (u16, &'static str, Value) {
    let was_active = services.engine().request_cancel();
    (
        200,
        "OK",
        json!({
            "status": "stopping_process",
            "was_active": was_active,
        }),
    )
}

fn certificates_route(services: &AgentServices) -> (u16, &'static str, Value) {
    match services.store().list() {
        Ok(ids) => {
            let count = ids.len();
            (200, "OK", json!({ "certificates": ids, "count": count }))
        }
        Err(e) => error_reply(&e),
    }
}

fn certificate_detail_route(services: &AgentServices, id: &str) -> (u16, &'static str, Value) {
    match services.store().load(id) {
        Ok(Some((cert_bytes, sig_bytes))) => match serde_json::from_slice::<Value>(&cert_bytes) {
            Ok(certificate) => (
                200,
                "OK",
                json!({
                    "certificate": certificate,
                    "signature_hex": Signature::from_bytes(sig_bytes).to_hex(),
                }),
            ),
            Err(e) => error_reply(&ScrubwerkError::Serialization(e)),
        },
        // Unknown and malformed ids both read as absent; probes learn
        // nothing about the store layout.
        Ok(None) | Err(ScrubwerkError::Certificate(_)) => {
            (404, "Not Found", json!({"error": "certificate not found"}))
        }
        Err(e) => error_reply(&e),
    }
}

fn public_key_route(services: &AgentServices) -> (u16, &'static str, Value) {
    (
        200,
        "OK",
        json!({
            "algorithm": "ed25519",
            "public_key_hex": services.signer().public_key_hex(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use scrubwerk_core::AgentConfig;
    use std::io::Write as _;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    // -- Request parsing ----------------------------------------------------

    #[test]
    fn parse_request_splits_path_and_query() {
        let raw = b"POST /wipe?device=%2Ftmp%2Fvictim&method=quick HTTP/1.1\r\n\
                    Host: agent\r\n\
                    X-API-Key: secret\r\n\
                    \r\n";
        let req = parse_request(raw).expect("parses");
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/wipe");
        assert_eq!(req.query_param("device").as_deref(), Some("/tmp/victim"));
        assert_eq!(req.query_param("method").as_deref(), Some("quick"));
        assert_eq!(req.header("x-api-key"), "secret");
    }

    #[test]
    fn parse_request_without_query_yields_empty_params() {
        let raw = b"GET /status HTTP/1.1\r\nHost: x\r\n\r\n";
        let req = parse_request(raw).expect("parses");
        assert_eq!(req.path, "/status");
        assert!(req.query_param("device").is_none());
        assert_eq!(req.header("missing"), "");
    }

    #[test]
    fn parse_request_rejects_non_http() {
        assert!(parse_request(b"\x02\x00\x01\x04garbage\r\n\r\n").is_none());
        assert!(parse_request(b"GET /status\r\n\r\n").is_none());
        assert!(parse_request(b"no terminator").is_none());
    }

    // -- find_subsequence ---------------------------------------------------

    #[test]
    fn find_subsequence_basic() {
        assert_eq!(find_subsequence(b"hello world", b"world"), Some(6));
        assert_eq!(find_subsequence(b"hello world", b"hello"), Some(0));
        assert_eq!(find_subsequence(b"hello world", b"xyz"), None);
    }

    #[test]
    fn find_subsequence_crlf() {
        let data = b"HTTP/1.1 200\r\n\r\nbody";
        assert_eq!(find_subsequence(data, b"\r\n\r\n"), Some(12));
    }

    // -- Percent decoding ---------------------------------------------------

    #[test]
    fn percent_decode_handles_escapes_and_plus() {
        assert_eq!(percent_decode("%2Ftmp%2Fmy+file"), "/tmp/my file");
        assert_eq!(percent_decode("plain"), "plain");
        assert_eq!(percent_decode("d%3A"), "d:");
    }

    #[test]
    fn percent_decode_passes_malformed_escapes_through() {
        assert_eq!(percent_decode("100%zz"), "100%zz");
        assert_eq!(percent_decode("trailing%"), "trailing%");
        assert_eq!(percent_decode("%2"), "%2");
    }

    // -- Dispatch (no sockets) ----------------------------------------------

    fn test_services(dir: &Path) -> AgentServices {
        let config = AgentConfig {
            api_key: "testkey".into(),
            port: 0,
            ..AgentConfig::default()
        };
        AgentServices::init(config, dir.join("data")).expect("services init")
    }

    fn get(path: &str) -> HttpRequest {
        parse_request(format!("GET {path} HTTP/1.1\r\nHost: t\r\n\r\n").as_bytes())
            .expect("request")
    }

    fn post(path_and_query: &str) -> HttpRequest {
        parse_request(format!("POST {path_and_query} HTTP/1.1\r\nHost: t\r\n\r\n").as_bytes())
            .expect("request")
    }

    #[test]
    fn status_route_reports_idle_agent() {
        let dir = TempDir::new().expect("tempdir");
        let services = test_services(dir.path());

        let (status, _, body) = dispatch(&services, &get("/status"));
        assert_eq!(status, 200);
        assert_eq!(body["status"], "online");
        assert_eq!(body["wipe_active"], false);
        assert!(body["job"].is_null());
    }

    #[test]
    fn wipe_without_device_is_400() {
        let dir = TempDir::new().expect("tempdir");
        let services = test_services(dir.path());

        let (status, _, body) = dispatch(&services, &post("/wipe"));
        assert_eq!(status, 400);
        assert_eq!(body["error"], "Missing 'device' parameter");
    }

    #[test]
    fn wipe_with_unknown_method_is_400() {
        let dir = TempDir::new().expect("tempdir");
        let services = test_services(dir.path());

        let (status, _, body) = dispatch(&services, &post("/wipe?device=/tmp/x&method=dod"));
        assert_eq!(status, 400);
        assert!(body["error"].as_str().expect("msg").contains("dod"));
    }

    #[test]
    fn wipe_of_protected_path_is_403() {
        let dir = TempDir::new().expect("tempdir");
        let services = test_services(dir.path());

        let (status, _, body) = dispatch(&services, &post("/wipe?device=/etc&method=secure"));
        assert_eq!(status, 403);
        assert!(
            body["error"]
                .as_str()
                .expect("msg")
                .contains("protected"),
        );
    }

    #[test]
    fn wipe_of_missing_path_is_404() {
        let dir = TempDir::new().expect("tempdir");
        let services = test_services(dir.path());
        let missing = dir.path().join("work").join("absent.bin");

        let request = post(&format!("/wipe?device={}&method=quick", missing.display()));
        let (status, _, _) = dispatch(&services, &request);
        assert_eq!(status, 404);
    }

    #[test]
    fn emergency_stop_when_idle_reports_inactive() {
        let dir = TempDir::new().expect("tempdir");
        let services = test_services(dir.path());

        let (status, _, body) = dispatch(&services, &post("/emergency-stop"));
        assert_eq!(status, 200);
        assert_eq!(body["status"], "stopping_process");
        assert_eq!(body["was_active"], false);
    }

    #[test]
    fn unknown_route_is_404() {
        let dir = TempDir::new().expect("tempdir");
        let services = test_services(dir.path());

        let (status, _, _) = dispatch(&services, &get("/metrics"));
        assert_eq!(status, 404);
        let (status, _, _) = dispatch(&services, &post("/status"));
        assert_eq!(status, 404, "wrong verb on a known path is not found");
    }

    #[test]
    fn certificate_routes_handle_empty_store_and_bad_ids() {
        let dir = TempDir::new().expect("tempdir");
        let services = test_services(dir.path());

        let (status, _, body) = dispatch(&services, &get("/certificates"));
        assert_eq!(status, 200);
        assert_eq!(body["count"], 0);

        let (status, _, _) = dispatch(&services, &get("/certificates/unknown-id"));
        assert_eq!(status, 404);
        // Traversal probes read as absent, not as errors.
        let (status, _, _) = dispatch(&services, &get("/certificates/..%2Fescape"));
        assert_eq!(status, 404);
    }

    #[test]
    fn public_key_route_exports_hex_key() {
        let dir = TempDir::new().expect("tempdir");
        let services = test_services(dir.path());

        let (status, _, body) = dispatch(&services, &get("/public-key"));
        assert_eq!(status, 200);
        assert_eq!(body["algorithm"], "ed25519");
        let hex = body["public_key_hex"].as_str().expect("hex");
        assert_eq!(hex.len(), 64, "raw Ed25519 public key is 32 bytes");
    }

    #[test]
    fn authorized_requires_exact_key() {
        let req = parse_request(b"GET /status HTTP/1.1\r\nX-API-Key: right\r\n\r\n")
            .expect("request");
        assert!(authorized(&req, "right"));
        assert!(!authorized(&req, "wrong"));
        assert!(!authorized(&req, ""));

        let missing = parse_request(b"GET /status HTTP/1.1\r\nHost: t\r\n\r\n").expect("request");
        assert!(!authorized(&missing, "right"));
    }

    // -- Full round trip over a real socket ---------------------------------

    async fn send(port: u16, raw: String) -> String {
        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port))
            .await
            .expect("connect");
        stream.write_all(raw.as_bytes()).await.expect("write");
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.expect("read");
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn body_of(response: &str) -> Value {
        let json = response.split("\r\n\r\n").nth(1).expect("body present");
        serde_json::from_str(json).expect("json body")
    }

    #[tokio::test]
    async fn api_round_trip_wipes_a_file_and_serves_the_certificate() {
        let dir = TempDir::new().expect("tempdir");
        let services = test_services(dir.path());

        let work = dir.path().join("work");
        std::fs::create_dir_all(&work).expect("work dir");
        let target = work.join("victim.bin");
        let mut f = std::fs::File::create(&target).expect("create");
        f.write_all(&[0x77u8; 32 * 1024]).expect("fill");
        drop(f);

        let mut server = AgentServer::new(0);
        server.start(services.clone()).await.expect("server start");
        let port = server.port();

        // No key: 401 with no detail.
        let resp = send(port, "GET /status HTTP/1.1\r\nHost: t\r\n\r\n".into()).await;
        assert!(resp.starts_with("HTTP/1.1 401"));
        assert_eq!(body_of(&resp)["error"], "Unauthorized");

        // Authenticated status.
        let status_req =
            "GET /status HTTP/1.1\r\nHost: t\r\nX-API-Key: testkey\r\n\r\n".to_string();
        let resp = send(port, status_req.clone()).await;
        assert!(resp.starts_with("HTTP/1.1 200"));
        assert_eq!(body_of(&resp)["status"], "online");

        // Start the wipe.
        let wipe_req = format!(
            "POST /wipe?device={}&method=secure HTTP/1.1\r\nHost: t\r\nX-API-Key: testkey\r\n\r\n",
            target.display()
        );
        let resp = send(port, wipe_req).await;
        assert!(resp.starts_with("HTTP/1.1 200"), "unexpected: {resp}");
        assert_eq!(body_of(&resp)["status"], "wipe_started");

        // Poll until the job reaches a terminal state.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
        let job = loop {
            let resp = send(port, status_req.clone()).await;
            let body = body_of(&resp);
            let state = body["job"]["state"].as_str().unwrap_or("").to_string();
            if ["completed", "failed", "cancelled"].contains(&state.as_str()) {
                break body["job"].clone();
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "job did not finish: {body}"
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        };
        assert_eq!(job["state"], "completed");
        assert_eq!(job["progress"], 100);
        assert!(!target.exists(), "target must be gone");

        // The certificate is served with its detached signature.
        let resp = send(
            port,
            "GET /certificates HTTP/1.1\r\nHost: t\r\nX-API-Key: testkey\r\n\r\n".into(),
        )
        .await;
        let listing = body_of(&resp);
        assert_eq!(listing["count"], 1);
        let id = listing["certificates"][0].as_str().expect("id");

        let resp = send(
            port,
            format!("GET /certificates/{id} HTTP/1.1\r\nHost: t\r\nX-API-Key: testkey\r\n\r\n"),
        )
        .await;
        let detail = body_of(&resp);
        assert_eq!(detail["certificate"]["certificate_id"], *id);
        assert_eq!(
            detail["signature_hex"].as_str().expect("sig").len(),
            128,
            "detached Ed25519 signature is 64 bytes"
        );

        server.stop().await.expect("server stop");
    }
}
