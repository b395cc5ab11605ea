//! Mock receipt service for testing
//!
//! Serves the same response shapes as the real service:
//! - GET /receipts returns `[{...}, ...]`
//! - POST /receipt returns `{message, receipt_id}` (or the full record)
//! - POST /receipts/{id} returns `{message}` or `{error}` with HTTP 200
//! - DELETE /receipts/{id} returns `{message}`, 404 when missing
//! - GET /receipts/analytics returns `{total_spent, ..., vendor_summary}`
//!
//! Receipts live in memory, so writes are visible to later reads.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Value as JsonValue};

use crate::domain::{AnalyticsAggregate, Receipt};

const SESSION_COOKIE: &str = "session=mock-session";
const VALID_CODE: &str = "valid-code";

/// Mock receipt server for testing
pub struct MockReceiptServer {
    port: u16,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<MockState>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

/// Configuration for simulated failures
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Answer every receipt endpoint with 401
    pub fail_auth: bool,
    /// Answer uploads with `{"error": ...}`
    pub reject_uploads: bool,
    /// Echo the full record on upload and update
    pub echo_records: bool,
    /// Answer everything with 500
    pub server_error: bool,
    /// Delay in milliseconds before responding
    pub delay_ms: u64,
    /// Written verbatim as the analytics response body
    pub analytics_body: Option<String>,
}

/// A request as received by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

struct MockState {
    config: MockConfig,
    receipts: Vec<Receipt>,
    next_id: i64,
    session_active: bool,
    requests: Vec<RecordedRequest>,
}

/// Three receipts, 210.00 in total, "Green Grocer" ahead with 120.00
pub fn sample_receipts() -> Vec<Receipt> {
    vec![
        Receipt::new(1, "Green Grocer", Decimal::from(50))
            .with_date_time("2024-01-05T09:30:00")
            .with_bill_type("Groceries")
            .with_location("Austin", "TX", "USA"),
        Receipt::new(2, "Blue Cafe", Decimal::from(90))
            .with_date_time("2024-02-11T12:10:00")
            .with_bill_type("Dining")
            .with_location("nan", "nan", "USA"),
        Receipt::new(3, "Green Grocer", Decimal::from(70))
            .with_date_time("2023-12-20T17:45:00")
            .with_bill_type("Groceries")
            .with_location("Austin", "TX", "USA"),
    ]
}

impl MockReceiptServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let receipts = sample_receipts();
        let next_id = receipts.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let state = Arc::new(Mutex::new(MockState {
            config,
            receipts,
            next_id,
            session_active: false,
            requests: Vec::new(),
        }));
        let state_clone = state.clone();

        // Non-blocking so the accept loop can notice shutdown
        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let state = state_clone.clone();
                        thread::spawn(move || {
                            handle_connection(stream, &state);
                        });
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            state,
            thread_handle: Some(thread_handle),
        })
    }

    /// Base URL including the API prefix
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}/api/v1", self.port)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.lock().requests.last().cloned()
    }

    /// Receipts currently stored by the mock
    pub fn receipts(&self) -> Vec<Receipt> {
        self.lock().receipts.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockReceiptServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = data[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buffer[..n]);
    }

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

struct MockResponse {
    status: u16,
    body: String,
    set_cookie: Option<String>,
}

impl MockResponse {
    fn json(status: u16, body: JsonValue) -> Self {
        Self::raw(status, body.to_string())
    }

    fn raw(status: u16, body: String) -> Self {
        Self {
            status,
            body,
            set_cookie: None,
        }
    }

    fn with_cookie(mut self, cookie: &str) -> Self {
        self.set_cookie = Some(cookie.to_string());
        self
    }
}

fn handle_connection(mut stream: TcpStream, state: &Arc<Mutex<MockState>>) {
    // Accepted sockets may inherit non-blocking mode on some platforms
    let _ = stream.set_nonblocking(false);

    let Some(request) = read_request(&mut stream) else {
        return;
    };

    let delay_ms = {
        let mut state = state.lock().unwrap_or_else(|p| p.into_inner());
        state.requests.push(request.clone());
        state.config.delay_ms
    };
    if delay_ms > 0 {
        thread::sleep(std::time::Duration::from_millis(delay_ms));
    }

    let response = {
        let mut state = state.lock().unwrap_or_else(|p| p.into_inner());
        route(&mut state, &request)
    };
    send_response(&mut stream, &response);
}

fn route(state: &mut MockState, request: &RecordedRequest) -> MockResponse {
    if state.config.server_error {
        return MockResponse::json(500, json!({"error": "Internal server error"}));
    }

    let (path, _query) = request
        .path
        .split_once('?')
        .unwrap_or((request.path.as_str(), ""));
    let Some(path) = path.strip_prefix("/api/v1") else {
        return MockResponse::json(404, json!({"error": "Not found"}));
    };

    if let Some(auth_path) = path.strip_prefix("/auth") {
        return route_auth(state, request, auth_path);
    }

    if state.config.fail_auth {
        return MockResponse::json(401, json!({"error": "Unauthorized"}));
    }

    let method = request.method.as_str();
    match (method, path) {
        ("GET", "/receipts") => MockResponse::json(200, receipts_json(&state.receipts)),
        ("GET", "/receipts/search") => {
            let query = request.path.split_once('?').map(|(_, q)| q).unwrap_or("");
            let found: Vec<Receipt> = state
                .receipts
                .iter()
                .filter(|r| matches_search(r, query))
                .cloned()
                .collect();
            MockResponse::json(200, receipts_json(&found))
        }
        ("GET", "/receipts/analytics") => {
            if let Some(body) = &state.config.analytics_body {
                return MockResponse::raw(200, body.clone());
            }
            let aggregate = AnalyticsAggregate::from_receipts(&state.receipts);
            MockResponse::json(200, analytics_json(&aggregate))
        }
        ("POST", "/receipt") => handle_upload(state, request),
        ("POST", p) if p.starts_with("/receipts/") => {
            match parse_id(p) {
                Some(id) => handle_update(state, id, &request.body),
                None => MockResponse::json(404, json!({"error": "Not found"})),
            }
        }
        ("DELETE", p) if p.starts_with("/receipts/") => {
            let Some(id) = parse_id(p) else {
                return MockResponse::json(404, json!({"error": "Not found"}));
            };
            let before = state.receipts.len();
            state.receipts.retain(|r| r.id != id);
            if state.receipts.len() == before {
                MockResponse::json(404, json!({"error": "Receipt not found"}))
            } else {
                MockResponse::json(200, json!({"message": "Receipt deleted successfully"}))
            }
        }
        _ => MockResponse::json(404, json!({"error": "Not found"})),
    }
}

fn route_auth(state: &mut MockState, request: &RecordedRequest, path: &str) -> MockResponse {
    let has_session = request
        .header("cookie")
        .is_some_and(|c| c.contains(SESSION_COOKIE));

    match (request.method.as_str(), path) {
        ("GET", "/google") => MockResponse::json(
            200,
            json!({"auth_url": "https://accounts.example.com/o/oauth2/auth?client_id=mock"}),
        ),
        ("GET", "/user") => {
            if has_session && state.session_active {
                MockResponse::json(200, json!({"user": mock_user()}))
            } else {
                MockResponse::json(401, json!({"error": "Not authenticated"}))
            }
        }
        ("POST", "/callback") => {
            let code = serde_json::from_slice::<JsonValue>(&request.body)
                .ok()
                .and_then(|v| v.get("code").and_then(JsonValue::as_str).map(str::to_string));
            if code.as_deref() == Some(VALID_CODE) {
                state.session_active = true;
                MockResponse::json(200, json!({"user": mock_user()}))
                    .with_cookie(&format!("{}; Path=/; HttpOnly", SESSION_COOKIE))
            } else {
                MockResponse::json(400, json!({"error": "Invalid authorization code"}))
            }
        }
        ("POST", "/logout") => {
            state.session_active = false;
            MockResponse::json(200, json!({"message": "Logged out"}))
                .with_cookie("session=; Path=/; Max-Age=0")
        }
        _ => MockResponse::json(404, json!({"error": "Not found"})),
    }
}

fn handle_upload(state: &mut MockState, request: &RecordedRequest) -> MockResponse {
    if state.config.reject_uploads {
        return MockResponse::json(200, json!({"error": "Could not extract receipt data"}));
    }

    let body = String::from_utf8_lossy(&request.body);
    if !body.contains("name=\"image\"") {
        return MockResponse::json(400, json!({"error": "No image file provided"}));
    }

    let id = state.next_id;
    state.next_id += 1;
    let receipt = Receipt::new(id, "Scanned Vendor", Decimal::new(1999, 2))
        .with_date_time("2024-03-01T10:00:00")
        .with_bill_type("Other")
        .with_location("nan", "nan", "nan");
    state.receipts.push(receipt.clone());

    if state.config.echo_records {
        MockResponse::json(200, receipt_json(&receipt))
    } else {
        MockResponse::json(
            200,
            json!({"message": "Data inserted into PostgreSQL successfully!", "receipt_id": id}),
        )
    }
}

fn handle_update(state: &mut MockState, id: i64, body: &[u8]) -> MockResponse {
    let Ok(fields) = serde_json::from_slice::<JsonValue>(body) else {
        return MockResponse::json(400, json!({"error": "Invalid JSON"}));
    };
    let echo = state.config.echo_records;
    let Some(receipt) = state.receipts.iter_mut().find(|r| r.id == id) else {
        return MockResponse::json(200, json!({"error": "Receipt not found"}));
    };

    let mut merged = receipt_json(receipt);
    if let (Some(target), Some(source)) = (merged.as_object_mut(), fields.as_object()) {
        for (key, value) in source {
            if key != "id" {
                target.insert(key.clone(), value.clone());
            }
        }
    }
    match serde_json::from_value::<Receipt>(merged) {
        Ok(updated) => *receipt = updated,
        Err(e) => {
            return MockResponse::json(200, json!({"error": format!("Failed to update receipt: {}", e)}))
        }
    }

    if echo {
        MockResponse::json(200, receipt_json(receipt))
    } else {
        MockResponse::json(200, json!({"message": "Receipt updated successfully"}))
    }
}

fn parse_id(path: &str) -> Option<i64> {
    path.strip_prefix("/receipts/")?.parse().ok()
}

/// Case-insensitive `vendor=` match; other parameters are accepted and ignored
fn matches_search(receipt: &Receipt, query: &str) -> bool {
    url::form_urlencoded::parse(query.as_bytes()).all(|(key, value)| match key.as_ref() {
        "vendor" => receipt
            .vendor_name
            .to_lowercase()
            .contains(&value.to_lowercase()),
        _ => true,
    })
}

fn mock_user() -> JsonValue {
    json!({
        "id": "user-1",
        "email": "ana@example.com",
        "name": "Ana Diaz",
        "picture": null
    })
}

fn amount(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

fn receipt_json(receipt: &Receipt) -> JsonValue {
    json!({
        "id": receipt.id,
        "vendor_name": receipt.vendor_name,
        "total_amount": amount(receipt.total_amount),
        "date_time": receipt.date_time,
        "bill_type": receipt.bill_type,
        "city": receipt.city,
        "state": receipt.state,
        "country": receipt.country,
    })
}

fn receipts_json(receipts: &[Receipt]) -> JsonValue {
    JsonValue::Array(receipts.iter().map(receipt_json).collect())
}

fn analytics_json(aggregate: &AnalyticsAggregate) -> JsonValue {
    let mut summary = serde_json::Map::new();
    for (vendor, totals) in aggregate.vendor_summary.iter() {
        summary.insert(
            vendor.to_string(),
            json!({"count": totals.count, "total": amount(totals.total)}),
        );
    }
    json!({
        "total_spent": amount(aggregate.total_spent),
        "average_amount": amount(aggregate.average_amount.unwrap_or_default()),
        "receipt_count": aggregate.receipt_count,
        "vendor_summary": summary,
    })
}

fn send_response(stream: &mut TcpStream, response: &MockResponse) {
    let status_text = match response.status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    };
    let cookie = response
        .set_cookie
        .as_ref()
        .map(|c| format!("Set-Cookie: {}\r\n", c))
        .unwrap_or_default();
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
        response.status,
        status_text,
        response.body.len(),
        cookie
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(response.body.as_bytes());
    let _ = stream.flush();
}
