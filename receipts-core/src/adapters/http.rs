//! Receipt service HTTP client
//!
//! Talks to the receipt service REST API (`/api/v1`). The service answers
//! most failures with HTTP 200 and an `{"error": "..."}` body, so every
//! response is classified on both status code and body shape.
//!
//! Session credentials are a cookie set by the auth callback; the client
//! keeps a cookie store so every request carries it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::domain::result::{Error, Result};
use crate::domain::{
    AnalyticsAggregate, AnalyticsFilter, ImageFile, LoginRedirect, Receipt, Session, User,
};
use crate::ports::{AuthGateway, ReceiptCreated, ReceiptGateway};

/// Default API URL (local development server)
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api/v1";

/// Environment variable to override the receipt service base URL.
pub const RECEIPTS_API_URL_ENV: &str = "RECEIPTS_API_URL";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Get the receipt service base URL, checking environment variable first
pub fn get_base_url() -> String {
    std::env::var(RECEIPTS_API_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

/// Which endpoint a response came from; decides how failures are classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Upload,
    Read,
    Update,
    Delete,
    Auth,
}

impl Endpoint {
    /// Classify an `{"error": ...}` body or a 4xx rejection
    fn rejected(self, message: String) -> Error {
        match self {
            Endpoint::Upload => Error::UploadRejected(message),
            Endpoint::Update if is_not_found(&message) => Error::NotFound(message),
            Endpoint::Update => Error::Validation(message),
            Endpoint::Delete if is_not_found(&message) => Error::NotFound(message),
            Endpoint::Delete | Endpoint::Read => Error::Network(message),
            Endpoint::Auth => Error::Auth(message),
        }
    }
}

fn is_not_found(message: &str) -> bool {
    message.to_lowercase().contains("not found")
}

/// Fields sent on update; the id travels in the path
#[derive(Serialize)]
struct UpdateBody<'a> {
    vendor_name: &'a str,
    total_amount: f64,
    date_time: &'a str,
    bill_type: &'a str,
    city: &'a str,
    state: &'a str,
    country: &'a str,
}

impl<'a> From<&'a Receipt> for UpdateBody<'a> {
    fn from(r: &'a Receipt) -> Self {
        Self {
            vendor_name: &r.vendor_name,
            total_amount: r.total_amount.to_f64().unwrap_or_default(),
            date_time: &r.date_time,
            bill_type: &r.bill_type,
            city: &r.city,
            state: &r.state,
            country: &r.country,
        }
    }
}

/// Receipt service API client
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    /// Create a client for the configured service.
    ///
    /// Uses the `RECEIPTS_API_URL` environment variable if set,
    /// otherwise the local development server.
    pub fn new() -> Result<Self> {
        Self::new_with_base_url(&get_base_url(), DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom base URL and timeout.
    pub fn new_with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(Error::Config("Receipt service URL cannot be empty".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map request errors to the network category
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::network("Request to the receipt service timed out")
        } else if error.is_connect() {
            Error::network("Unable to connect to the receipt service")
        } else {
            Error::network(format!("Receipt service request failed: {}", error))
        }
    }

    /// Read the body, classify the response and return the raw text
    async fn read_text(&self, response: Response, endpoint: Endpoint) -> Result<String> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_request_error(e))?;

        check_response(status, &parse_body(&text), endpoint)?;
        Ok(text)
    }

    /// Read the body and classify the response
    async fn read_response(&self, response: Response, endpoint: Endpoint) -> Result<JsonValue> {
        let text = self.read_text(response, endpoint).await?;
        Ok(parse_body(&text))
    }
}

/// An empty body reads as JSON `null`; a non-JSON body is kept as a string
/// so it can still be reported.
fn parse_body(text: &str) -> JsonValue {
    if text.trim().is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_str(text).unwrap_or_else(|_| JsonValue::String(text.to_string()))
    }
}

/// Status and body classification shared by all endpoints
fn check_response(status: StatusCode, body: &JsonValue, endpoint: Endpoint) -> Result<()> {
    let server_error = body
        .get("error")
        .and_then(JsonValue::as_str)
        .map(str::to_string);

    match status.as_u16() {
        200..=299 => match server_error {
            Some(message) => Err(endpoint.rejected(message)),
            None => Ok(()),
        },
        401 if endpoint == Endpoint::Auth => Err(Error::auth(
            server_error.unwrap_or_else(|| "Authorization was rejected".to_string()),
        )),
        401 => Err(Error::Unauthenticated),
        403 => Err(Error::auth(
            server_error.unwrap_or_else(|| "Access denied".to_string()),
        )),
        404 if endpoint == Endpoint::Read || endpoint == Endpoint::Upload => Err(Error::network(
            "Receipt service endpoint not found",
        )),
        404 => Err(Error::not_found(
            server_error.unwrap_or_else(|| "Receipt not found".to_string()),
        )),
        400 | 413 | 415 | 422 => Err(endpoint.rejected(
            server_error.unwrap_or_else(|| format!("Request rejected: HTTP {}", status.as_u16())),
        )),
        code => Err(Error::network(format!("Receipt service error: HTTP {}", code))),
    }
}

fn parse_receipts(body: JsonValue) -> Result<Vec<Receipt>> {
    serde_json::from_value(body)
        .map_err(|e| Error::network(format!("Unexpected receipts response: {}", e)))
}

/// A body carrying an `id` is a full receipt record
fn parse_echoed_receipt(body: &JsonValue) -> Option<Receipt> {
    body.get("id")?;
    serde_json::from_value(body.clone()).ok()
}

fn parse_created(body: &JsonValue) -> ReceiptCreated {
    let receipt = parse_echoed_receipt(body);
    let receipt_id = body
        .get("receipt_id")
        .and_then(JsonValue::as_i64)
        .or_else(|| receipt.as_ref().map(|r| r.id));
    let message = body
        .get("message")
        .and_then(JsonValue::as_str)
        .map(str::to_string);

    ReceiptCreated {
        receipt_id,
        receipt,
        message,
    }
}

#[async_trait]
impl ReceiptGateway for HttpGateway {
    fn name(&self) -> &str {
        "http"
    }

    async fn upload(&self, image: &ImageFile) -> Result<ReceiptCreated> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(|_| Error::validation(format!("Invalid content type: {}", image.content_type)))?;
        let form = Form::new().part("image", part);

        let response = self
            .client
            .post(self.url("/receipt"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let body = self.read_response(response, Endpoint::Upload).await?;
        Ok(parse_created(&body))
    }

    async fn list_receipts(&self) -> Result<Vec<Receipt>> {
        let response = self
            .client
            .get(self.url("/receipts"))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let body = self.read_response(response, Endpoint::Read).await?;
        parse_receipts(body)
    }

    async fn search_receipts(&self, query: &str) -> Result<Vec<Receipt>> {
        // The query is already encoded; append it verbatim
        let url = format!("{}?{}", self.url("/receipts/search"), query);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let body = self.read_response(response, Endpoint::Read).await?;
        parse_receipts(body)
    }

    async fn update_receipt(&self, id: i64, fields: &Receipt) -> Result<Option<Receipt>> {
        let response = self
            .client
            .post(self.url(&format!("/receipts/{}", id)))
            .json(&UpdateBody::from(fields))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let body = self.read_response(response, Endpoint::Update).await?;
        Ok(parse_echoed_receipt(&body))
    }

    async fn delete_receipt(&self, id: i64) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/receipts/{}", id)))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        self.read_response(response, Endpoint::Delete).await?;
        Ok(())
    }

    async fn fetch_analytics(&self, filter: &AnalyticsFilter) -> Result<AnalyticsAggregate> {
        let query = filter.to_query_string();
        let url = if query.is_empty() {
            self.url("/receipts/analytics")
        } else {
            format!("{}?{}", self.url("/receipts/analytics"), query)
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        // Straight from the text: vendor_summary order breaks ties
        let text = self.read_text(response, Endpoint::Read).await?;
        let aggregate: AnalyticsAggregate = serde_json::from_str(&text)
            .map_err(|e| Error::network(format!("Unexpected analytics response: {}", e)))?;
        Ok(aggregate.normalized())
    }
}

#[async_trait]
impl AuthGateway for HttpGateway {
    async fn login_redirect_url(&self) -> Result<LoginRedirect> {
        let response = self
            .client
            .get(self.url("/auth/google"))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let body = self.read_response(response, Endpoint::Auth).await?;
        serde_json::from_value(body)
            .map_err(|e| Error::auth(format!("Unexpected login response: {}", e)))
    }

    async fn session_user(&self) -> Result<User> {
        let response = self
            .client
            .get(self.url("/auth/user"))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthenticated);
        }

        let body = self.read_response(response, Endpoint::Auth).await?;
        // Either {"user": {...}} or the user object itself
        let user = match body.get("user") {
            Some(JsonValue::Null) => return Err(Error::Unauthenticated),
            Some(user) => user.clone(),
            None if body.is_object() => body,
            None => return Err(Error::Unauthenticated),
        };
        serde_json::from_value(user)
            .map_err(|e| Error::auth(format!("Unexpected session response: {}", e)))
    }

    async fn logout(&self) -> Result<()> {
        let response = self
            .client
            .post(self.url("/auth/logout"))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        self.read_response(response, Endpoint::Auth).await?;
        Ok(())
    }

    async fn exchange_auth_code(&self, code: &str) -> Result<Session> {
        if code.trim().is_empty() {
            return Err(Error::auth("Authorization code missing"));
        }

        let response = self
            .client
            .post(self.url("/auth/callback"))
            .json(&serde_json::json!({ "code": code }))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let body = self.read_response(response, Endpoint::Auth).await?;
        if body.get("user").is_some() {
            serde_json::from_value(body)
                .map_err(|e| Error::auth(format!("Unexpected callback response: {}", e)))
        } else {
            let user: User = serde_json::from_value(body)
                .map_err(|e| Error::auth(format!("Unexpected callback response: {}", e)))?;
            Ok(Session { user, token: None })
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::adapters::mock_server::{MockConfig, MockReceiptServer};

    fn gateway_for(server: &MockReceiptServer) -> HttpGateway {
        HttpGateway::new_with_base_url(&server.base_url(), Duration::from_secs(5)).unwrap()
    }

    fn png() -> ImageFile {
        ImageFile::new("lunch.png", "image/png", vec![0x89, b'P', b'N', b'G', 1, 2, 3])
    }

    #[test]
    fn test_reject_empty_base_url() {
        let result = HttpGateway::new_with_base_url("  ", DEFAULT_TIMEOUT);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let gateway = HttpGateway::new_with_base_url("http://localhost/api/v1/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(gateway.base_url(), "http://localhost/api/v1");
    }

    #[test]
    fn test_check_response_classification() {
        let ok = JsonValue::Null;
        assert!(check_response(StatusCode::NO_CONTENT, &ok, Endpoint::Delete).is_ok());

        let not_found = serde_json::json!({"error": "Receipt not found"});
        assert!(matches!(
            check_response(StatusCode::OK, &not_found, Endpoint::Update),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            check_response(StatusCode::OK, &not_found, Endpoint::Delete),
            Err(Error::NotFound(_))
        ));

        let failed = serde_json::json!({"error": "Failed to update receipt: bad date"});
        assert!(matches!(
            check_response(StatusCode::OK, &failed, Endpoint::Update),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            check_response(StatusCode::OK, &failed, Endpoint::Upload),
            Err(Error::UploadRejected(_))
        ));
        assert!(matches!(
            check_response(StatusCode::OK, &failed, Endpoint::Read),
            Err(Error::Network(_))
        ));

        assert!(matches!(
            check_response(StatusCode::NOT_FOUND, &ok, Endpoint::Delete),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            check_response(StatusCode::UNAUTHORIZED, &ok, Endpoint::Read),
            Err(Error::Unauthenticated)
        ));
        assert!(matches!(
            check_response(StatusCode::UNAUTHORIZED, &ok, Endpoint::Auth),
            Err(Error::Auth(_))
        ));
        assert!(matches!(
            check_response(StatusCode::BAD_GATEWAY, &ok, Endpoint::Update),
            Err(Error::Network(_))
        ));
    }

    #[test]
    fn test_parse_created_variants() {
        let created = parse_created(&serde_json::json!({
            "message": "Data inserted into PostgreSQL successfully!",
            "receipt_id": 12
        }));
        assert_eq!(created.receipt_id, Some(12));
        assert!(created.receipt.is_none());

        let echoed = parse_created(&serde_json::json!({
            "id": 13, "vendor_name": "Deli", "total_amount": 8.25
        }));
        assert_eq!(echoed.receipt_id, Some(13));
        assert_eq!(echoed.receipt.unwrap().vendor_name, "Deli");
    }

    #[tokio::test]
    async fn test_list_and_search() {
        let server = MockReceiptServer::start(MockConfig::default()).unwrap();
        let gateway = gateway_for(&server);

        let receipts = gateway.list_receipts().await.unwrap();
        assert_eq!(receipts.len(), 3);
        assert_eq!(receipts[0].id, 1);

        let found = gateway.search_receipts("vendor=cafe").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].vendor_name, "Blue Cafe");

        let request = server.last_request().unwrap();
        assert_eq!(request.path, "/api/v1/receipts/search?vendor=cafe");
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_image_field() {
        let server = MockReceiptServer::start(MockConfig::default()).unwrap();
        let gateway = gateway_for(&server);

        let created = gateway.upload(&png()).await.unwrap();
        assert_eq!(created.receipt_id, Some(4));
        assert!(created.receipt.is_none());

        let request = server.last_request().unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/api/v1/receipt");
        let body = String::from_utf8_lossy(&request.body);
        assert!(body.contains("name=\"image\""));
        assert!(body.contains("filename=\"lunch.png\""));
        assert!(body.contains("image/png"));
    }

    #[tokio::test]
    async fn test_upload_rejected_by_server() {
        let server = MockReceiptServer::start(MockConfig {
            reject_uploads: true,
            ..Default::default()
        })
        .unwrap();
        let gateway = gateway_for(&server);

        let result = gateway.upload(&png()).await;
        assert!(matches!(result, Err(Error::UploadRejected(_))));
    }

    #[tokio::test]
    async fn test_update_confirmation_and_echo() {
        let server = MockReceiptServer::start(MockConfig::default()).unwrap();
        let gateway = gateway_for(&server);

        let mut receipt = gateway.list_receipts().await.unwrap().remove(0);
        receipt.vendor_name = "Renamed".to_string();
        receipt.total_amount = Decimal::new(1250, 2);

        let echoed = gateway.update_receipt(receipt.id, &receipt).await.unwrap();
        assert!(echoed.is_none());

        let body: JsonValue = serde_json::from_slice(&server.last_request().unwrap().body).unwrap();
        assert_eq!(body["vendor_name"], "Renamed");
        assert_eq!(body["total_amount"], serde_json::json!(12.5));
        assert!(body.get("id").is_none());

        let echo_server = MockReceiptServer::start(MockConfig {
            echo_records: true,
            ..Default::default()
        })
        .unwrap();
        let echo_gateway = gateway_for(&echo_server);
        let echoed = echo_gateway.update_receipt(receipt.id, &receipt).await.unwrap();
        assert_eq!(echoed.unwrap().vendor_name, "Renamed");
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_receipt() {
        let server = MockReceiptServer::start(MockConfig::default()).unwrap();
        let gateway = gateway_for(&server);

        let ghost = Receipt::new(404, "Ghost", Decimal::ONE);
        assert!(matches!(
            gateway.update_receipt(404, &ghost).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(gateway.delete_receipt(404).await, Err(Error::NotFound(_))));

        gateway.delete_receipt(2).await.unwrap();
        let remaining = gateway.list_receipts().await.unwrap();
        assert!(remaining.iter().all(|r| r.id != 2));
    }

    #[tokio::test]
    async fn test_fetch_analytics_with_filter() {
        let server = MockReceiptServer::start(MockConfig::default()).unwrap();
        let gateway = gateway_for(&server);

        let aggregate = gateway.fetch_analytics(&AnalyticsFilter::default()).await.unwrap();
        assert_eq!(aggregate.receipt_count, 3);
        assert_eq!(aggregate.total_spent, Decimal::from(210));
        assert_eq!(aggregate.top_vendor(), Some("Green Grocer"));

        let filter = AnalyticsFilter {
            year: Some(2024),
            ..Default::default()
        };
        gateway.fetch_analytics(&filter).await.unwrap();
        assert_eq!(
            server.last_request().unwrap().path,
            "/api/v1/receipts/analytics?year=2024"
        );
    }

    #[tokio::test]
    async fn test_fetch_analytics_keeps_payload_vendor_order() {
        let server = MockReceiptServer::start(MockConfig {
            analytics_body: Some(
                r#"{"total_spent": 720.0, "average_amount": 240.0, "receipt_count": 3,
                    "vendor_summary": {
                        "Zeta": {"count": 1, "total": 300.0},
                        "Alpha": {"count": 1, "total": 300.0},
                        "Mid": {"count": 1, "total": 120.0}}}"#
                    .to_string(),
            ),
            ..Default::default()
        })
        .unwrap();
        let gateway = gateway_for(&server);

        let aggregate = gateway.fetch_analytics(&AnalyticsFilter::default()).await.unwrap();
        let order: Vec<&str> = aggregate.vendor_summary.iter().map(|(v, _)| v).collect();
        assert_eq!(order, vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(aggregate.top_vendor(), Some("Zeta"));
    }

    #[tokio::test]
    async fn test_unauthorized_receipt_endpoints() {
        let server = MockReceiptServer::start(MockConfig {
            fail_auth: true,
            ..Default::default()
        })
        .unwrap();
        let gateway = gateway_for(&server);

        assert!(matches!(gateway.list_receipts().await, Err(Error::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_server_errors_are_network_failures() {
        let server = MockReceiptServer::start(MockConfig {
            server_error: true,
            ..Default::default()
        })
        .unwrap();
        let gateway = gateway_for(&server);

        assert!(matches!(gateway.list_receipts().await, Err(Error::Network(_))));
        assert!(matches!(
            gateway.fetch_analytics(&AnalyticsFilter::default()).await,
            Err(Error::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_failure() {
        let gateway =
            HttpGateway::new_with_base_url("http://127.0.0.1:1/api/v1", Duration::from_secs(2)).unwrap();
        assert!(matches!(gateway.list_receipts().await, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_auth_cookie_flow() {
        let server = MockReceiptServer::start(MockConfig::default()).unwrap();
        let gateway = gateway_for(&server);

        let redirect = gateway.login_redirect_url().await.unwrap();
        assert!(redirect.auth_url.starts_with("https://"));

        assert!(matches!(gateway.session_user().await, Err(Error::Unauthenticated)));
        assert!(matches!(
            gateway.exchange_auth_code("wrong").await,
            Err(Error::Auth(_))
        ));

        let session = gateway.exchange_auth_code("valid-code").await.unwrap();
        assert_eq!(session.user.email, "ana@example.com");

        // Session cookie from the callback is sent automatically
        let user = gateway.session_user().await.unwrap();
        assert_eq!(user.email, "ana@example.com");

        gateway.logout().await.unwrap();
        assert!(matches!(gateway.session_user().await, Err(Error::Unauthenticated)));
    }
}
