//! Mock policy decision point built on wiremock.

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Path the single-resource check is served on.
pub const CHECK_PATH: &str = "/api/check";
/// Path the batch check is served on.
pub const BATCH_PATH: &str = "/api/check/batch";

/// HTTP PDP double speaking the gateway's JSON contract.
pub struct MockPdp {
    server: MockServer,
}

impl MockPdp {
    /// Start a new mock PDP.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL to hand to the HTTP decision client.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Access the underlying MockServer.
    pub fn inner(&self) -> &MockServer {
        &self.server
    }

    /// Answer single checks for `resource_id` with `allowed_actions`.
    pub async fn decide(&self, resource_id: &str, allowed_actions: &[&str]) {
        Mock::given(method("POST"))
            .and(path(CHECK_PATH))
            .and(body_partial_json(json!({ "resource": { "id": resource_id } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resource_id": resource_id,
                "allowed_actions": allowed_actions,
            })))
            .mount(&self.server)
            .await;
    }

    /// Same as [`MockPdp::decide`] but answering after `delay`.
    pub async fn decide_after(&self, resource_id: &str, allowed_actions: &[&str], delay: Duration) {
        Mock::given(method("POST"))
            .and(path(CHECK_PATH))
            .and(body_partial_json(json!({ "resource": { "id": resource_id } })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "resource_id": resource_id,
                        "allowed_actions": allowed_actions,
                    }))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Answer batch checks with a raw `results` value (list or keyed object).
    pub async fn batch(&self, results: Value) {
        Mock::given(method("POST"))
            .and(path(BATCH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": results })))
            .mount(&self.server)
            .await;
    }

    /// Answer every request on `endpoint` with a raw body.
    pub async fn raw(&self, endpoint: &str, status: u16, body: &str) {
        Mock::given(method("POST"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Fail every request with `status`.
    pub async fn fail_all(&self, status: u16) {
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({ "error": "unavailable" })),
            )
            .mount(&self.server)
            .await;
    }

    /// Number of requests received on `endpoint`.
    pub async fn received(&self, endpoint: &str) -> usize {
        self.requests()
            .await
            .iter()
            .filter(|r| r.url.path() == endpoint)
            .count()
    }

    /// Bodies of requests received on `endpoint`, parsed as JSON.
    pub async fn bodies(&self, endpoint: &str) -> Vec<Value> {
        self.requests()
            .await
            .iter()
            .filter(|r| r.url.path() == endpoint)
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }

    async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}
