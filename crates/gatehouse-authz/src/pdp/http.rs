//! Decision client speaking JSON over HTTP to a remote PDP.

use crate::client::DecisionClient;
use crate::correlate::RequestIndex;
use crate::decision::{AuthzRequest, Decision, DecisionPayload};
use crate::error::{AuthzError, AuthzResult};
use async_trait::async_trait;
use gatehouse_common_http::{parse_json, HttpClient, HttpConfig, RequestBuilder, ResponseError};
use gatehouse_common_log::spans::pdp_span;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn, Instrument};

/// Default path for single-resource checks.
pub const DEFAULT_CHECK_PATH: &str = "/api/check";
/// Default path for batched checks.
pub const DEFAULT_BATCH_PATH: &str = "/api/check/batch";

/// Settings for [`HttpDecisionClient`].
#[derive(Debug, Clone)]
pub struct HttpPdpConfig {
    /// PDP base URL, e.g. `http://localhost:3592`.
    pub base_url: String,
    pub check_path: String,
    pub batch_path: String,
    /// Policy playground instance to evaluate against instead of deployed policies.
    pub playground_instance: Option<String>,
    /// Connection pool and timeout settings.
    pub http: HttpConfig,
}

impl HttpPdpConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            check_path: DEFAULT_CHECK_PATH.to_string(),
            batch_path: DEFAULT_BATCH_PATH.to_string(),
            playground_instance: None,
            http: HttpConfig::default(),
        }
    }
}

#[derive(Serialize)]
struct BatchCheckRequest<'a> {
    requests: &'a [AuthzRequest],
}

#[derive(Deserialize)]
struct BatchCheckResponse {
    results: BatchResults,
}

/// Batch answers come either as a list of decisions or keyed by resource id.
#[derive(Deserialize)]
#[serde(untagged)]
enum BatchResults {
    List(Vec<DecisionPayload>),
    Keyed(BTreeMap<String, Vec<String>>),
}

impl BatchResults {
    fn into_payloads(self) -> Vec<DecisionPayload> {
        match self {
            Self::List(payloads) => payloads,
            Self::Keyed(map) => map
                .into_iter()
                .map(|(resource_id, allowed_actions)| DecisionPayload {
                    resource_id,
                    allowed_actions,
                })
                .collect(),
        }
    }
}

/// HTTP adapter for a remote policy decision point.
#[derive(Debug, Clone)]
pub struct HttpDecisionClient {
    http: HttpClient,
    requests: RequestBuilder,
    check_path: String,
    batch_path: String,
}

impl HttpDecisionClient {
    pub fn new(config: HttpPdpConfig) -> AuthzResult<Self> {
        let http = HttpClient::with_config(config.http)?;
        let mut requests = RequestBuilder::new().base_url(config.base_url).json_content();
        if let Some(instance) = &config.playground_instance {
            requests = requests.playground_instance(instance);
        }

        Ok(Self {
            http,
            requests,
            check_path: config.check_path,
            batch_path: config.batch_path,
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> AuthzResult<R>
    where
        B: Serialize + ?Sized + Sync,
        R: serde::de::DeserializeOwned + Send,
    {
        let url = self.requests.url(path);
        let response = self
            .http
            .post_json_with_headers(&url, body, self.requests.headers().clone())
            .await?;
        let response = HttpClient::check_response(response).await?;

        parse_json(response).await.map_err(|err| match err {
            ResponseError::Read(source) => {
                AuthzError::transport_with("failed to read PDP response", source)
            }
            parse @ ResponseError::Parse { .. } => {
                warn!(url = %url, error = %parse, "PDP returned an unparseable body");
                AuthzError::malformed(parse.to_string())
            }
        })
    }
}

#[async_trait]
impl DecisionClient for HttpDecisionClient {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn check_one(&self, request: &AuthzRequest) -> AuthzResult<Decision> {
        async {
            debug!(resource_id = %request.resource().id(), "checking resource");
            let payload: DecisionPayload = self.post(&self.check_path, request).await?;
            Decision::from_payload(request, payload)
        }
        .instrument(pdp_span(self.name(), 1))
        .await
    }

    async fn check_many(&self, requests: &[AuthzRequest]) -> AuthzResult<Vec<Decision>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let index = RequestIndex::build(requests)?;

        async {
            debug!(count = requests.len(), "checking resource batch");
            let response: BatchCheckResponse =
                self.post(&self.batch_path, &BatchCheckRequest { requests }).await?;

            let mut seen = HashSet::new();
            let mut decisions = Vec::with_capacity(requests.len());
            for payload in response.results.into_payloads() {
                let request = index.get(&payload.resource_id).ok_or_else(|| {
                    AuthzError::malformed(format!(
                        "decision for resource `{}` that was not requested",
                        payload.resource_id
                    ))
                })?;
                if !seen.insert(payload.resource_id.clone()) {
                    return Err(AuthzError::malformed(format!(
                        "more than one decision for resource `{}`",
                        payload.resource_id
                    )));
                }
                decisions.push(Decision::from_payload(request, payload)?);
            }

            if decisions.len() < requests.len() {
                debug!(
                    requested = requests.len(),
                    answered = decisions.len(),
                    "PDP answered part of the batch"
                );
            }
            Ok(decisions)
        }
        .instrument(pdp_span(self.name(), requests.len()))
        .await
    }
}
