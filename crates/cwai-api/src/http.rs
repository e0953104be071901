//! `reqwest`-backed implementation of [`AnalysisApi`].

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use cwai_protocol::{
    Ecosystem, Report, ServiceInfo, Species, TriggerRequest, TriggerResponse, API_V1_PREFIX,
    DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS,
};

use crate::{AnalysisApi, ApiError, ApiFuture};

/// Longest slice of an error body kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root including the version prefix, e.g. `http://127.0.0.1:8000/api/v1`.
    pub base_url: String,
    /// Per-request timeout; `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Some(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
        }
    }
}

/// Which call a response belongs to; decides how error statuses map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    ListEcosystems,
    ListSpecies,
    Trigger,
    GetReport,
    ListReports,
    Health,
}

impl Call {
    fn as_str(&self) -> &'static str {
        match self {
            Call::ListEcosystems => "list ecosystems",
            Call::ListSpecies => "list species",
            Call::Trigger => "trigger analysis",
            Call::GetReport => "get report",
            Call::ListReports => "list reports",
            Call::Health => "health",
        }
    }
}

#[derive(Clone)]
pub struct HttpApiClient {
    http: reqwest::Client,
    base_url: String,
    server_root: String,
}

impl HttpApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let server_root = base_url
            .strip_suffix(API_V1_PREFIX)
            .unwrap_or(&base_url)
            .to_string();

        Ok(Self {
            http,
            base_url,
            server_root,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        call: Call,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await.map_err(|e| {
            let kind = if e.is_timeout() { "timed out" } else { "failed" };
            ApiError::Network(format!("{} request {kind}: {e}", call.as_str()))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ApiError::Network(format!("{} body read failed: {e}", call.as_str()))
        })?;

        if !status.is_success() {
            tracing::debug!(call = call.as_str(), status = status.as_u16(), "Backend returned error status");
            return Err(status_error(call, status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| ApiError::Decode(format!("{}: {e}", call.as_str())))
    }
}

/// Map a non-2xx response to the error the caller should see.
fn status_error(call: Call, status: StatusCode, body: &str) -> ApiError {
    match (call, status) {
        (Call::GetReport, StatusCode::NOT_FOUND) => ApiError::NotFound(error_detail(body)),
        (Call::Trigger, s) if s.is_client_error() => ApiError::Validation {
            status: s.as_u16(),
            detail: error_detail(body),
        },
        (call, status) => ApiError::Network(format!(
            "{} returned HTTP {}: {}",
            call.as_str(),
            status.as_u16(),
            error_detail(body)
        )),
    }
}

/// Pull the `detail` field out of a FastAPI-style error body, else the raw text.
fn error_detail(body: &str) -> String {
    let detail = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => match map.get("detail") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        _ => body.to_string(),
    };
    if detail.chars().count() > MAX_ERROR_BODY_CHARS {
        let cut: String = detail.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{cut}...")
    } else {
        detail
    }
}

impl AnalysisApi for HttpApiClient {
    fn list_ecosystems(&self) -> ApiFuture<'_, Vec<Ecosystem>> {
        Box::pin(async move {
            let request = self.http.get(self.url("/ecosystems/"));
            self.execute(Call::ListEcosystems, request).await
        })
    }

    fn list_species(&self) -> ApiFuture<'_, Vec<Species>> {
        Box::pin(async move {
            let request = self.http.get(self.url("/species/"));
            self.execute(Call::ListSpecies, request).await
        })
    }

    fn trigger_analysis<'a>(
        &'a self,
        request: &'a TriggerRequest,
    ) -> ApiFuture<'a, TriggerResponse> {
        Box::pin(async move {
            tracing::debug!(
                target_type = %request.target_type,
                target_name = %request.target_name,
                target_id = ?request.target_id,
                "Triggering analysis"
            );
            let builder = self.http.post(self.url("/analysis/")).json(request);
            self.execute(Call::Trigger, builder).await
        })
    }

    fn get_report(&self, report_id: i64) -> ApiFuture<'_, Report> {
        Box::pin(async move {
            let request = self.http.get(self.url(&format!("/reports/{report_id}")));
            self.execute(Call::GetReport, request).await
        })
    }

    fn list_reports(&self, skip: u32, limit: u32) -> ApiFuture<'_, Vec<Report>> {
        Box::pin(async move {
            let request = self
                .http
                .get(self.url("/reports/"))
                .query(&[("skip", skip), ("limit", limit)]);
            self.execute(Call::ListReports, request).await
        })
    }

    fn health(&self) -> ApiFuture<'_, ServiceInfo> {
        Box::pin(async move {
            let request = self.http.get(format!("{}/", self.server_root));
            self.execute(Call::Health, request).await
        })
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}
