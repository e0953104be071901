//! Client side of the Climate & Wildlife AI backend contract.
//!
//! [`AnalysisApi`] abstracts the backend so the dashboard can run against the
//! live HTTP service ([`HttpApiClient`]) or fully offline ([`FixtureApi`]).
//! Every call is a single request/response: no retries, no caching.

pub mod fixture;
pub mod http;

use std::future::Future;
use std::pin::Pin;

use cwai_protocol::{Ecosystem, Report, ServiceInfo, Species, TriggerRequest, TriggerResponse};

pub use fixture::FixtureApi;
pub use http::{ClientConfig, HttpApiClient};

/// Errors surfaced by an [`AnalysisApi`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Transport failure, timeout, or an unexpected non-2xx status.
    #[error("network error: {0}")]
    Network(String),
    /// The server rejected the request (4xx on analysis trigger).
    #[error("validation error (HTTP {status}): {detail}")]
    Validation { status: u16, detail: String },
    /// The requested resource does not exist (404 on report fetch).
    #[error("not found: {0}")]
    NotFound(String),
    /// The body was not the JSON shape we expected.
    #[error("malformed response: {0}")]
    Decode(String),
}

pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// The backend operations the dashboard relies on.
pub trait AnalysisApi: Send + Sync {
    /// `GET /ecosystems/`
    fn list_ecosystems(&self) -> ApiFuture<'_, Vec<Ecosystem>>;

    /// `GET /species/`
    fn list_species(&self) -> ApiFuture<'_, Vec<Species>>;

    /// `POST /analysis/` - starts report generation.
    fn trigger_analysis<'a>(&'a self, request: &'a TriggerRequest)
        -> ApiFuture<'a, TriggerResponse>;

    /// `GET /reports/{id}`
    fn get_report(&self, report_id: i64) -> ApiFuture<'_, Report>;

    /// `GET /reports/?skip=&limit=`
    fn list_reports(&self, skip: u32, limit: u32) -> ApiFuture<'_, Vec<Report>>;

    /// `GET /` on the server root.
    fn health(&self) -> ApiFuture<'_, ServiceInfo>;

    /// Human-readable description of where requests go.
    fn describe(&self) -> String;
}
