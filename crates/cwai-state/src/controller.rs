//! Analysis lifecycle controller.
//!
//! ```text
//! Idle ──submit──▶ Submitting ──report id──▶ AwaitingReport ──report──▶ Done
//!                      │                            │
//!                      └──────────error─────────────┴──────────────▶ Failed
//! ```
//!
//! Every submission takes a fresh sequence number. Responses carrying an
//! older number are dropped, so whatever is shown always belongs to the most
//! recent request, regardless of the order responses arrive in.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cwai_api::{AnalysisApi, ApiError};
use cwai_protocol::{
    Catalog, Report, TriggerRequest, TriggerResponse, ANALYSIS_FAILED_MSG,
    INITIAL_LOAD_FAILED_MSG,
};

use crate::form::{FieldErrors, FormState, SelectionError};
use crate::resolve::RemoteCatalog;

/// Recent reports kept for the sidebar.
const MAX_RECENT_REPORTS: usize = 10;

/// Where the current analysis is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting,
    AwaitingReport { report_id: i64 },
    Done,
    Failed,
}

/// State of the backend catalogs used for target-id resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogStatus {
    Loading,
    Ready(RemoteCatalog),
    Failed,
}

/// The single banner message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UserError {
    #[error("{}", INITIAL_LOAD_FAILED_MSG)]
    InitialLoad,
    #[error("{}", ANALYSIS_FAILED_MSG)]
    Analysis,
    #[error("Report {0} could not be loaded.")]
    ReportUnavailable(i64),
}

/// Why a submission was not sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("form has {} invalid field(s)", .0.len())]
    Invalid(FieldErrors),
    #[error("{}", INITIAL_LOAD_FAILED_MSG)]
    CatalogUnavailable,
}

/// Handle on one issued request. Lets a background task check whether a
/// newer request has superseded it before doing more work.
#[derive(Debug, Clone)]
pub struct Ticket {
    seq: u64,
    latest: Arc<AtomicU64>,
}

impl Ticket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.seq
    }
}

/// A validated submission ready to be sent.
#[derive(Debug, Clone)]
pub struct Submission {
    pub ticket: Ticket,
    pub request: TriggerRequest,
}

pub struct AnalysisController {
    catalog: Catalog,
    form: FormState,
    remote: CatalogStatus,
    phase: Phase,
    result: Option<Report>,
    error: Option<UserError>,
    recent: Vec<Report>,
    opening_existing: bool,
    latest: Arc<AtomicU64>,
    catalog_seq: u64,
}

impl AnalysisController {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            form: FormState::new(),
            remote: CatalogStatus::Loading,
            phase: Phase::Idle,
            result: None,
            error: None,
            recent: Vec::new(),
            opening_existing: false,
            latest: Arc::new(AtomicU64::new(0)),
            catalog_seq: 0,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }

    pub fn select_ecosystem(&mut self, id: &str) -> Result<(), SelectionError> {
        self.form.select_ecosystem(&self.catalog, id)
    }

    pub fn select_species(&mut self, id: &str) -> Result<(), SelectionError> {
        self.form.select_species(&self.catalog, id)
    }

    pub fn remote_catalog(&self) -> &CatalogStatus {
        &self.remote
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Submitting | Phase::AwaitingReport { .. })
    }

    pub fn result(&self) -> Option<&Report> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<UserError> {
        self.error
    }

    pub fn recent_reports(&self) -> &[Report] {
        &self.recent
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    fn issue_ticket(&mut self) -> Ticket {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket {
            seq,
            latest: Arc::clone(&self.latest),
        }
    }

    fn is_stale(&self, seq: u64, what: &'static str) -> bool {
        let latest = self.latest_seq();
        if seq != latest {
            tracing::debug!(seq, latest, what, "Discarding stale response");
            return true;
        }
        false
    }

    pub fn catalog_seq(&self) -> u64 {
        self.catalog_seq
    }

    /// Start a catalog fetch. Results tagged with an older sequence are ignored.
    pub fn begin_catalog_load(&mut self) -> u64 {
        self.catalog_seq += 1;
        self.remote = CatalogStatus::Loading;
        self.catalog_seq
    }

    fn is_stale_catalog(&self, seq: u64) -> bool {
        if seq != self.catalog_seq {
            tracing::debug!(seq, latest = self.catalog_seq, "Discarding stale catalog response");
            return true;
        }
        false
    }

    pub fn catalogs_loaded(&mut self, seq: u64, remote: RemoteCatalog) {
        if self.is_stale_catalog(seq) {
            return;
        }
        tracing::info!(
            ecosystems = remote.ecosystems.len(),
            species = remote.species.len(),
            "Backend catalogs loaded"
        );
        self.remote = CatalogStatus::Ready(remote);
        if self.error == Some(UserError::InitialLoad) {
            self.error = None;
        }
    }

    pub fn catalogs_failed(&mut self, seq: u64, error: &ApiError) {
        if self.is_stale_catalog(seq) {
            return;
        }
        tracing::warn!(error = %error, "Failed to load backend catalogs");
        self.remote = CatalogStatus::Failed;
        self.error = Some(UserError::InitialLoad);
    }

    /// Validate the form and start a submission.
    ///
    /// Clears the previous result and banner, enters `Submitting`, and
    /// returns the trigger payload to send. A submission while another is in
    /// flight supersedes it.
    pub fn begin_submit(&mut self) -> Result<Submission, SubmitError> {
        if self.remote == CatalogStatus::Failed {
            self.error = Some(UserError::InitialLoad);
            return Err(SubmitError::CatalogUnavailable);
        }

        let query = self.form.submit().map_err(SubmitError::Invalid)?;

        let target_id = match &self.remote {
            CatalogStatus::Ready(remote) => remote.resolve_target_id(query.target(), &self.catalog),
            _ => None,
        };
        if target_id.is_none() {
            tracing::warn!(
                target_type = %query.analysis_type(),
                target_name = %query.target().name(),
                "No backend id matches the selection; sending name only"
            );
        }

        let ticket = self.issue_ticket();
        self.phase = Phase::Submitting;
        self.opening_existing = false;
        self.result = None;
        self.error = None;

        tracing::info!(
            seq = ticket.seq(),
            target_type = %query.analysis_type(),
            target_name = %query.target().name(),
            "Analysis submitted"
        );

        Ok(Submission {
            request: TriggerRequest::from_query(&query, target_id),
            ticket,
        })
    }

    /// Start loading an existing report by id.
    pub fn begin_open_report(&mut self, report_id: i64) -> Ticket {
        let ticket = self.issue_ticket();
        self.phase = Phase::AwaitingReport { report_id };
        self.opening_existing = true;
        self.result = None;
        self.error = None;
        ticket
    }

    /// Trigger call succeeded. Returns the report id to fetch, or `None` when
    /// the response is stale.
    pub fn trigger_succeeded(&mut self, seq: u64, response: TriggerResponse) -> Option<i64> {
        if self.is_stale(seq, "trigger") || self.phase != Phase::Submitting {
            return None;
        }
        tracing::info!(seq, report_id = response.report_id, message = %response.message, "Analysis accepted");
        self.phase = Phase::AwaitingReport {
            report_id: response.report_id,
        };
        Some(response.report_id)
    }

    /// Report fetch succeeded; the report is stored exactly as returned.
    pub fn report_received(&mut self, seq: u64, report: Report) {
        if self.is_stale(seq, "report") {
            return;
        }
        if !matches!(self.phase, Phase::AwaitingReport { .. }) {
            return;
        }
        tracing::info!(seq, report_id = report.id, "Report received");
        self.remember(&report);
        self.result = Some(report);
        self.error = None;
        self.phase = Phase::Done;
    }

    /// Either call failed.
    pub fn request_failed(&mut self, seq: u64, error: &ApiError) {
        if self.is_stale(seq, "failure") {
            return;
        }
        let user_error = match self.phase {
            Phase::AwaitingReport { report_id } if self.opening_existing => {
                UserError::ReportUnavailable(report_id)
            }
            _ => UserError::Analysis,
        };
        tracing::warn!(seq, phase = ?self.phase, error = %error, "Analysis request failed");
        self.phase = Phase::Failed;
        self.result = None;
        self.error = Some(user_error);
    }

    pub fn recent_reports_loaded(&mut self, reports: Vec<Report>) {
        self.recent = reports;
        self.recent.sort_by(|a, b| b.id.cmp(&a.id));
        self.recent.truncate(MAX_RECENT_REPORTS);
    }

    fn remember(&mut self, report: &Report) {
        self.recent.retain(|r| r.id != report.id);
        self.recent.insert(0, report.clone());
        self.recent.truncate(MAX_RECENT_REPORTS);
    }

    /// Clear the form, result and analysis banner; in-flight responses become stale.
    pub fn reset(&mut self) {
        self.form.reset();
        self.issue_ticket();
        self.phase = Phase::Idle;
        self.result = None;
        if self.error != Some(UserError::InitialLoad) {
            self.error = None;
        }
    }

    /// Run a whole submission inline: trigger, then fetch the report.
    pub async fn run_analysis(&mut self, api: &dyn AnalysisApi) -> Result<(), SubmitError> {
        let Submission { ticket, request } = self.begin_submit()?;
        let seq = ticket.seq();

        match api.trigger_analysis(&request).await {
            Ok(response) => {
                if let Some(report_id) = self.trigger_succeeded(seq, response) {
                    match api.get_report(report_id).await {
                        Ok(report) => self.report_received(seq, report),
                        Err(e) => self.request_failed(seq, &e),
                    }
                }
            }
            Err(e) => self.request_failed(seq, &e),
        }
        Ok(())
    }
}
