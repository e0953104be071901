//! Async drivers that run API calls off the event loop and report back as
//! [`AnalysisEvent`]s, each tagged with the sequence of the request that
//! produced it.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use cwai_api::{AnalysisApi, ApiError};
use cwai_protocol::{Report, TriggerResponse};

use crate::controller::{AnalysisController, Submission, Ticket};
use crate::resolve::RemoteCatalog;

/// Outcome of a background API call.
#[derive(Debug, Clone)]
pub enum AnalysisEvent {
    CatalogsLoaded { seq: u64, remote: RemoteCatalog },
    CatalogsFailed { seq: u64, error: ApiError },
    Triggered { seq: u64, response: TriggerResponse },
    ReportFetched { seq: u64, report: Report },
    Failed { seq: u64, error: ApiError },
    RecentReports(Result<Vec<Report>, ApiError>),
}

impl AnalysisController {
    /// Fold a background event into the controller state.
    pub fn apply(&mut self, event: AnalysisEvent) {
        match event {
            AnalysisEvent::CatalogsLoaded { seq, remote } => self.catalogs_loaded(seq, remote),
            AnalysisEvent::CatalogsFailed { seq, error } => self.catalogs_failed(seq, &error),
            AnalysisEvent::Triggered { seq, response } => {
                self.trigger_succeeded(seq, response);
            }
            AnalysisEvent::ReportFetched { seq, report } => self.report_received(seq, report),
            AnalysisEvent::Failed { seq, error } => self.request_failed(seq, &error),
            AnalysisEvent::RecentReports(Ok(reports)) => self.recent_reports_loaded(reports),
            AnalysisEvent::RecentReports(Err(error)) => {
                tracing::debug!(error = %error, "Could not list recent reports");
            }
        }
    }
}

/// Fetch both backend catalogs concurrently.
pub async fn load_catalogs(api: &dyn AnalysisApi) -> Result<RemoteCatalog, ApiError> {
    let (ecosystems, species) = tokio::try_join!(api.list_ecosystems(), api.list_species())?;
    Ok(RemoteCatalog::new(ecosystems, species))
}

/// Page size used while scanning for the newest reports.
const REPORT_SCAN_PAGE: u32 = 100;

/// Fetch the `limit` newest reports, highest id first.
///
/// The backend pages in ascending id order, so every page is read and only
/// the newest `limit` are kept.
pub async fn load_recent_reports(api: &dyn AnalysisApi, limit: u32) -> Result<Vec<Report>, ApiError> {
    let keep = limit as usize;
    let mut newest: Vec<Report> = Vec::new();
    let mut skip = 0u32;
    loop {
        let page = api.list_reports(skip, REPORT_SCAN_PAGE).await?;
        let fetched = page.len() as u32;
        newest.extend(page);
        newest.sort_by(|a, b| b.id.cmp(&a.id));
        newest.truncate(keep);
        if fetched < REPORT_SCAN_PAGE {
            break;
        }
        skip += fetched;
    }
    Ok(newest)
}

/// Trigger the analysis, then fetch its report, sending an event after each step.
///
/// If a newer request supersedes this one after the trigger returns, the
/// report fetch is skipped.
pub async fn drive_submission(
    api: Arc<dyn AnalysisApi>,
    submission: Submission,
    events: UnboundedSender<AnalysisEvent>,
) {
    let Submission { ticket, request } = submission;
    let seq = ticket.seq();

    let response = match api.trigger_analysis(&request).await {
        Ok(response) => response,
        Err(error) => {
            let _ = events.send(AnalysisEvent::Failed { seq, error });
            return;
        }
    };

    let report_id = response.report_id;
    if events.send(AnalysisEvent::Triggered { seq, response }).is_err() {
        return;
    }

    if !ticket.is_current() {
        tracing::debug!(seq, report_id, "Submission superseded; skipping report fetch");
        return;
    }

    fetch_report(api, ticket, report_id, events).await;
}

/// Fetch one report and send the outcome.
pub async fn fetch_report(
    api: Arc<dyn AnalysisApi>,
    ticket: Ticket,
    report_id: i64,
    events: UnboundedSender<AnalysisEvent>,
) {
    let seq = ticket.seq();
    let event = match api.get_report(report_id).await {
        Ok(report) => AnalysisEvent::ReportFetched { seq, report },
        Err(error) => AnalysisEvent::Failed { seq, error },
    };
    let _ = events.send(event);
}
