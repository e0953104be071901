use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::sync::mpsc;

use cwai_api::{AnalysisApi, ApiError, ApiFuture, FixtureApi};
use cwai_protocol::*;
use cwai_state::*;

/// Backend double with scripted answers that records every trigger payload.
struct ScriptedApi {
    trigger: Result<TriggerResponse, ApiError>,
    report: Result<Report, ApiError>,
    catalogs_fail: bool,
    sent: Mutex<Vec<TriggerRequest>>,
}

impl ScriptedApi {
    fn ok(report_id: i64) -> Self {
        Self {
            trigger: Ok(TriggerResponse {
                report_id,
                message: "Analysis complete and report generated.".into(),
            }),
            report: Ok(sample_report(report_id)),
            catalogs_fail: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    fn sent(&self) -> Vec<TriggerRequest> {
        self.sent.lock().unwrap().clone()
    }
}

impl AnalysisApi for ScriptedApi {
    fn list_ecosystems(&self) -> ApiFuture<'_, Vec<Ecosystem>> {
        Box::pin(async move {
            if self.catalogs_fail {
                return Err(ApiError::Network("connection refused".into()));
            }
            Ok(vec![Ecosystem {
                id: 1,
                name: "Arctic Terrestrial Systems".into(),
                kind: "terrestrial".into(),
                subtype: None,
                description: None,
            }])
        })
    }

    fn list_species(&self) -> ApiFuture<'_, Vec<Species>> {
        Box::pin(async move {
            Ok(vec![Species {
                id: 5,
                scientific_name: "Ursus maritimus".into(),
                common_name: Some("Polar Bear".into()),
                conservation_status: None,
                climate_sensitivity: None,
            }])
        })
    }

    fn trigger_analysis<'a>(
        &'a self,
        request: &'a TriggerRequest,
    ) -> ApiFuture<'a, TriggerResponse> {
        Box::pin(async move {
            self.sent.lock().unwrap().push(request.clone());
            self.trigger.clone()
        })
    }

    fn get_report(&self, report_id: i64) -> ApiFuture<'_, Report> {
        Box::pin(async move {
            match &self.report {
                Ok(report) if report.id == report_id => Ok(report.clone()),
                Ok(_) => Err(ApiError::NotFound("Report not found".into())),
                Err(e) => Err(e.clone()),
            }
        })
    }

    fn list_reports(&self, _skip: u32, _limit: u32) -> ApiFuture<'_, Vec<Report>> {
        Box::pin(async move { Ok(self.report.clone().into_iter().collect()) })
    }

    fn health(&self) -> ApiFuture<'_, ServiceInfo> {
        Box::pin(async move {
            Ok(ServiceInfo {
                message: "ok".into(),
                docs_url: None,
            })
        })
    }

    fn describe(&self) -> String {
        "scripted".into()
    }
}

fn sample_report(id: i64) -> Report {
    Report {
        id,
        report_type: Some("threats to arctic".into()),
        query_parameters: Some(json!({"query": "threats to arctic"})),
        analysis_results: Some(json!({"raw_text": "Sea ice is declining."})),
        predictions: Some(json!({})),
        citations: Some(json!({})),
        confidence_scores: Some(json!({"overall": 0.8})),
        ai_model_version: Some("Pi-3.1".into()),
        generated_at: Some("2024-05-01T10:00:00".into()),
    }
}

fn filled_controller() -> AnalysisController {
    let mut controller = AnalysisController::new(Catalog::builtin());
    controller.form_mut().set_query("threats to arctic");
    controller.select_ecosystem("arctic-terrestrial").unwrap();
    controller
}

async fn with_catalogs(api: &dyn AnalysisApi) -> AnalysisController {
    let mut controller = filled_controller();
    let seq = controller.begin_catalog_load();
    match load_catalogs(api).await {
        Ok(remote) => controller.catalogs_loaded(seq, remote),
        Err(e) => controller.catalogs_failed(seq, &e),
    }
    controller
}

#[tokio::test]
async fn test_arctic_scenario_end_to_end() {
    let api = ScriptedApi::ok(42);
    let mut controller = with_catalogs(&api).await;

    controller.run_analysis(&api).await.unwrap();

    assert_eq!(
        api.sent(),
        vec![TriggerRequest {
            query: "threats to arctic".into(),
            target_type: AnalysisType::Ecosystem,
            target_name: "arctic-terrestrial".into(),
            target_id: Some(1),
        }]
    );
    assert_eq!(controller.phase(), Phase::Done);
    assert!(!controller.is_loading());
    assert_eq!(controller.result(), Some(&sample_report(42)));
    assert_eq!(controller.error(), None);
    assert_eq!(controller.recent_reports()[0].id, 42);
}

#[tokio::test]
async fn test_unmatched_target_is_sent_name_only() {
    let api = ScriptedApi::ok(42);
    let mut controller = with_catalogs(&api).await;
    controller.select_ecosystem("grasslands").unwrap();

    controller.run_analysis(&api).await.unwrap();

    assert_eq!(api.sent()[0].target_id, None);
    assert_eq!(api.sent()[0].target_name, "grasslands");
    assert_eq!(controller.phase(), Phase::Done);
}

#[tokio::test]
async fn test_trigger_server_error_fails_analysis() {
    let mut api = ScriptedApi::ok(42);
    api.trigger = Err(ApiError::Network("analysis returned HTTP 500: boom".into()));
    let mut controller = with_catalogs(&api).await;

    controller.run_analysis(&api).await.unwrap();

    assert_eq!(controller.phase(), Phase::Failed);
    assert!(!controller.is_loading());
    assert!(controller.result().is_none());
    assert_eq!(controller.error(), Some(UserError::Analysis));
    assert_eq!(
        controller.error().map(|e| e.to_string()).as_deref(),
        Some("Failed to generate report.")
    );
}

#[tokio::test]
async fn test_report_fetch_failure_fails_analysis() {
    let mut api = ScriptedApi::ok(42);
    api.report = Err(ApiError::Network("timed out".into()));
    let mut controller = with_catalogs(&api).await;

    controller.run_analysis(&api).await.unwrap();

    assert_eq!(controller.phase(), Phase::Failed);
    assert_eq!(controller.error(), Some(UserError::Analysis));
}

#[tokio::test]
async fn test_invalid_form_sends_nothing() {
    let api = ScriptedApi::ok(42);
    let mut controller = AnalysisController::new(Catalog::builtin());
    let seq = controller.begin_catalog_load();
    controller.catalogs_loaded(seq, load_catalogs(&api).await.unwrap());

    let err = controller.run_analysis(&api).await.unwrap_err();

    match err {
        SubmitError::Invalid(errors) => {
            assert_eq!(
                errors.keys().copied().collect::<Vec<_>>(),
                vec![Field::Query, Field::Ecosystem]
            );
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(api.sent().is_empty());
    assert_eq!(controller.phase(), Phase::Idle);
    assert_eq!(controller.form().errors().len(), 2);
}

#[tokio::test]
async fn test_catalog_failure_blocks_analysis() {
    let mut api = ScriptedApi::ok(42);
    api.catalogs_fail = true;
    let mut controller = with_catalogs(&api).await;

    assert_eq!(controller.error(), Some(UserError::InitialLoad));
    assert_eq!(
        controller.run_analysis(&api).await.unwrap_err(),
        SubmitError::CatalogUnavailable
    );
    assert!(api.sent().is_empty());
    assert_eq!(
        controller.error().map(|e| e.to_string()).as_deref(),
        Some("Failed to fetch initial data.")
    );

    api.catalogs_fail = false;
    let seq = controller.begin_catalog_load();
    assert_eq!(controller.remote_catalog(), &CatalogStatus::Loading);
    controller.catalogs_loaded(seq, load_catalogs(&api).await.unwrap());
    assert_eq!(controller.error(), None);
    controller.run_analysis(&api).await.unwrap();
    assert_eq!(controller.phase(), Phase::Done);
}

#[test]
fn test_stale_responses_never_overwrite_state() {
    let mut controller = filled_controller();
    let seq = controller.begin_catalog_load();
    controller.catalogs_loaded(seq, RemoteCatalog::default());

    let first = controller.begin_submit().unwrap();
    let second = controller.begin_submit().unwrap();
    assert!(second.ticket.seq() > first.ticket.seq());
    assert!(!first.ticket.is_current());
    assert!(second.ticket.is_current());

    // The older submission's responses arrive after the newer one started.
    let accepted = controller.trigger_succeeded(
        first.ticket.seq(),
        TriggerResponse {
            report_id: 1,
            message: String::new(),
        },
    );
    assert_eq!(accepted, None);
    controller.request_failed(first.ticket.seq(), &ApiError::Network("late".into()));
    assert_eq!(controller.phase(), Phase::Submitting);
    assert_eq!(controller.error(), None);

    let id = controller.trigger_succeeded(
        second.ticket.seq(),
        TriggerResponse {
            report_id: 2,
            message: String::new(),
        },
    );
    assert_eq!(id, Some(2));
    controller.report_received(first.ticket.seq(), sample_report(1));
    assert!(controller.result().is_none());
    controller.report_received(second.ticket.seq(), sample_report(2));
    assert_eq!(controller.result().map(|r| r.id), Some(2));
}

#[test]
fn test_reset_clears_result_and_discards_in_flight() {
    let mut controller = filled_controller();
    let seq = controller.begin_catalog_load();
    controller.catalogs_loaded(seq, RemoteCatalog::default());

    let submission = controller.begin_submit().unwrap();
    controller.reset();

    assert!(!submission.ticket.is_current());
    assert_eq!(controller.phase(), Phase::Idle);
    assert_eq!(controller.form().query(), "");
    assert_eq!(controller.form().selected_ecosystem(), "");

    controller.request_failed(submission.ticket.seq(), &ApiError::Network("late".into()));
    assert_eq!(controller.error(), None);
    assert_eq!(controller.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_late_catalog_failure_is_ignored_after_reload() {
    let api = ScriptedApi::ok(42);
    let mut controller = filled_controller();

    let startup = controller.begin_catalog_load();
    let reload = controller.begin_catalog_load();
    assert!(reload > startup);

    controller.apply(AnalysisEvent::CatalogsLoaded {
        seq: reload,
        remote: load_catalogs(&api).await.unwrap(),
    });
    controller.apply(AnalysisEvent::CatalogsFailed {
        seq: startup,
        error: ApiError::Network("request timed out".into()),
    });

    assert!(matches!(controller.remote_catalog(), CatalogStatus::Ready(_)));
    assert_eq!(controller.error(), None);
    let submission = controller.begin_submit().unwrap();
    assert_eq!(submission.request.target_id, Some(1));
}

#[test]
fn test_late_catalog_success_does_not_mask_newer_failure() {
    let mut controller = filled_controller();
    let startup = controller.begin_catalog_load();
    let reload = controller.begin_catalog_load();

    controller.catalogs_failed(reload, &ApiError::Network("down".into()));
    controller.catalogs_loaded(startup, RemoteCatalog::default());

    assert_eq!(controller.remote_catalog(), &CatalogStatus::Failed);
    assert_eq!(controller.error(), Some(UserError::InitialLoad));
}

#[test]
fn test_reset_keeps_initial_load_banner() {
    let mut controller = filled_controller();
    let seq = controller.begin_catalog_load();
    controller.catalogs_failed(seq, &ApiError::Network("down".into()));
    controller.reset();
    assert_eq!(controller.error(), Some(UserError::InitialLoad));
}

#[tokio::test]
async fn test_event_driven_submission() {
    let api: Arc<dyn AnalysisApi> = Arc::new(ScriptedApi::ok(42));
    let mut controller = with_catalogs(api.as_ref()).await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let submission = controller.begin_submit().unwrap();
    assert!(controller.is_loading());
    drive_submission(Arc::clone(&api), submission, tx).await;

    while let Some(event) = rx.recv().await {
        controller.apply(event);
    }

    assert_eq!(controller.phase(), Phase::Done);
    assert_eq!(controller.result().map(|r| r.id), Some(42));
}

#[tokio::test]
async fn test_superseded_submission_skips_report_fetch() {
    let api: Arc<dyn AnalysisApi> = Arc::new(ScriptedApi::ok(42));
    let mut controller = with_catalogs(api.as_ref()).await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let stale = controller.begin_submit().unwrap();
    let _current = controller.begin_submit().unwrap();
    drive_submission(Arc::clone(&api), stale, tx).await;

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], AnalysisEvent::Triggered { .. }));

    for event in events {
        controller.apply(event);
    }
    assert_eq!(controller.phase(), Phase::Submitting);
}

#[tokio::test]
async fn test_open_missing_report_names_the_id() {
    let api: Arc<dyn AnalysisApi> = Arc::new(ScriptedApi::ok(42));
    let mut controller = AnalysisController::new(Catalog::builtin());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let ticket = controller.begin_open_report(7);
    assert!(controller.is_loading());
    fetch_report(Arc::clone(&api), ticket, 7, tx).await;
    while let Some(event) = rx.recv().await {
        controller.apply(event);
    }

    assert_eq!(controller.phase(), Phase::Failed);
    assert_eq!(controller.error(), Some(UserError::ReportUnavailable(7)));
    assert_eq!(
        controller.error().map(|e| e.to_string()).as_deref(),
        Some("Report 7 could not be loaded.")
    );
}

#[tokio::test]
async fn test_recent_reports_sorted_newest_first() {
    let mut controller = AnalysisController::new(Catalog::builtin());
    let reports = (1..=12).map(sample_report).collect();
    controller.apply(AnalysisEvent::RecentReports(Ok(reports)));

    let ids: Vec<i64> = controller.recent_reports().iter().map(|r| r.id).collect();
    assert_eq!(ids.len(), 10);
    assert_eq!(ids[0], 12);
    assert_eq!(ids[9], 3);

    let api = ScriptedApi::ok(5);
    let listed = load_recent_reports(&api, 10).await.unwrap();
    assert_eq!(listed[0].id, 5);
}

#[tokio::test]
async fn test_recent_reports_include_newest_beyond_first_page() {
    let api = FixtureApi::new();
    let mut controller = filled_controller();
    let seq = controller.begin_catalog_load();
    controller.catalogs_loaded(seq, load_catalogs(&api).await.unwrap());
    for _ in 0..12 {
        controller.run_analysis(&api).await.unwrap();
    }

    let listed = load_recent_reports(&api, 10).await.unwrap();
    let mut fresh = AnalysisController::new(Catalog::builtin());
    fresh.apply(AnalysisEvent::RecentReports(Ok(listed)));

    let ids: Vec<i64> = fresh.recent_reports().iter().map(|r| r.id).collect();
    assert_eq!(ids, (3..=12).rev().collect::<Vec<i64>>());
}

/// Serves stored reports in ascending id order, like the backend's paging.
struct ManyReports {
    count: i64,
    pages: Mutex<Vec<(u32, u32)>>,
}

impl AnalysisApi for ManyReports {
    fn list_ecosystems(&self) -> ApiFuture<'_, Vec<Ecosystem>> {
        Box::pin(async move { Ok(Vec::new()) })
    }

    fn list_species(&self) -> ApiFuture<'_, Vec<Species>> {
        Box::pin(async move { Ok(Vec::new()) })
    }

    fn trigger_analysis<'a>(
        &'a self,
        _request: &'a TriggerRequest,
    ) -> ApiFuture<'a, TriggerResponse> {
        Box::pin(async move { Err(ApiError::Network("read only".into())) })
    }

    fn get_report(&self, report_id: i64) -> ApiFuture<'_, Report> {
        Box::pin(async move { Ok(sample_report(report_id)) })
    }

    fn list_reports(&self, skip: u32, limit: u32) -> ApiFuture<'_, Vec<Report>> {
        Box::pin(async move {
            self.pages.lock().unwrap().push((skip, limit));
            Ok((1..=self.count)
                .skip(skip as usize)
                .take(limit as usize)
                .map(sample_report)
                .collect())
        })
    }

    fn health(&self) -> ApiFuture<'_, ServiceInfo> {
        Box::pin(async move {
            Ok(ServiceInfo {
                message: "ok".into(),
                docs_url: None,
            })
        })
    }

    fn describe(&self) -> String {
        "many reports".into()
    }
}

#[tokio::test]
async fn test_recent_reports_scan_every_page() {
    let api = ManyReports {
        count: 250,
        pages: Mutex::new(Vec::new()),
    };

    let listed = load_recent_reports(&api, 10).await.unwrap();

    let ids: Vec<i64> = listed.iter().map(|r| r.id).collect();
    assert_eq!(ids, (241..=250).rev().collect::<Vec<i64>>());
    assert_eq!(
        api.pages.lock().unwrap().clone(),
        vec![(0, 100), (100, 100), (200, 100)]
    );
}
