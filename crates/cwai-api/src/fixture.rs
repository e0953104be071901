//! Offline backend used for demo mode and tests.
//!
//! Catalog entries are derived from the bundled [`Catalog`], and every
//! triggered analysis produces a canned report carrying temperature,
//! precipitation and population figures in `analysis_results`.

use std::sync::Mutex;
use std::time::Duration;

use serde_json::json;

use cwai_protocol::{
    AnalysisType, Catalog, Ecosystem, Report, ServiceInfo, Species, TriggerRequest,
    TriggerResponse,
};

use crate::{AnalysisApi, ApiError, ApiFuture};

/// In-memory backend that answers like the real service.
pub struct FixtureApi {
    ecosystems: Vec<Ecosystem>,
    species: Vec<Species>,
    reports: Mutex<Vec<Report>>,
    latency: Duration,
}

impl FixtureApi {
    pub fn new() -> Self {
        Self::from_catalog(&Catalog::builtin())
    }

    /// Build backend catalog rows from form options; ids are assigned in order from 1.
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let ecosystems = catalog
            .ecosystems
            .iter()
            .zip(1..)
            .map(|(option, id)| Ecosystem {
                id,
                name: option.label.clone(),
                kind: if option.id.contains("marine") || option.id.contains("freshwater") {
                    "aquatic".to_string()
                } else {
                    "terrestrial".to_string()
                },
                subtype: None,
                description: option.description.clone(),
            })
            .collect();

        let species = catalog
            .species
            .iter()
            .zip(1..)
            .map(|(option, id)| Species {
                id,
                scientific_name: option.label.clone(),
                common_name: Some(option.label.clone()),
                conservation_status: Some(option.threat_level.to_string()),
                climate_sensitivity: None,
            })
            .collect();

        Self {
            ecosystems,
            species,
            reports: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
        }
    }

    /// Delay every answer, to exercise loading states.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn lock_reports(&self) -> Result<std::sync::MutexGuard<'_, Vec<Report>>, ApiError> {
        self.reports
            .lock()
            .map_err(|_| ApiError::Network("fixture report store poisoned".into()))
    }

    fn store_report(&self, request: &TriggerRequest) -> Result<i64, ApiError> {
        let mut reports = self.lock_reports()?;
        let id = reports.len() as i64 + 1;
        reports.push(canned_report(id, request));
        Ok(id)
    }
}

impl Default for FixtureApi {
    fn default() -> Self {
        Self::new()
    }
}

fn canned_report(id: i64, request: &TriggerRequest) -> Report {
    let population = match request.target_type {
        AnalysisType::Species => json!([{ "name": request.target_name, "value": -23 }]),
        AnalysisType::Ecosystem => json!([
            { "name": "Polar Bear", "value": -23 },
            { "name": "Arctic Fox", "value": -18 },
            { "name": "Caribou", "value": -31 },
        ]),
    };

    Report {
        id,
        report_type: Some(request.query.clone()),
        query_parameters: Some(json!({
            "query": request.query,
            "target_type": request.target_type,
            "target_name": request.target_name,
        })),
        analysis_results: Some(json!({
            "summary": format!(
                "Offline analysis of {} '{}'.",
                request.target_type, request.target_name
            ),
            "metrics": {
                "temperatureChange": 2.3,
                "precipitationChange": -15,
                "speciesAtRisk": 47,
            },
            "key_insights": [
                "Arctic temperatures rising faster than global average",
                "Permafrost melting threatens ecosystem stability",
                "Species migration patterns shifting northward",
            ],
            "charts": {
                "temperature": [
                    { "name": "2020", "value": 1.1 },
                    { "name": "2021", "value": 1.4 },
                    { "name": "2022", "value": 1.8 },
                    { "name": "2023", "value": 2.1 },
                    { "name": "2024", "value": 2.3 },
                ],
                "population": population,
            },
        })),
        predictions: Some(json!({ "trend": "continued warming through 2030" })),
        citations: Some(json!({})),
        confidence_scores: Some(json!({ "overall": 0.72 })),
        ai_model_version: Some("fixture".to_string()),
        generated_at: Some(chrono::Utc::now().to_rfc3339()),
    }
}

impl AnalysisApi for FixtureApi {
    fn list_ecosystems(&self) -> ApiFuture<'_, Vec<Ecosystem>> {
        Box::pin(async move {
            self.pause().await;
            Ok(self.ecosystems.clone())
        })
    }

    fn list_species(&self) -> ApiFuture<'_, Vec<Species>> {
        Box::pin(async move {
            self.pause().await;
            Ok(self.species.clone())
        })
    }

    fn trigger_analysis<'a>(
        &'a self,
        request: &'a TriggerRequest,
    ) -> ApiFuture<'a, TriggerResponse> {
        Box::pin(async move {
            self.pause().await;
            let report_id = self.store_report(request)?;
            tracing::info!(report_id, "Fixture generated report");
            Ok(TriggerResponse {
                report_id,
                message: "Analysis complete and report generated.".to_string(),
            })
        })
    }

    fn get_report(&self, report_id: i64) -> ApiFuture<'_, Report> {
        Box::pin(async move {
            self.pause().await;
            let found = {
                let reports = self.lock_reports()?;
                reports.iter().find(|r| r.id == report_id).cloned()
            };
            found.ok_or_else(|| ApiError::NotFound("Report not found".to_string()))
        })
    }

    fn list_reports(&self, skip: u32, limit: u32) -> ApiFuture<'_, Vec<Report>> {
        Box::pin(async move {
            self.pause().await;
            let reports = self.lock_reports()?;
            Ok(reports
                .iter()
                .skip(skip as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        })
    }

    fn health(&self) -> ApiFuture<'_, ServiceInfo> {
        Box::pin(async move {
            Ok(ServiceInfo {
                message: "Offline fixture backend".to_string(),
                docs_url: None,
            })
        })
    }

    fn describe(&self) -> String {
        "offline fixture".to_string()
    }
}
