//! JSON shapes exchanged with the backend under `/api/v1`.
//!
//! Response types keep unknown or loosely typed payloads as
//! `serde_json::Value` so a report is held exactly as the server sent it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{AnalysisQuery, AnalysisType};

/// Entry of `GET /ecosystems/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ecosystem {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Entry of `GET /species/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub id: i64,
    pub scientific_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conservation_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climate_sensitivity: Option<f64>,
}

/// Body of `POST /analysis/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub query: String,
    pub target_type: AnalysisType,
    pub target_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<i64>,
}

impl TriggerRequest {
    pub fn from_query(query: &AnalysisQuery, target_id: Option<i64>) -> Self {
        Self {
            query: query.query().to_string(),
            target_type: query.analysis_type(),
            target_name: query.target().name().to_string(),
            target_id,
        }
    }
}

/// Response of `POST /analysis/`.
///
/// Some backend builds answer with the stored report itself; its `id` is
/// accepted as the report id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerResponse {
    #[serde(alias = "id")]
    pub report_id: i64,
    #[serde(default)]
    pub message: String,
}

/// A generated report, `GET /reports/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    #[serde(default)]
    pub report_type: Option<String>,
    #[serde(default)]
    pub query_parameters: Option<Value>,
    #[serde(default)]
    pub analysis_results: Option<Value>,
    #[serde(default)]
    pub predictions: Option<Value>,
    #[serde(default)]
    pub citations: Option<Value>,
    #[serde(default)]
    pub confidence_scores: Option<Value>,
    #[serde(default)]
    pub ai_model_version: Option<String>,
    /// Server timestamp, kept verbatim; it may or may not carry an offset.
    #[serde(default)]
    pub generated_at: Option<String>,
}

impl Report {
    /// Parse `generated_at`, accepting RFC 3339 or a naive timestamp taken as UTC.
    pub fn generated_at_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let raw = self.generated_at.as_deref()?;
        if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&chrono::Utc));
        }
        chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// Response of the server root, `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    #[serde(default)]
    pub docs_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnalysisTarget;

    #[test]
    fn trigger_request_omits_missing_target_id() {
        let query = AnalysisQuery::new(
            "threats to arctic",
            AnalysisTarget::Ecosystem("arctic-terrestrial".into()),
        )
        .unwrap();
        let body = serde_json::to_value(TriggerRequest::from_query(&query, None)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "query": "threats to arctic",
                "target_type": "ecosystem",
                "target_name": "arctic-terrestrial",
            })
        );
    }

    #[test]
    fn trigger_response_accepts_report_object() {
        let plain: TriggerResponse =
            serde_json::from_str(r#"{"report_id": 42, "message": "ok"}"#).unwrap();
        assert_eq!(plain.report_id, 42);

        let report_shaped: TriggerResponse = serde_json::from_str(
            r#"{"id": 7, "report_type": "q", "generated_at": "2024-05-01T10:00:00"}"#,
        )
        .unwrap();
        assert_eq!(report_shaped.report_id, 7);
        assert!(report_shaped.message.is_empty());
    }

    #[test]
    fn ecosystem_type_field_is_renamed() {
        let eco: Ecosystem = serde_json::from_str(
            r#"{"id": 3, "name": "Pelagic Marine Systems", "type": "aquatic", "subtype": null}"#,
        )
        .unwrap();
        assert_eq!(eco.kind, "aquatic");
        assert_eq!(eco.subtype, None);
    }

    #[test]
    fn generated_at_parses_naive_and_offset_forms() {
        let mut report: Report = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert!(report.generated_at_utc().is_none());

        report.generated_at = Some("2024-05-01T10:00:00.123456".into());
        assert_eq!(
            report.generated_at_utc().unwrap().to_rfc3339(),
            "2024-05-01T10:00:00.123456+00:00"
        );

        report.generated_at = Some("2024-05-01T12:00:00+02:00".into());
        assert_eq!(
            report.generated_at_utc().unwrap().format("%H:%M").to_string(),
            "10:00"
        );
    }
}
