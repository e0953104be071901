//! Read-only projection of a [`Report`] for rendering.
//!
//! The backend stores some report sections as JSON-encoded strings, so every
//! section is decoded leniently: an object is used as-is, a string holding
//! JSON is parsed, and anything else is shown as plain text.

use serde_json::{Map, Value};

use cwai_protocol::Report;

/// Headline figures from `analysis_results.metrics`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    pub temperature_change: Option<f64>,
    pub precipitation_change: Option<f64>,
    pub species_at_risk: Option<f64>,
}

impl Metrics {
    pub fn is_empty(&self) -> bool {
        self.temperature_change.is_none()
            && self.precipitation_change.is_none()
            && self.species_at_risk.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub name: String,
    pub value: f64,
}

/// Everything the result panel shows, extracted once per report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportView {
    pub id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub raw_text: Option<String>,
    pub metrics: Metrics,
    pub insights: Vec<String>,
    pub temperature: Vec<ChartPoint>,
    pub population: Vec<ChartPoint>,
    pub confidence: Option<f64>,
    pub predictions: Vec<(String, String)>,
    pub citations: Vec<(String, String)>,
    pub model: Option<String>,
    pub generated_at: Option<String>,
}

impl ReportView {
    pub fn from_report(report: &Report) -> Self {
        let results = report.analysis_results.as_ref().map(decode_section);
        let object = results.as_ref().and_then(Value::as_object);

        let title = report
            .report_type
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Report #{}", report.id));

        let summary = object.and_then(|o| text_field(o, &["summary"]));
        let raw_text = match (&results, object) {
            (_, Some(o)) => text_field(o, &["raw_text", "text"]),
            (Some(Value::String(s)), None) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        };

        let metrics = object
            .and_then(|o| o.get("metrics"))
            .and_then(Value::as_object)
            .map(|m| Metrics {
                temperature_change: number_field(m, &["temperatureChange", "temperature_change"]),
                precipitation_change: number_field(
                    m,
                    &["precipitationChange", "precipitation_change"],
                ),
                species_at_risk: number_field(m, &["speciesAtRisk", "species_at_risk"]),
            })
            .unwrap_or_default();

        let insights: Vec<String> = object
            .and_then(|o| o.get("key_insights").or_else(|| o.get("insights")))
            .and_then(Value::as_array)
            .map(|items| items.iter().map(display_value).collect())
            .unwrap_or_default();

        let charts = object.and_then(|o| o.get("charts")).and_then(Value::as_object);
        let temperature = charts.map(|c| chart(c, "temperature")).unwrap_or_default();
        let population = charts.map(|c| chart(c, "population")).unwrap_or_default();

        let confidence = report
            .confidence_scores
            .as_ref()
            .map(decode_section)
            .and_then(|scores| match scores {
                Value::Number(n) => n.as_f64(),
                Value::Object(o) => number_field(&o, &["overall", "confidence"]),
                _ => None,
            });

        Self {
            id: report.id,
            title,
            summary,
            raw_text,
            metrics,
            insights,
            temperature,
            population,
            confidence,
            predictions: entries(report.predictions.as_ref()),
            citations: entries(report.citations.as_ref()),
            model: report.ai_model_version.clone(),
            generated_at: report
                .generated_at_utc()
                .map(|ts| ts.format("%Y-%m-%d %H:%M UTC").to_string())
                .or_else(|| report.generated_at.clone()),
        }
    }

    /// True when the report carries nothing beyond its title.
    pub fn is_blank(&self) -> bool {
        self.summary.is_none()
            && self.raw_text.is_none()
            && self.metrics.is_empty()
            && self.insights.is_empty()
            && self.temperature.is_empty()
            && self.population.is_empty()
            && self.predictions.is_empty()
            && self.citations.is_empty()
    }
}

fn decode_section(value: &Value) -> Value {
    match value {
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(parsed @ (Value::Object(_) | Value::Array(_))) => parsed,
            _ => value.clone(),
        },
        other => other.clone(),
    }
}

fn text_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| object.get(*k))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn number_field(object: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| object.get(*k)).and_then(as_number)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn chart(charts: &Map<String, Value>, key: &str) -> Vec<ChartPoint> {
    charts
        .get(key)
        .and_then(Value::as_array)
        .map(|points| {
            points
                .iter()
                .filter_map(|p| {
                    let name = match p.get("name")? {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    let value = as_number(p.get("value")?)?;
                    Some(ChartPoint { name, value })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Flatten a section into `(label, text)` rows.
fn entries(section: Option<&Value>) -> Vec<(String, String)> {
    match section.map(decode_section) {
        Some(Value::Object(o)) => o.iter().map(|(k, v)| (k.clone(), display_value(v))).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, v)| ((i + 1).to_string(), display_value(v)))
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![(String::new(), s)],
        _ => Vec::new(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
