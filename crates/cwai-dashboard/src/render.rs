//! Pure text rendering of controller state.
//!
//! Everything here maps state to [`RenderLine`]s without side effects, so the
//! same state always renders the same lines. The console turns tones into
//! colours; one-shot commands print the text.

use cwai_protocol::{AnalysisType, Catalog, Report, ThreatLevel};
use cwai_state::{AnalysisController, CatalogStatus, ChartPoint, Field, Phase, ReportView};

use crate::format::{
    format_confidence, format_large_number, format_percentage, format_temperature, truncate,
};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
const BAR_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Heading,
    Label,
    Body,
    Muted,
    Good,
    Warning,
    Error,
    Threat(ThreatLevel),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderLine {
    pub text: String,
    pub tone: Tone,
}

impl RenderLine {
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    fn blank() -> Self {
        Self::new("", Tone::Body)
    }
}

/// Join lines into plain text.
pub fn to_plain(lines: &[RenderLine]) -> String {
    lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// The analysis form: query, target type, selections, species options and
/// any field errors.
pub fn form_lines(controller: &AnalysisController) -> Vec<RenderLine> {
    let form = controller.form();
    let catalog = controller.catalog();
    let errors = form.errors();
    let mut lines = Vec::new();

    let query = if form.query().is_empty() {
        RenderLine::new("  Query:     (type text and press Enter)", Tone::Muted)
    } else {
        RenderLine::new(format!("  Query:     {}", form.query()), Tone::Body)
    };
    lines.push(query);
    push_field_error(&mut lines, errors.get(&Field::Query));

    lines.push(RenderLine::new(
        format!("  Analysis:  {}", form.analysis_type()),
        Tone::Label,
    ));

    let ecosystem = catalog
        .ecosystem(form.selected_ecosystem())
        .map(|e| format!("{} {}", e.icon, e.label))
        .unwrap_or_else(|| "-".to_string());
    lines.push(RenderLine::new(format!("  Ecosystem: {ecosystem}"), Tone::Body));
    push_field_error(&mut lines, errors.get(&Field::Ecosystem));

    if form.analysis_type() == AnalysisType::Species {
        let species = catalog
            .species_by_id(form.selected_species())
            .map(|s| format!("{} {}", s.icon, s.label))
            .unwrap_or_else(|| "-".to_string());
        lines.push(RenderLine::new(format!("  Species:   {species}"), Tone::Body));
        push_field_error(&mut lines, errors.get(&Field::Species));

        let options = form.available_species(catalog);
        if form.selected_ecosystem().is_empty() {
            lines.push(RenderLine::new(
                "    Select an ecosystem first to see available species",
                Tone::Muted,
            ));
        } else if options.is_empty() {
            lines.push(RenderLine::new(
                "    No species catalogued for this ecosystem",
                Tone::Muted,
            ));
        } else {
            for (i, option) in options.iter().enumerate() {
                let marker = if option.id == form.selected_species() { "*" } else { " " };
                lines.push(RenderLine::new(
                    format!(
                        "   {marker}{}. {} {} [{}]",
                        i + 1,
                        option.icon,
                        option.label,
                        option.threat_level
                    ),
                    Tone::Threat(option.threat_level),
                ));
            }
        }
    }

    lines
}

fn push_field_error(lines: &mut Vec<RenderLine>, message: Option<&&'static str>) {
    if let Some(message) = message {
        lines.push(RenderLine::new(format!("    ! {message}"), Tone::Error));
    }
}

/// The right-hand panel: hint when idle, spinner while loading, the report
/// when done, and the banner when failed.
pub fn result_lines(controller: &AnalysisController, tick: u64) -> Vec<RenderLine> {
    let spinner = SPINNER[(tick % SPINNER.len() as u64) as usize];
    match controller.phase() {
        Phase::Idle => vec![
            RenderLine::blank(),
            RenderLine::new(
                "  Fill in the form and run /run to generate a report.",
                Tone::Muted,
            ),
        ],
        Phase::Submitting => vec![
            RenderLine::blank(),
            RenderLine::new(format!("  {spinner} Generating report..."), Tone::Warning),
        ],
        Phase::AwaitingReport { report_id } => vec![
            RenderLine::blank(),
            RenderLine::new(
                format!("  {spinner} Fetching report #{report_id}..."),
                Tone::Warning,
            ),
        ],
        Phase::Done => match controller.result() {
            Some(report) => report_lines(&ReportView::from_report(report)),
            None => Vec::new(),
        },
        Phase::Failed => {
            let message = controller
                .error()
                .map(|e| e.to_string())
                .unwrap_or_default();
            vec![
                RenderLine::blank(),
                RenderLine::new(format!("  {message}"), Tone::Error),
            ]
        }
    }
}

/// Full report body.
pub fn report_lines(view: &ReportView) -> Vec<RenderLine> {
    let mut lines = vec![RenderLine::new(
        format!("Report #{}: {}", view.id, view.title),
        Tone::Heading,
    )];

    let mut meta = Vec::new();
    if let Some(model) = &view.model {
        meta.push(format!("model {model}"));
    }
    if let Some(at) = &view.generated_at {
        meta.push(format!("generated {at}"));
    }
    if let Some(confidence) = view.confidence {
        meta.push(format!("confidence {}", format_confidence(confidence)));
    }
    if !meta.is_empty() {
        lines.push(RenderLine::new(meta.join(" | "), Tone::Muted));
    }

    if let Some(summary) = &view.summary {
        lines.push(RenderLine::blank());
        lines.push(RenderLine::new(summary.clone(), Tone::Body));
    }

    if !view.metrics.is_empty() {
        lines.push(RenderLine::blank());
        lines.push(RenderLine::new("Key metrics", Tone::Label));
        if let Some(t) = view.metrics.temperature_change {
            lines.push(RenderLine::new(
                format!("  Temperature change:   {}", format_temperature(t)),
                signed_tone(t),
            ));
        }
        if let Some(p) = view.metrics.precipitation_change {
            lines.push(RenderLine::new(
                format!("  Precipitation change: {}", format_percentage(p)),
                signed_tone(-p),
            ));
        }
        if let Some(n) = view.metrics.species_at_risk {
            lines.push(RenderLine::new(
                format!("  Species at risk:      {}", format_large_number(n)),
                Tone::Warning,
            ));
        }
    }

    if !view.insights.is_empty() {
        lines.push(RenderLine::blank());
        lines.push(RenderLine::new("Key insights", Tone::Label));
        for insight in &view.insights {
            lines.push(RenderLine::new(format!("  - {insight}"), Tone::Body));
        }
    }

    push_chart(&mut lines, "Temperature trend", &view.temperature, format_temperature);
    push_chart(&mut lines, "Population change", &view.population, format_percentage);

    if let Some(text) = &view.raw_text {
        lines.push(RenderLine::blank());
        lines.push(RenderLine::new("Analysis", Tone::Label));
        lines.extend(text.lines().map(|l| RenderLine::new(format!("  {l}"), Tone::Body)));
    }

    push_entries(&mut lines, "Predictions", &view.predictions);
    push_entries(&mut lines, "Citations", &view.citations);

    if view.is_blank() {
        lines.push(RenderLine::new("  (report has no content)", Tone::Muted));
    }

    lines
}

fn signed_tone(value: f64) -> Tone {
    if value > 0.0 {
        Tone::Error
    } else {
        Tone::Good
    }
}

fn push_chart(
    lines: &mut Vec<RenderLine>,
    title: &str,
    points: &[ChartPoint],
    label: fn(f64) -> String,
) {
    if points.is_empty() {
        return;
    }
    let max = points
        .iter()
        .map(|p| p.value.abs())
        .fold(0.0_f64, f64::max);
    let name_width = points.iter().map(|p| p.name.chars().count()).max().unwrap_or(0);

    lines.push(RenderLine::blank());
    lines.push(RenderLine::new(title, Tone::Label));
    for point in points {
        let filled = if max > 0.0 {
            ((point.value.abs() / max) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        lines.push(RenderLine::new(
            format!(
                "  {:<name_width$} {:<bar$} {}",
                point.name,
                "#".repeat(filled),
                label(point.value),
                bar = BAR_WIDTH,
            ),
            Tone::Body,
        ));
    }
}

fn push_entries(lines: &mut Vec<RenderLine>, title: &str, entries: &[(String, String)]) {
    if entries.is_empty() {
        return;
    }
    lines.push(RenderLine::blank());
    lines.push(RenderLine::new(title, Tone::Label));
    for (key, value) in entries {
        let text = if key.is_empty() {
            format!("  {value}")
        } else {
            format!("  {key}: {value}")
        };
        lines.push(RenderLine::new(text, Tone::Body));
    }
}

/// Bundled ecosystems and species, numbered the way `/eco` and `/species` accept them.
pub fn catalog_lines(catalog: &Catalog) -> Vec<RenderLine> {
    let mut lines = vec![RenderLine::new("Ecosystems", Tone::Label)];
    for (i, eco) in catalog.ecosystems.iter().enumerate() {
        let description = eco.description.as_deref().unwrap_or("");
        lines.push(RenderLine::new(
            format!("  {}. {} {} ({}) {}", i + 1, eco.icon, eco.label, eco.id, description)
                .trim_end()
                .to_string(),
            Tone::Body,
        ));
        for species in catalog.species_for_ecosystem(&eco.id) {
            lines.push(RenderLine::new(
                format!(
                    "       {} {} ({}) [{}]",
                    species.icon, species.label, species.id, species.threat_level
                ),
                Tone::Threat(species.threat_level),
            ));
        }
    }
    lines
}

/// One line per report, newest first.
pub fn recent_lines(reports: &[Report]) -> Vec<RenderLine> {
    if reports.is_empty() {
        return vec![RenderLine::new("  No reports yet.", Tone::Muted)];
    }
    reports
        .iter()
        .map(|r| {
            let title = r.report_type.as_deref().unwrap_or("(untitled)");
            let when = r
                .generated_at_utc()
                .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            RenderLine::new(
                format!("  #{:<4} {when}  {}", r.id, truncate(title, 40)),
                Tone::Body,
            )
        })
        .collect()
}

/// Short catalog status for the status bar.
pub fn catalog_status(status: &CatalogStatus) -> (String, Tone) {
    match status {
        CatalogStatus::Loading => ("loading".to_string(), Tone::Warning),
        CatalogStatus::Ready(remote) => (
            format!(
                "{} ecosystems, {} species",
                remote.ecosystems.len(),
                remote.species.len()
            ),
            Tone::Good,
        ),
        CatalogStatus::Failed => ("unavailable".to_string(), Tone::Error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report() -> Report {
        Report {
            id: 42,
            report_type: Some("threats to arctic".into()),
            query_parameters: None,
            analysis_results: Some(json!({
                "summary": "Arctic warming is accelerating.",
                "metrics": {"temperatureChange": 2.3, "precipitationChange": -15, "speciesAtRisk": 1234},
                "key_insights": ["Permafrost melting threatens ecosystem stability"],
                "charts": {"temperature": [{"name": "2020", "value": 1.1}, {"name": "2024", "value": 2.2}]}
            })),
            predictions: Some(json!({"2030": "ice-free summers"})),
            citations: None,
            confidence_scores: Some(json!({"overall": 0.72})),
            ai_model_version: Some("Pi-3.1".into()),
            generated_at: Some("2024-05-01T10:00:00".into()),
        }
    }

    #[test]
    fn rendering_is_repeatable() {
        let report = report();
        let first = report_lines(&ReportView::from_report(&report));
        let second = report_lines(&ReportView::from_report(&report));
        assert_eq!(first, second);
    }

    #[test]
    fn report_shows_formatted_metrics() {
        let text = to_plain(&report_lines(&ReportView::from_report(&report())));
        assert!(text.starts_with("Report #42: threats to arctic"));
        assert!(text.contains("model Pi-3.1 | generated 2024-05-01 10:00 UTC | confidence 72%"));
        assert!(text.contains("Temperature change:   +2.3°C"));
        assert!(text.contains("Precipitation change: -15%"));
        assert!(text.contains("Species at risk:      1.2K"));
        assert!(text.contains("2030: ice-free summers"));
        assert!(!text.contains("Citations"));
    }

    #[test]
    fn chart_bars_scale_to_largest_value() {
        let lines = report_lines(&ReportView::from_report(&report()));
        let bars: Vec<usize> = lines
            .iter()
            .filter(|l| l.text.starts_with("  2020") || l.text.starts_with("  2024"))
            .map(|l| l.text.matches('#').count())
            .collect();
        assert_eq!(bars, vec![10, 20]);
    }

    #[test]
    fn phases_render_expected_panel() {
        let mut controller = AnalysisController::new(Catalog::builtin());
        assert!(to_plain(&result_lines(&controller, 0)).contains("/run"));

        let seq = controller.begin_catalog_load();
        controller.catalogs_loaded(seq, Default::default());
        controller.form_mut().set_query("threats to arctic");
        controller.select_ecosystem("arctic-terrestrial").unwrap();
        let submission = controller.begin_submit().unwrap();
        assert!(to_plain(&result_lines(&controller, 1)).contains("/ Generating report"));

        controller.request_failed(
            submission.ticket.seq(),
            &cwai_api::ApiError::Network("HTTP 500".into()),
        );
        let failed = result_lines(&controller, 0);
        assert_eq!(failed[1].tone, Tone::Error);
        assert!(failed[1].text.contains("Failed to generate report."));
    }

    #[test]
    fn form_lists_species_for_selected_ecosystem() {
        let mut controller = AnalysisController::new(Catalog::builtin());
        controller
            .form_mut()
            .set_analysis_type(AnalysisType::Species);
        controller.select_ecosystem("arctic-terrestrial").unwrap();
        let text = to_plain(&form_lines(&controller));
        assert!(text.contains("1. 🐻‍❄️ Polar Bear [critical]"));
        assert!(text.contains("2. 🦊 Arctic Fox [high]"));
        assert!(!text.contains("Jaguar"));
    }

    #[test]
    fn form_shows_field_errors() {
        let mut controller = AnalysisController::new(Catalog::builtin());
        let _ = controller.form_mut().submit();
        let lines = form_lines(&controller);
        let errors: Vec<&str> = lines
            .iter()
            .filter(|l| l.tone == Tone::Error)
            .map(|l| l.text.trim())
            .collect();
        assert_eq!(
            errors,
            vec!["! Please enter a research query", "! Please select an ecosystem"]
        );
    }
}
