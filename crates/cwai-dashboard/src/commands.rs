//! Non-interactive subcommands. Each returns the text to print on stdout.

use clap::Subcommand;

use cwai_api::AnalysisApi;
use cwai_protocol::{AnalysisType, Catalog, Report, INITIAL_LOAD_FAILED_MSG};
use cwai_state::{load_catalogs, AnalysisController, Phase, ReportView, SubmitError};

use crate::render::{self, RenderLine, Tone};

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Interactive console (default).
    Console,
    /// Run one analysis and print the report.
    Analyze {
        /// Research question, e.g. "threats to arctic".
        query: String,
        /// Ecosystem id or its number in `catalog`.
        #[arg(long, short)]
        ecosystem: Option<String>,
        /// Species id; its ecosystem is inferred when --ecosystem is omitted.
        #[arg(long, short)]
        species: Option<String>,
        /// Print the raw report JSON.
        #[arg(long)]
        json: bool,
    },
    /// List ecosystems and species.
    Catalog {
        /// Show the backend's rows instead of the bundled catalog.
        #[arg(long)]
        remote: bool,
    },
    /// Print an existing report.
    Report {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// List stored reports.
    Reports {
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long, default_value_t = cwai_protocol::DEFAULT_REPORT_PAGE_SIZE)]
        limit: u32,
    },
    /// Check the backend is reachable.
    Health,
}

pub async fn execute(command: Command, api: &dyn AnalysisApi) -> anyhow::Result<String> {
    match command {
        Command::Console => anyhow::bail!("the console is not a one-shot command"),
        Command::Analyze {
            query,
            ecosystem,
            species,
            json,
        } => analyze(api, &query, ecosystem.as_deref(), species.as_deref(), json).await,
        Command::Catalog { remote } => catalog(api, remote).await,
        Command::Report { id, json } => report(api, id, json).await,
        Command::Reports { skip, limit } => {
            let reports = api.list_reports(skip, limit).await?;
            Ok(render::to_plain(&render::recent_lines(&reports)))
        }
        Command::Health => {
            let info = api.health().await?;
            let mut out = format!("{}: {}", api.describe(), info.message);
            if let Some(docs) = info.docs_url {
                out.push_str(&format!(" (docs: {docs})"));
            }
            Ok(out)
        }
    }
}

async fn analyze(
    api: &dyn AnalysisApi,
    query: &str,
    ecosystem: Option<&str>,
    species: Option<&str>,
    json: bool,
) -> anyhow::Result<String> {
    let mut controller = AnalysisController::new(Catalog::builtin());
    controller.form_mut().set_query(query);

    let ecosystem_id = match (ecosystem, species) {
        (Some(key), _) => Some(
            controller
                .catalog()
                .find_ecosystem(key)
                .map(|e| e.id.clone())
                .ok_or_else(|| anyhow::anyhow!("unknown ecosystem '{key}'"))?,
        ),
        (None, Some(id)) => Some(
            controller
                .catalog()
                .species_by_id(id)
                .map(|s| s.ecosystem_id.clone())
                .ok_or_else(|| anyhow::anyhow!("unknown species '{id}'"))?,
        ),
        (None, None) => None,
    };
    if let Some(id) = &ecosystem_id {
        controller.select_ecosystem(id)?;
    }
    if let Some(id) = species {
        controller.form_mut().set_analysis_type(AnalysisType::Species);
        controller.select_species(id)?;
    }

    let seq = controller.begin_catalog_load();
    match load_catalogs(api).await {
        Ok(remote) => controller.catalogs_loaded(seq, remote),
        Err(e) => {
            controller.catalogs_failed(seq, &e);
            anyhow::bail!("{INITIAL_LOAD_FAILED_MSG} ({e})");
        }
    }

    match controller.run_analysis(api).await {
        Ok(()) => {}
        Err(SubmitError::Invalid(errors)) => {
            let messages: Vec<&str> = errors.values().copied().collect();
            anyhow::bail!("{}", messages.join("; "));
        }
        Err(e) => return Err(e.into()),
    }

    finish(&controller, json)
}

async fn report(api: &dyn AnalysisApi, id: i64, json: bool) -> anyhow::Result<String> {
    let mut controller = AnalysisController::new(Catalog::builtin());
    let ticket = controller.begin_open_report(id);
    match api.get_report(id).await {
        Ok(report) => controller.report_received(ticket.seq(), report),
        Err(e) => controller.request_failed(ticket.seq(), &e),
    }
    finish(&controller, json)
}

/// Print the result, or turn the banner into the command's error.
fn finish(controller: &AnalysisController, json: bool) -> anyhow::Result<String> {
    match (controller.phase(), controller.result()) {
        (Phase::Done, Some(report)) => render_report(report, json),
        _ => {
            let message = controller
                .error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no report produced".to_string());
            anyhow::bail!(message)
        }
    }
}

fn render_report(report: &Report, json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(report)?);
    }
    Ok(render::to_plain(&render::report_lines(&ReportView::from_report(report))))
}

async fn catalog(api: &dyn AnalysisApi, remote: bool) -> anyhow::Result<String> {
    if !remote {
        return Ok(render::to_plain(&render::catalog_lines(&Catalog::builtin())));
    }

    let remote = load_catalogs(api)
        .await
        .map_err(|e| anyhow::anyhow!("{INITIAL_LOAD_FAILED_MSG} ({e})"))?;
    let mut lines = vec![RenderLine::new("Ecosystems", Tone::Label)];
    for eco in &remote.ecosystems {
        let subtype = eco
            .subtype
            .as_deref()
            .map(|s| format!("/{s}"))
            .unwrap_or_default();
        lines.push(RenderLine::new(
            format!("  #{:<3} {} [{}{subtype}]", eco.id, eco.name, eco.kind),
            Tone::Body,
        ));
    }
    lines.push(RenderLine::new("Species", Tone::Label));
    for species in &remote.species {
        let common = species
            .common_name
            .as_deref()
            .map(|c| format!(" ({c})"))
            .unwrap_or_default();
        let status = species
            .conservation_status
            .as_deref()
            .map(|s| format!(" [{s}]"))
            .unwrap_or_default();
        lines.push(RenderLine::new(
            format!("  #{:<3} {}{common}{status}", species.id, species.scientific_name),
            Tone::Body,
        ));
    }
    Ok(render::to_plain(&lines))
}
