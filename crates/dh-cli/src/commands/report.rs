//! `report` (spec §6): render a report from a decided cluster's artifacts.
//! The HTML report renderer proper is out of scope (spec §1's declared
//! collaborator boundary); this command renders a minimal self-contained
//! summary view directly from `kpi_contract_<cluster_id>.json` and
//! `decision_<cluster_id>.json` so the CLI surface spec §6 describes is
//! still complete without reimplementing the external renderer.

use crate::cli::ReportFormat;
use dh_contract::{Choice, KpiContract};
use dh_core::{DhError, DhResult};
use dh_io::artifact_discovery::find_cluster_artifact;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct DecisionArtifact {
    decision: DecisionView,
}

#[derive(Debug, Deserialize)]
struct DecisionView {
    choice: Choice,
    robust: bool,
    reason_codes: Vec<String>,
}

fn read_contract(out_dir: &Path, cluster_id: &str) -> DhResult<KpiContract> {
    let path = find_cluster_artifact(out_dir, "decision", cluster_id, &format!("kpi_contract_{cluster_id}.json"))?;
    let raw = std::fs::read_to_string(&path).map_err(|e| DhError::MissingInputArtifact(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw).map_err(|e| DhError::Parse(format!("{}: {e}", path.display())))
}

fn read_decision_json(out_dir: &Path, cluster_id: &str) -> DhResult<Value> {
    let path = find_cluster_artifact(out_dir, "decision", cluster_id, &format!("decision_{cluster_id}.json"))?;
    let raw = std::fs::read_to_string(&path).map_err(|e| DhError::MissingInputArtifact(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw).map_err(|e| DhError::Parse(format!("{}: {e}", path.display())))
}

fn render_markdown(cluster_id: &str, contract: &KpiContract, decision: &DecisionView) -> String {
    let dh = &contract.district_heating;
    let hp = &contract.heat_pumps;
    format!(
        "# District heating vs. heat pump decision: {cluster_id}\n\n\
         **Choice:** {:?} (robust: {})\n\n\
         **Reason codes:** {}\n\n\
         ## District heating\n\
         - Feasible: {}\n\
         - LCOH (median): {:.1} EUR/MWh\n\
         - CO2 (median): {:.1} t/a\n\n\
         ## Heat pumps\n\
         - Feasible: {}\n\
         - LCOH (median): {:.1} EUR/MWh\n\
         - CO2 (median): {:.1} t/a\n",
        decision.choice,
        decision.robust,
        decision.reason_codes.join(", "),
        dh.feasible,
        dh.lcoh.p50,
        dh.co2.p50,
        hp.feasible,
        hp.lcoh.p50,
        hp.co2.p50,
    )
}

fn render_html(cluster_id: &str, contract: &KpiContract, decision: &DecisionView) -> String {
    let md = render_markdown(cluster_id, contract, decision);
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>Decision report: {cluster_id}</title></head>\
         <body><pre>{}</pre></body></html>",
        html_escape(&md)
    )
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub fn handle(cluster_id: &str, out_dir: &Path, format: ReportFormat) -> DhResult<()> {
    let contract = read_contract(out_dir, cluster_id)?;
    let decision_json = read_decision_json(out_dir, cluster_id)?;
    let decision: DecisionArtifact = serde_json::from_value(decision_json.clone())
        .map_err(|e| DhError::Parse(format!("decision artifact shape: {e}")))?;

    let report_dir = out_dir.join("report").join(cluster_id);
    std::fs::create_dir_all(&report_dir)?;

    let write_md = || -> DhResult<std::path::PathBuf> {
        let path = report_dir.join(format!("report_{cluster_id}.md"));
        std::fs::write(&path, render_markdown(cluster_id, &contract, &decision.decision))?;
        Ok(path)
    };
    let write_html = || -> DhResult<std::path::PathBuf> {
        let path = report_dir.join(format!("report_{cluster_id}.html"));
        std::fs::write(&path, render_html(cluster_id, &contract, &decision.decision))?;
        Ok(path)
    };
    let write_json = || -> DhResult<std::path::PathBuf> {
        let path = report_dir.join(format!("report_{cluster_id}.json"));
        dh_io::writers::write_json(&path, &decision_json)?;
        Ok(path)
    };

    let written: Vec<std::path::PathBuf> = match format {
        ReportFormat::Md => vec![write_md()?],
        ReportFormat::Html => vec![write_html()?],
        ReportFormat::Json => vec![write_json()?],
        ReportFormat::All => vec![write_md()?, write_html()?, write_json()?],
    };

    for path in &written {
        println!("wrote report: {}", path.display());
    }
    Ok(())
}
