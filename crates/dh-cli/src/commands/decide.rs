//! `decide` (spec §6): assemble the KPI contract from the CHA/DHA/economics
//! artifacts on disk, run the deterministic decision rule, and optionally
//! generate explanatory prose. Writes `kpi_contract_<cluster_id>.json` and
//! `decide_<cluster_id>.json` (the latter carries the `validation` block of
//! sentence-level results when `--explain` is set).

use crate::artifacts::{read_json_artifact, ChaArtifact, DhaArtifact, EconomicsArtifact};
use crate::cli::StyleArg;
use crate::config::RunConfig;
use dh_contract::{assemble_contract, decide as run_decision, AssemblyInputs, DecisionResult};
use dh_core::{DhError, DhResult};
use dh_explain::{
    generate_with_feedback, FeedbackConfig, GenerationOutcome, HttpTextGenerator, Style, TextGenerator,
    UnavailableGenerator,
};
use dh_io::artifact_discovery::find_cluster_artifact;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct DecisionArtifact {
    cluster_id: String,
    decision: DecisionResult,
    validation: Option<ExplanationDto>,
}

#[derive(Debug, Serialize)]
struct ExplanationDto {
    text: String,
    style: String,
    status: String,
    verified_count: usize,
    unverified_count: usize,
    contradiction_count: usize,
    overall_confidence: f64,
    used_fallback: bool,
    sentence_results: Vec<dh_explain::SentenceResult>,
}

impl ExplanationDto {
    fn from_outcome(style: Style, outcome: GenerationOutcome) -> Self {
        Self {
            text: outcome.text,
            style: format!("{style:?}"),
            status: format!("{:?}", outcome.report.status),
            verified_count: outcome.report.verified_count,
            unverified_count: outcome.report.unverified_count,
            contradiction_count: outcome.report.contradiction_count,
            overall_confidence: outcome.report.overall_confidence,
            used_fallback: outcome.used_fallback,
            sentence_results: outcome.report.sentence_results,
        }
    }
}

fn build_generator(config: &RunConfig) -> Box<dyn TextGenerator> {
    let pipeline = &config.pipeline;
    if pipeline.force_template {
        return Box::new(UnavailableGenerator);
    }
    match (&pipeline.llm_model_name, &pipeline.llm_api_key) {
        (Some(model), Some(api_key)) if !api_key.is_empty() => {
            Box::new(HttpTextGenerator::new("https://api.openai.com/v1/chat/completions", model.clone(), api_key.clone()))
        }
        _ => Box::new(UnavailableGenerator),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn handle(
    cluster_id: &str,
    out_dir: &Path,
    explain: bool,
    style: StyleArg,
    no_fallback: bool,
    config: &RunConfig,
) -> DhResult<()> {
    let cha_path = find_cluster_artifact(out_dir, "cha", cluster_id, "cha_kpis.json")?;
    let dha_path = find_cluster_artifact(out_dir, "dha", cluster_id, "dha_kpis.json")?;
    let eco_path = find_cluster_artifact(out_dir, "economics", cluster_id, "economics.json")?;
    let cha: ChaArtifact = read_json_artifact(&cha_path)?;
    let dha: DhaArtifact = read_json_artifact(&dha_path)?;
    let eco: EconomicsArtifact = read_json_artifact(&eco_path)?;

    let dh_deterministic: dh_economics::CostResult = eco.dh.into();
    let hp_deterministic: dh_economics::CostResult = eco.hp.into();
    let contract = assemble_contract(AssemblyInputs {
        cluster_id,
        cha: &cha.kpis,
        dha: &dha.kpis,
        dh_deterministic: &dh_deterministic,
        hp_deterministic: &hp_deterministic,
        pump_power_kw: cha.pump_power_kw,
        hp_total_kw_design: dha.hp_total_kw_design,
        monte_carlo: eco.monte_carlo.as_ref(),
        inputs: vec![cha_path.display().to_string(), dha_path.display().to_string(), eco_path.display().to_string()],
        input_digest: None,
        git_commit: None,
    })?;

    let decision = run_decision(&contract, &config.pipeline.decision);

    let contract_path = out_dir.join("decision").join(cluster_id).join(format!("kpi_contract_{cluster_id}.json"));
    dh_io::writers::write_json(&contract_path, &contract)?;

    let validation = if explain {
        let style: Style = style.into();
        let generator = build_generator(config);
        let feedback_config = FeedbackConfig {
            max_iterations: config.pipeline.validation.max_iterations as u32,
            temperature: 0.0,
            timeout: Duration::from_secs(config.pipeline.llm_timeout_s),
            robust_win_fraction_threshold: config.pipeline.decision.robust_win_fraction,
        };
        let outcome = generate_with_feedback(&contract, &decision, style, generator.as_ref(), None, &feedback_config);

        if no_fallback && outcome.used_fallback {
            return Err(DhError::ExternalServiceUnavailable(
                "external text generator unavailable and --no-fallback was set".to_string(),
            ));
        }

        let markdown_path = out_dir.join("explanation").join(cluster_id).join(format!("explanation_{cluster_id}.md"));
        if let Some(parent) = markdown_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&markdown_path, &outcome.text)?;

        Some(ExplanationDto::from_outcome(style, outcome))
    } else {
        None
    };

    let artifact = DecisionArtifact { cluster_id: cluster_id.to_string(), decision: decision.clone(), validation };
    let decision_path = out_dir.join("decision").join(cluster_id).join(format!("decision_{cluster_id}.json"));
    dh_io::writers::write_json(&decision_path, &artifact)?;

    println!(
        "decision for {cluster_id}: choice={:?} robust={} -> {}",
        decision.choice, decision.robust, decision_path.display()
    );
    Ok(())
}
