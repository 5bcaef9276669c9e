//! The regeneration feedback loop (spec §4.15, §4.16): on an audit failure
//! or warning, ask the generator to revise, re-audit, and stop after
//! `max_iterations`, on an unchanged result, or on a generator failure.

use crate::auditor::{audit, AuditStatus, EntailmentModel, ValidationReport};
use crate::generator::TextGenerator;
use crate::prompt::build_prompt;
use crate::style::Style;
use dh_contract::{DecisionResult, KpiContract};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct FeedbackConfig {
    pub max_iterations: u32,
    pub temperature: f64,
    pub timeout: Duration,
    pub robust_win_fraction_threshold: f64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self { max_iterations: 3, temperature: 0.2, timeout: Duration::from_secs(30), robust_win_fraction_threshold: 0.70 }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub text: String,
    pub report: ValidationReport,
    pub iterations: u32,
    pub used_fallback: bool,
}

fn revision_prompt(base_prompt: &str, previous_text: &str, report: &ValidationReport) -> String {
    let contradictions: Vec<&str> = report
        .sentence_results
        .iter()
        .filter(|r| r.label == crate::auditor::Label::Contradiction)
        .map(|r| r.statement.as_str())
        .collect();
    format!(
        "{base_prompt}\n\nThe previous draft below contains statements that contradict the contract. \
         Revise it, keeping the same structure, and remove or correct the contradicting statements.\n\
         Previous draft:\n{previous_text}\n\nContradicting statements:\n- {}",
        contradictions.join("\n- ")
    )
}

/// Generate explanatory text for a contract/decision pair, auditing and
/// regenerating up to `config.max_iterations` times, falling back to the
/// deterministic template if the generator is unavailable or the loop is
/// exhausted without a passing or warning audit.
pub fn generate_with_feedback(
    contract: &KpiContract,
    decision: &DecisionResult,
    style: Style,
    generator: &dyn TextGenerator,
    model: Option<&dyn EntailmentModel>,
    config: &FeedbackConfig,
) -> GenerationOutcome {
    let base_prompt = build_prompt(contract, decision, style);

    let mut current_prompt = base_prompt.clone();
    let mut previous_text: Option<String> = None;

    for iteration in 1..=config.max_iterations {
        let generated = generator.generate(&current_prompt, config.temperature, config.timeout);
        let text = match generated {
            Ok(text) => text,
            Err(_) => break,
        };

        let report = audit(&text, contract, decision, config.robust_win_fraction_threshold, model);

        if !matches!(report.status, AuditStatus::Fail) {
            return GenerationOutcome { text, report, iterations: iteration, used_fallback: false };
        }

        if previous_text.as_deref() == Some(text.as_str()) {
            break;
        }

        current_prompt = revision_prompt(&base_prompt, &text, &report);
        previous_text = Some(text);
    }

    let fallback_text = crate::template::render_template(contract, decision, style);
    let fallback_report = audit(&fallback_text, contract, decision, config.robust_win_fraction_threshold, model);
    GenerationOutcome { text: fallback_text, report: fallback_report, iterations: config.max_iterations, used_fallback: true }
}
