//! Tabular-entailment auditor (spec §4.16): sentence split, a closed-set
//! deterministic rule pass, an optional model pass that may only downgrade
//! a `Neutral` rule verdict, and aggregation into an overall status.

use dh_contract::{allowed_numerics, Choice, DecisionResult, KpiContract};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Entailment,
    Contradiction,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentenceResult {
    pub statement: String,
    pub label: Label,
    pub confidence: f64,
    pub evidence: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Pass,
    Warning,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub sentence_results: Vec<SentenceResult>,
    pub status: AuditStatus,
    pub verified_count: usize,
    pub unverified_count: usize,
    pub contradiction_count: usize,
    pub overall_confidence: f64,
}

/// Split on terminal punctuation, dropping fragments shorter than 15
/// characters or containing no letters (spec §4.16 step 1).
pub fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?'])
        .map(|s| s.trim().to_string())
        .filter(|s| s.len() >= 15 && s.chars().any(|c| c.is_alphabetic()))
        .collect()
}

fn extract_numerics(sentence: &str) -> Vec<f64> {
    let mut numbers = Vec::new();
    let mut current = String::new();
    for ch in sentence.chars().chain(std::iter::once(' ')) {
        if ch.is_ascii_digit() || ch == '.' {
            current.push(ch);
        } else {
            if !current.is_empty() && current != "." {
                if let Ok(v) = current.parse::<f64>() {
                    numbers.push(v);
                }
            }
            current.clear();
        }
    }
    numbers
}

fn numeric_is_allowed(value: f64, allowed: &[(String, f64)]) -> bool {
    allowed.iter().any(|(_, a)| {
        let tolerance = (a.abs() * 0.01).max(0.01);
        (value - a).abs() <= tolerance
    })
}

/// Apply the closed set of deterministic rule patterns to one sentence
/// (spec §4.16 step 2): recommended-choice claims, only-X-feasible claims,
/// robustness claims, comparative cost/CO2 claims, and bare numeric
/// citations, each checked against the contract and decision.
fn apply_rules(
    sentence: &str,
    contract: &KpiContract,
    decision: &DecisionResult,
    robust_threshold: f64,
) -> SentenceResult {
    let lower = sentence.to_lowercase();
    let dh = &contract.district_heating;
    let hp = &contract.heat_pumps;

    if lower.contains("recommend") || lower.contains("chosen option") || lower.contains("selected option") {
        let expects_dh = lower.contains("district heating") || lower.contains(" dh");
        let expects_hp = lower.contains("heat pump");
        let matches = match decision.choice {
            Choice::Dh => expects_dh && !expects_hp,
            Choice::Hp => expects_hp && !expects_dh,
            Choice::Undecided => lower.contains("undecided") || lower.contains("no recommendation"),
        };
        if expects_dh || expects_hp || lower.contains("undecided") {
            return SentenceResult {
                statement: sentence.to_string(),
                label: if matches { Label::Entailment } else { Label::Contradiction },
                confidence: 0.95,
                evidence: "decision.choice".to_string(),
            };
        }
    }

    if lower.contains("only") && lower.contains("feasible") {
        let claims_dh_only = lower.contains("district heating") || lower.contains(" dh ");
        let claims_hp_only = lower.contains("heat pump");
        let actual = (dh.feasible, hp.feasible);
        let matches = if claims_dh_only {
            actual == (true, false)
        } else if claims_hp_only {
            actual == (false, true)
        } else {
            false
        };
        return SentenceResult {
            statement: sentence.to_string(),
            label: if matches { Label::Entailment } else { Label::Contradiction },
            confidence: 0.9,
            evidence: "district_heating.feasible, heat_pumps.feasible".to_string(),
        };
    }

    if lower.contains("robust") {
        let win_fraction = match decision.choice {
            Choice::Dh => contract.monte_carlo.map(|mc| mc.dh_wins_fraction),
            Choice::Hp => contract.monte_carlo.map(|mc| mc.hp_wins_fraction),
            Choice::Undecided => None,
        };
        let claims_robust = !lower.contains("not robust") && !lower.contains("sensitive");
        let label = match win_fraction {
            None => Label::Contradiction,
            Some(w) => {
                let is_robust = w >= robust_threshold;
                if claims_robust == is_robust {
                    Label::Entailment
                } else {
                    Label::Contradiction
                }
            }
        };
        return SentenceResult {
            statement: sentence.to_string(),
            label,
            confidence: 0.85,
            evidence: "monte_carlo.dh_wins_fraction/hp_wins_fraction".to_string(),
        };
    }

    let comparative_cost = lower.contains("cheaper") || lower.contains("lower cost") || lower.contains("less expensive");
    let comparative_co2 = lower.contains("lower emission") || lower.contains("lower co2") || lower.contains("less carbon");
    if comparative_cost || comparative_co2 {
        let (dh_value, hp_value, evidence) = if comparative_cost {
            (dh.lcoh.p50, hp.lcoh.p50, "district_heating.lcoh.p50, heat_pumps.lcoh.p50")
        } else {
            (dh.co2.p50, hp.co2.p50, "district_heating.co2.p50, heat_pumps.co2.p50")
        };
        let claims_dh_better = lower.contains("district heating") || lower.contains(" dh ");
        let dh_is_better = dh_value < hp_value;
        let matches = claims_dh_better == dh_is_better;
        return SentenceResult {
            statement: sentence.to_string(),
            label: if matches { Label::Entailment } else { Label::Contradiction },
            confidence: 0.8,
            evidence: evidence.to_string(),
        };
    }

    let numerics = extract_numerics(sentence);
    if !numerics.is_empty() {
        let allowed = allowed_numerics(contract);
        let all_allowed = numerics.iter().all(|n| numeric_is_allowed(*n, &allowed));
        return SentenceResult {
            statement: sentence.to_string(),
            label: if all_allowed { Label::Entailment } else { Label::Contradiction },
            confidence: 0.75,
            evidence: "allowed_numerics(contract)".to_string(),
        };
    }

    SentenceResult { statement: sentence.to_string(), label: Label::Neutral, confidence: 0.5, evidence: "no rule matched".to_string() }
}

/// An optional model pass over rule-`Neutral` sentences: may only move
/// `Neutral` to `Entailment`/`Contradiction`, never override a rule
/// verdict (spec §4.16 step 3).
pub trait EntailmentModel: Send + Sync {
    fn classify(&self, sentence: &str, flattened_contract: &str) -> Result<Label, dh_core::DhError>;
}

fn flatten_contract_for_model(contract: &KpiContract) -> String {
    serde_json::to_string(contract).unwrap_or_default()
}

/// Run the full audit: rule pass over every sentence, then (if `model` is
/// `Some` and not yet disabled) a model pass over the rule-Neutral
/// sentences, then aggregation (spec §4.16 steps 2-4).
pub fn audit(
    text: &str,
    contract: &KpiContract,
    decision: &DecisionResult,
    robust_threshold: f64,
    model: Option<&dyn EntailmentModel>,
) -> ValidationReport {
    let sentences = split_sentences(text);
    let mut results: Vec<SentenceResult> = sentences
        .iter()
        .map(|s| apply_rules(s, contract, decision, robust_threshold))
        .collect();

    if let Some(model) = model {
        let flattened = flatten_contract_for_model(contract);
        let mut model_disabled = false;
        for result in results.iter_mut() {
            if model_disabled || result.label != Label::Neutral {
                continue;
            }
            match model.classify(&result.statement, &flattened) {
                Ok(label @ (Label::Entailment | Label::Contradiction)) => {
                    result.label = label;
                    result.confidence = 0.65;
                    result.evidence = format!("{}; model pass", result.evidence);
                }
                Ok(Label::Neutral) => {}
                Err(_) => {
                    model_disabled = true;
                }
            }
        }
    }

    let verified_count = results.iter().filter(|r| r.label == Label::Entailment).count();
    let unverified_count = results.iter().filter(|r| r.label == Label::Neutral).count();
    let contradiction_count = results.iter().filter(|r| r.label == Label::Contradiction).count();
    let total = results.len().max(1);

    let status = if contradiction_count > 0 {
        AuditStatus::Fail
    } else if unverified_count * 2 >= total {
        AuditStatus::Warning
    } else {
        AuditStatus::Pass
    };

    let overall_confidence = if results.is_empty() {
        0.0
    } else {
        results.iter().map(|r| r.confidence).sum::<f64>() / results.len() as f64
    };

    ValidationReport { sentence_results: results, status, verified_count, unverified_count, contradiction_count, overall_confidence }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dh_contract::config::DecisionConfig;
    use dh_contract::contract::*;
    use dh_contract::decide;
    use dh_economics::QuantileSummary;

    fn contract() -> KpiContract {
        KpiContract {
            version: CONTRACT_VERSION.to_string(),
            cluster_id: "c1".into(),
            metadata: ContractMetadata { created_utc: chrono::Utc::now(), inputs: vec![], git_commit: None, input_digest: None },
            district_heating: DistrictHeatingBlock {
                feasible: true,
                reasons: vec!["DH_OK".into()],
                lcoh: QuantileSummary { p05: 70.0, p50: 75.2, p95: 80.0 },
                co2: QuantileSummary { p05: 200.0, p50: 220.0, p95: 240.0 },
                hydraulics: HydraulicsBlock { velocity_ok: true, dp_ok: true, v_max_ms: 1.2, v_share_within_limits: 1.0 },
                losses: LossesBlock { total_length_m: 500.0, loss_share_pct: 4.0, pump_power_kw: 5.0 },
            },
            heat_pumps: HeatPumpsBlock {
                feasible: false,
                reasons: vec!["HP_TRAFO_VIOLATION".into()],
                lcoh: QuantileSummary { p05: 140.0, p50: 150.0, p95: 160.0 },
                co2: QuantileSummary { p05: 120.0, p50: 125.0, p95: 140.0 },
                lv_grid: LvGridBlock { planning_warning: true, max_feeder_loading_pct: 130.0, voltage_violations_total: 2, line_violations_total: 0 },
                hp_system: HpSystemBlock { hp_total_kw_design: 900.0 },
            },
            monte_carlo: None,
        }
    }

    #[test]
    fn splits_and_drops_short_fragments() {
        let sentences = split_sentences("DH is recommended for this cluster. Ok. Hydraulics check passed fully.");
        assert_eq!(sentences.len(), 2);
    }

    #[test]
    fn catches_hallucinated_numeric() {
        let c = contract();
        let decision = decide(&c, &DecisionConfig::default());
        let text = "District heating costs 60 EUR per megawatt hour for this cluster today.";
        let report = audit(text, &c, &decision, 0.70, None);
        assert_eq!(report.status, AuditStatus::Fail);
        assert!(report.contradiction_count >= 1);
    }

    #[test]
    fn accepts_true_only_feasible_claim() {
        let c = contract();
        let decision = decide(&c, &DecisionConfig::default());
        let text = "Only district heating is feasible for this cluster given the grid constraints.";
        let report = audit(text, &c, &decision, 0.70, None);
        assert_eq!(report.status, AuditStatus::Pass);
        assert_eq!(report.contradiction_count, 0);
    }

    #[test]
    fn rejects_false_only_feasible_claim() {
        let c = contract();
        let decision = decide(&c, &DecisionConfig::default());
        let text = "Only heat pumps are feasible for this cluster given the grid constraints.";
        let report = audit(text, &c, &decision, 0.70, None);
        assert_eq!(report.status, AuditStatus::Fail);
    }

    #[test]
    fn model_pass_cannot_override_rule_contradiction() {
        struct AlwaysEntail;
        impl EntailmentModel for AlwaysEntail {
            fn classify(&self, _sentence: &str, _contract: &str) -> Result<Label, dh_core::DhError> {
                Ok(Label::Entailment)
            }
        }
        let c = contract();
        let decision = decide(&c, &DecisionConfig::default());
        let text = "District heating costs 60 EUR per megawatt hour for this cluster today.";
        let report = audit(text, &c, &decision, 0.70, Some(&AlwaysEntail));
        assert_eq!(report.contradiction_count, 1);
    }
}
