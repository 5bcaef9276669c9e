//! The deterministic contract-only fallback renderer (spec §4.15: "if the
//! external generator is unavailable, disabled, or the feedback loop is
//! exhausted, fall back to a template that cites only contract fields").
//! Never calls the entailment auditor on itself at render time; the caller
//! is expected to audit the result the same way as a model-generated text,
//! since a bug here should still be caught instead of silently trusted.

use crate::prompt::{choice_label, EN_13941_1, VDE_AR_N_4100};
use crate::style::Style;
use dh_contract::{DecisionResult, KpiContract};

/// Render prose directly from contract fields and the decision result,
/// with no external call and no randomness (spec §4.15's fallback path).
pub fn render_template(contract: &KpiContract, decision: &DecisionResult, style: Style) -> String {
    let dh = &contract.district_heating;
    let hp = &contract.heat_pumps;
    let mut sections: Vec<(String, String)> = Vec::new();

    sections.push((
        "Recommendation".to_string(),
        format!(
            "For cluster '{}', the recommended option is {}. Robustness: {}.",
            contract.cluster_id,
            choice_label(decision.choice),
            if decision.robust { "robust across sampled uncertainty" } else { "sensitive to sampled uncertainty" }
        ),
    ));

    if style.section_headings().contains(&"Why") {
        sections.push((
            "Why".to_string(),
            format!(
                "District heating LCOH is {:.2} EUR/MWh (heat pumps: {:.2} EUR/MWh); \
                 district heating CO2 is {:.2} t/a (heat pumps: {:.2} t/a).",
                dh.lcoh.p50, hp.lcoh.p50, dh.co2.p50, hp.co2.p50
            ),
        ));
    }

    if style.section_headings().contains(&"Feasibility") {
        sections.push((
            "Feasibility".to_string(),
            format!(
                "District heating feasible: {} ({}). Heat pumps feasible: {} ({}).",
                dh.feasible,
                dh.reasons.join(", "),
                hp.feasible,
                hp.reasons.join(", ")
            ),
        ));
    }

    if style.section_headings().contains(&"Hydraulics & Grid") {
        sections.push((
            "Hydraulics & Grid".to_string(),
            format!(
                "Per {EN_13941_1}, maximum pipe velocity is {:.2} m/s (velocity_ok={}, dp_ok={}). \
                 Per {VDE_AR_N_4100}, maximum feeder loading is {:.1}% (planning_warning={}).",
                dh.hydraulics.v_max_ms, dh.hydraulics.velocity_ok, dh.hydraulics.dp_ok,
                hp.lv_grid.max_feeder_loading_pct, hp.lv_grid.planning_warning
            ),
        ));
    }

    if style.section_headings().contains(&"Cost & CO2") {
        sections.push((
            "Cost & CO2".to_string(),
            format!(
                "District heating LCOH p05/p50/p95: {:.2}/{:.2}/{:.2} EUR/MWh, CO2 p05/p50/p95: {:.2}/{:.2}/{:.2} t/a. \
                 Heat pumps LCOH p05/p50/p95: {:.2}/{:.2}/{:.2} EUR/MWh, CO2 p05/p50/p95: {:.2}/{:.2}/{:.2} t/a.",
                dh.lcoh.p05, dh.lcoh.p50, dh.lcoh.p95, dh.co2.p05, dh.co2.p50, dh.co2.p95,
                hp.lcoh.p05, hp.lcoh.p50, hp.lcoh.p95, hp.co2.p05, hp.co2.p50, hp.co2.p95
            ),
        ));
    }

    let robustness_heading = style
        .section_headings()
        .iter()
        .find(|h| h.contains("Robustness"))
        .copied();
    if let Some(heading) = robustness_heading {
        let body = match &contract.monte_carlo {
            Some(mc) => format!(
                "Across {} Monte Carlo samples (seed {}), district heating wins {:.0}% and heat pumps win {:.0}%.",
                mc.n_samples, mc.seed, mc.dh_wins_fraction * 100.0, mc.hp_wins_fraction * 100.0
            ),
            None => "Monte Carlo was not run for this cluster.".to_string(),
        };
        sections.push((heading.to_string(), body));
    }

    if style.section_headings().contains(&"Standards Referenced") {
        sections.push((
            "Standards Referenced".to_string(),
            format!("{EN_13941_1} (district heating hydraulics), {VDE_AR_N_4100} (low-voltage grid connection)."),
        ));
    }

    sections.into_iter().map(|(heading, body)| format!("## {heading}\n{body}")).collect::<Vec<_>>().join("\n\n")
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
                feasible: true,
                reasons: vec!["HP_OK".into()],
                lcoh: QuantileSummary { p05: 78.0, p50: 82.5, p95: 90.0 },
                co2: QuantileSummary { p05: 110.0, p50: 125.0, p95: 140.0 },
                lv_grid: LvGridBlock { planning_warning: false, max_feeder_loading_pct: 60.0, voltage_violations_total: 0, line_violations_total: 0 },
                hp_system: HpSystemBlock { hp_total_kw_design: 1000.0 },
            },
            monte_carlo: Some(MonteCarloBlock { dh_wins_fraction: 0.78, hp_wins_fraction: 0.22, n_samples: 500, seed: 42 }),
        }
    }

    #[test]
    fn detailed_style_renders_every_section() {
        let c = contract();
        let decision = decide(&c, &DecisionConfig::default());
        let text = render_template(&c, &decision, Style::Detailed);
        for heading in Style::Detailed.section_headings() {
            assert!(text.contains(heading), "missing section {heading}");
        }
    }

    #[test]
    fn executive_style_is_short_and_skips_technical_sections() {
        let c = contract();
        let decision = decide(&c, &DecisionConfig::default());
        let text = render_template(&c, &decision, Style::Executive);
        assert!(text.contains("Recommendation"));
        assert!(!text.contains("Standards Referenced"));
    }
}
