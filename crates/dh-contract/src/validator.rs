//! Contract assembler validation (spec §4.13): rejects the record when
//! required keys are missing, versions mismatch, violation counts are
//! negative, reason codes fall outside the closed set, quantile ordering is
//! violated, or `max_feeder_loading_pct` is out of `[0, 1000]`.
//!
//! A present-then-typed check-and-bail idiom: "required JSON key present
//! with the right declared type" plus this domain's semantic
//! range/closed-set/ordering rules.

use crate::contract::{closed_reason_codes, KpiContract, CONTRACT_VERSION};
use dh_core::{DhError, DhResult};
use serde_json::Value;

/// Required key paths (dot-separated) a contract JSON document must carry,
/// used by [`validate_json_shape`] ahead of (or instead of) typed
/// deserialization -- e.g. when validating a contract read back from disk
/// without fully trusting its producer.
pub fn required_json_keys() -> Vec<&'static str> {
    vec![
        "version",
        "cluster_id",
        "metadata.created_utc",
        "district_heating.feasible",
        "district_heating.reasons",
        "district_heating.lcoh.p05",
        "district_heating.lcoh.p50",
        "district_heating.lcoh.p95",
        "district_heating.co2.p05",
        "district_heating.co2.p50",
        "district_heating.co2.p95",
        "district_heating.hydraulics.velocity_ok",
        "district_heating.hydraulics.dp_ok",
        "heat_pumps.feasible",
        "heat_pumps.reasons",
        "heat_pumps.lcoh.p05",
        "heat_pumps.lcoh.p50",
        "heat_pumps.lcoh.p95",
        "heat_pumps.co2.p05",
        "heat_pumps.co2.p50",
        "heat_pumps.co2.p95",
        "heat_pumps.lv_grid.max_feeder_loading_pct",
    ]
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Structural validation over a raw JSON document: every path from
/// [`required_json_keys`] must be present and (for fields named here)
/// carry the declared JSON type. This is the layer that catches a required
/// key deleted or retyped before the document ever reaches typed
/// deserialization (spec §8's "mutating any required key... yields
/// `SchemaValidation`").
pub fn validate_json_shape(doc: &Value) -> DhResult<()> {
    for path in required_json_keys() {
        let value = lookup(doc, path).ok_or_else(|| {
            DhError::SchemaValidation(format!("required key '{path}' missing"))
        })?;
        let numeric_field = path.ends_with(".p05")
            || path.ends_with(".p50")
            || path.ends_with(".p95")
            || path.ends_with("max_feeder_loading_pct");
        let bool_field = path.ends_with("feasible") || path.ends_with("_ok");
        let array_field = path.ends_with("reasons");
        if numeric_field && !value.is_number() {
            return Err(DhError::SchemaValidation(format!("'{path}' must be a number, found {value}")));
        }
        if bool_field && !value.is_boolean() {
            return Err(DhError::SchemaValidation(format!("'{path}' must be a boolean, found {value}")));
        }
        if array_field && !value.is_array() {
            return Err(DhError::SchemaValidation(format!("'{path}' must be an array, found {value}")));
        }
    }
    Ok(())
}

fn check_quantile_order(label: &str, q: &dh_economics::QuantileSummary) -> DhResult<()> {
    if !(q.p05 <= q.p50 && q.p50 <= q.p95) {
        return Err(DhError::SchemaValidation(format!(
            "{label} quantiles out of order: p05={} p50={} p95={}",
            q.p05, q.p50, q.p95
        )));
    }
    Ok(())
}

fn check_reasons(label: &str, reasons: &[String]) -> DhResult<()> {
    if reasons.is_empty() {
        return Err(DhError::SchemaValidation(format!("{label} reasons list must be non-empty")));
    }
    let closed = closed_reason_codes();
    for reason in reasons {
        if !closed.contains(&reason.as_str()) {
            return Err(DhError::SchemaValidation(format!(
                "{label} reason '{reason}' is not a member of the closed reason-code set"
            )));
        }
    }
    Ok(())
}

/// Semantic validation of an already-typed [`KpiContract`]: version pin,
/// non-empty closed-set reasons, quantile ordering, win-fraction range, and
/// `max_feeder_loading_pct` bounds (spec §4.13).
pub fn validate_contract(contract: &KpiContract) -> DhResult<()> {
    if contract.version != CONTRACT_VERSION {
        return Err(DhError::SchemaValidation(format!(
            "unsupported contract version '{}', expected '{CONTRACT_VERSION}'",
            contract.version
        )));
    }

    check_reasons("district_heating", &contract.district_heating.reasons)?;
    check_reasons("heat_pumps", &contract.heat_pumps.reasons)?;

    check_quantile_order("district_heating.lcoh", &contract.district_heating.lcoh)?;
    check_quantile_order("district_heating.co2", &contract.district_heating.co2)?;
    check_quantile_order("heat_pumps.lcoh", &contract.heat_pumps.lcoh)?;
    check_quantile_order("heat_pumps.co2", &contract.heat_pumps.co2)?;

    if contract.heat_pumps.lv_grid.voltage_violations_total < 0 {
        return Err(DhError::SchemaValidation("voltage_violations_total must be >= 0".into()));
    }
    if contract.heat_pumps.lv_grid.line_violations_total < 0 {
        return Err(DhError::SchemaValidation("line_violations_total must be >= 0".into()));
    }
    let loading = contract.heat_pumps.lv_grid.max_feeder_loading_pct;
    if !(0.0..=1000.0).contains(&loading) {
        return Err(DhError::SchemaValidation(format!(
            "max_feeder_loading_pct {loading} outside [0, 1000]"
        )));
    }

    if let Some(mc) = &contract.monte_carlo {
        if !(0.0..=1.0).contains(&mc.dh_wins_fraction) || !(0.0..=1.0).contains(&mc.hp_wins_fraction) {
            return Err(DhError::SchemaValidation("win fractions must be in [0, 1]".into()));
        }
        if (mc.dh_wins_fraction + mc.hp_wins_fraction - 1.0).abs() > 1e-9 {
            return Err(DhError::SchemaValidation("win fractions must sum to 1".into()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::*;
    use dh_economics::QuantileSummary;

    fn valid_contract() -> KpiContract {
        KpiContract {
            version: CONTRACT_VERSION.to_string(),
            cluster_id: "c1".into(),
            metadata: ContractMetadata {
                created_utc: chrono::Utc::now(),
                inputs: vec![],
                git_commit: None,
                input_digest: None,
            },
            district_heating: DistrictHeatingBlock {
                feasible: true,
                reasons: vec!["DH_OK".into()],
                lcoh: QuantileSummary { p05: 60.0, p50: 70.0, p95: 80.0 },
                co2: QuantileSummary { p05: 200.0, p50: 220.0, p95: 240.0 },
                hydraulics: HydraulicsBlock { velocity_ok: true, dp_ok: true, v_max_ms: 1.2, v_share_within_limits: 1.0 },
                losses: LossesBlock { total_length_m: 500.0, loss_share_pct: 4.0, pump_power_kw: 5.0 },
            },
            heat_pumps: HeatPumpsBlock {
                feasible: true,
                reasons: vec!["HP_OK".into()],
                lcoh: QuantileSummary { p05: 75.0, p50: 82.0, p95: 90.0 },
                co2: QuantileSummary { p05: 110.0, p50: 125.0, p95: 140.0 },
                lv_grid: LvGridBlock { planning_warning: false, max_feeder_loading_pct: 60.0, voltage_violations_total: 0, line_violations_total: 0 },
                hp_system: HpSystemBlock { hp_total_kw_design: 1200.0 },
            },
            monte_carlo: Some(MonteCarloBlock { dh_wins_fraction: 0.6, hp_wins_fraction: 0.4, n_samples: 500, seed: 42 }),
        }
    }

    #[test]
    fn accepts_valid_contract() {
        assert!(validate_contract(&valid_contract()).is_ok());
    }

    #[test]
    fn rejects_wrong_version() {
        let mut c = valid_contract();
        c.version = "0.9".into();
        assert!(validate_contract(&c).is_err());
    }

    #[test]
    fn rejects_empty_reasons() {
        let mut c = valid_contract();
        c.district_heating.reasons.clear();
        assert!(validate_contract(&c).is_err());
    }

    #[test]
    fn rejects_unknown_reason_code() {
        let mut c = valid_contract();
        c.district_heating.reasons = vec!["NOT_A_REAL_CODE".into()];
        assert!(validate_contract(&c).is_err());
    }

    #[test]
    fn rejects_quantile_disorder() {
        let mut c = valid_contract();
        c.district_heating.lcoh.p50 = 10.0;
        assert!(validate_contract(&c).is_err());
    }

    #[test]
    fn rejects_feeder_loading_out_of_range() {
        let mut c = valid_contract();
        c.heat_pumps.lv_grid.max_feeder_loading_pct = 1500.0;
        assert!(validate_contract(&c).is_err());
    }

    #[test]
    fn rejects_win_fractions_not_summing_to_one() {
        let mut c = valid_contract();
        c.monte_carlo.as_mut().unwrap().hp_wins_fraction = 0.1;
        assert!(validate_contract(&c).is_err());
    }

    #[test]
    fn json_shape_rejects_missing_key() {
        let mut doc = serde_json::to_value(valid_contract()).unwrap();
        doc.as_object_mut().unwrap().remove("version");
        assert!(validate_json_shape(&doc).is_err());
    }

    #[test]
    fn json_shape_rejects_retyped_required_field() {
        let mut doc = serde_json::to_value(valid_contract()).unwrap();
        doc["district_heating"]["feasible"] = serde_json::json!("yes");
        assert!(validate_json_shape(&doc).is_err());
    }

    #[test]
    fn json_shape_accepts_valid_document() {
        let doc = serde_json::to_value(valid_contract()).unwrap();
        assert!(validate_json_shape(&doc).is_ok());
    }
}
