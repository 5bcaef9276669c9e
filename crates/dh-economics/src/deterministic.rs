//! Deterministic LCOH/CO2 evaluation (spec §4.12).
//!
//! `LCOH = (CAPEX * CRF + annual OPEX) / annual heat (MWh)`. DH CAPEX sums
//! pipe cost by DN, pump cost per kW, and a plant cost; HP CAPEX sums
//! equipment cost per kW thermal and a conditional LV-upgrade term
//! proportional to the overload fraction above the planning loading
//! threshold. CO2 is computed analogously via fuel/grid emission factors.

use crate::crf::capital_recovery_factor;
use dh_catalogs::cost_catalog::CostDefaults;

/// Inputs to the DH cost evaluation that CHA/catalog lookups produce and
/// this crate does not derive itself.
#[derive(Debug, Clone, Copy)]
pub struct DhCostInputs {
    pub pipe_capex_eur: f64,
    pub pump_design_kw: f64,
    pub annual_heat_mwh: f64,
}

/// Inputs to the HP cost evaluation. `max_feeder_loading_pct` comes from
/// the DHA KPI block; the overload-above-threshold term is derived here.
#[derive(Debug, Clone, Copy)]
pub struct HpCostInputs {
    pub hp_design_kw: f64,
    pub annual_heat_mwh: f64,
    pub max_feeder_loading_pct: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct CostResult {
    pub capex_eur: f64,
    pub annual_opex_eur: f64,
    pub lcoh_eur_per_mwh: f64,
    pub co2_t_per_a: f64,
}

pub fn evaluate_dh(inputs: &DhCostInputs, params: &CostDefaults) -> CostResult {
    let capex_eur = inputs.pipe_capex_eur + inputs.pump_design_kw * params.pump_cost_eur_per_kw + params.plant_cost_eur;
    let fuel_input_mwh = if params.dh_efficiency > 1e-9 { inputs.annual_heat_mwh / params.dh_efficiency } else { 0.0 };
    let annual_opex_eur = params.fixed_opex_share * capex_eur + fuel_input_mwh * params.fuel_price_eur_per_mwh;
    let crf = capital_recovery_factor(params.discount_rate, params.lifetime_years);
    let lcoh_eur_per_mwh = if inputs.annual_heat_mwh > 1e-9 {
        (capex_eur * crf + annual_opex_eur) / inputs.annual_heat_mwh
    } else {
        0.0
    };
    let co2_t_per_a = fuel_input_mwh * params.fuel_emission_factor_t_per_mwh;
    CostResult { capex_eur, annual_opex_eur, lcoh_eur_per_mwh, co2_t_per_a }
}

pub fn evaluate_hp(inputs: &HpCostInputs, params: &CostDefaults) -> CostResult {
    let overload_pp = (inputs.max_feeder_loading_pct - params.planning_loading_threshold_pct).max(0.0);
    let lv_upgrade_eur = overload_pp * params.lv_upgrade_cost_eur_per_kw_per_pct * inputs.hp_design_kw;
    let capex_eur = inputs.hp_design_kw * params.hp_equipment_cost_eur_per_kw + lv_upgrade_eur;
    let electricity_input_mwh = if params.hp_cop > 1e-9 { inputs.annual_heat_mwh / params.hp_cop } else { 0.0 };
    let annual_opex_eur = params.fixed_opex_share * capex_eur + electricity_input_mwh * params.electricity_price_eur_per_mwh;
    let crf = capital_recovery_factor(params.discount_rate, params.lifetime_years);
    let lcoh_eur_per_mwh = if inputs.annual_heat_mwh > 1e-9 {
        (capex_eur * crf + annual_opex_eur) / inputs.annual_heat_mwh
    } else {
        0.0
    };
    let co2_t_per_a = electricity_input_mwh * params.grid_emission_factor_t_per_mwh;
    CostResult { capex_eur, annual_opex_eur, lcoh_eur_per_mwh, co2_t_per_a }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dh_lcoh_is_positive_and_finite() {
        let inputs = DhCostInputs { pipe_capex_eur: 500_000.0, pump_design_kw: 20.0, annual_heat_mwh: 4000.0 };
        let result = evaluate_dh(&inputs, &CostDefaults::default());
        assert!(result.lcoh_eur_per_mwh > 0.0);
        assert!(result.lcoh_eur_per_mwh.is_finite());
        assert!(result.co2_t_per_a > 0.0);
    }

    #[test]
    fn hp_lv_upgrade_only_applies_above_threshold() {
        let params = CostDefaults::default();
        let below = HpCostInputs { hp_design_kw: 100.0, annual_heat_mwh: 2000.0, max_feeder_loading_pct: 50.0 };
        let above = HpCostInputs { hp_design_kw: 100.0, annual_heat_mwh: 2000.0, max_feeder_loading_pct: 95.0 };
        let result_below = evaluate_hp(&below, &params);
        let result_above = evaluate_hp(&above, &params);
        assert!(result_above.capex_eur > result_below.capex_eur);
    }

    #[test]
    fn zero_heat_demand_is_zero_lcoh_not_nan() {
        let inputs = DhCostInputs { pipe_capex_eur: 10_000.0, pump_design_kw: 1.0, annual_heat_mwh: 0.0 };
        let result = evaluate_dh(&inputs, &CostDefaults::default());
        assert_eq!(result.lcoh_eur_per_mwh, 0.0);
    }
}
