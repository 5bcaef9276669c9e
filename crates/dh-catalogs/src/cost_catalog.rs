//! Cost and emission-factor tables consumed by the economics engine
//! (spec §4.12): pump and plant cost constants, HP equipment cost per kW,
//! fuel/electricity prices and emission factors, and their Monte Carlo
//! distribution shapes.

use serde::{Deserialize, Serialize};

/// Deterministic default economic parameters. All values are defaults in
/// the sense of spec §9's open question: "the upstream specific-heat and
/// specific-CO₂ factors are adjustable; the spec fixes default values but
/// does not mandate them." These are the defaults this implementation picks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostDefaults {
    /// Pump cost, EUR per kW of design pump power.
    pub pump_cost_eur_per_kw: f64,
    /// Fixed plant (energy-center) cost, EUR.
    pub plant_cost_eur: f64,
    /// HP equipment cost, EUR per kW thermal design capacity.
    pub hp_equipment_cost_eur_per_kw: f64,
    /// LV-upgrade cost, EUR per percentage point of overload above the
    /// planning loading threshold, per kW of affected design load.
    pub lv_upgrade_cost_eur_per_kw_per_pct: f64,
    /// Discount rate used in the CRF (fraction, e.g. 0.04 = 4%).
    pub discount_rate: f64,
    /// Asset economic lifetime, years.
    pub lifetime_years: f64,
    /// Fixed OPEX as a fraction of CAPEX per year.
    pub fixed_opex_share: f64,
    /// Fuel price, EUR per MWh thermal (DH boiler/CHP fuel).
    pub fuel_price_eur_per_mwh: f64,
    /// District-heating generation efficiency (fraction).
    pub dh_efficiency: f64,
    /// Electricity price, EUR per MWh (drives HP OPEX).
    pub electricity_price_eur_per_mwh: f64,
    /// Heat pump seasonal coefficient of performance.
    pub hp_cop: f64,
    /// Fuel emission factor, t CO2 per MWh thermal input.
    pub fuel_emission_factor_t_per_mwh: f64,
    /// Grid electricity emission factor, t CO2 per MWh.
    pub grid_emission_factor_t_per_mwh: f64,
    /// Planning loading threshold (fraction, e.g. 0.8) above which overload
    /// fraction starts accruing LV-upgrade cost.
    pub planning_loading_threshold_pct: f64,
}

impl Default for CostDefaults {
    fn default() -> Self {
        Self {
            pump_cost_eur_per_kw: 450.0,
            plant_cost_eur: 350_000.0,
            hp_equipment_cost_eur_per_kw: 900.0,
            lv_upgrade_cost_eur_per_kw_per_pct: 12.0,
            discount_rate: 0.04,
            lifetime_years: 25.0,
            fixed_opex_share: 0.015,
            fuel_price_eur_per_mwh: 45.0,
            dh_efficiency: 0.90,
            electricity_price_eur_per_mwh: 210.0,
            hp_cop: 3.2,
            fuel_emission_factor_t_per_mwh: 0.201,
            grid_emission_factor_t_per_mwh: 0.366,
            planning_loading_threshold_pct: 80.0,
        }
    }
}

/// A typed distribution shape for Monte Carlo sampling of one economic
/// parameter (spec §4.12).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Distribution {
    /// Normal distribution clipped to `[min, max]`.
    NormalClipped { mean: f64, std_dev: f64, min: f64, max: f64 },
    /// Triangular distribution with min/mode/max.
    Triangular { min: f64, mode: f64, max: f64 },
    /// Lognormal distribution parameterized by the underlying normal's
    /// mean and standard deviation (of ln(x)).
    Lognormal { mu: f64, sigma: f64 },
    /// Uniform distribution over `[min, max]`.
    Uniform { min: f64, max: f64 },
}

/// Default sampled-parameter distributions for the Monte Carlo engine.
/// Central values match [`CostDefaults`].
pub fn default_distributions() -> Vec<(&'static str, Distribution)> {
    let d = CostDefaults::default();
    vec![
        (
            "fuel_price_eur_per_mwh",
            Distribution::NormalClipped { mean: d.fuel_price_eur_per_mwh, std_dev: d.fuel_price_eur_per_mwh * 0.15, min: d.fuel_price_eur_per_mwh * 0.5, max: d.fuel_price_eur_per_mwh * 2.0 },
        ),
        (
            "electricity_price_eur_per_mwh",
            Distribution::NormalClipped { mean: d.electricity_price_eur_per_mwh, std_dev: d.electricity_price_eur_per_mwh * 0.2, min: d.electricity_price_eur_per_mwh * 0.4, max: d.electricity_price_eur_per_mwh * 2.5 },
        ),
        (
            "discount_rate",
            Distribution::Triangular { min: d.discount_rate * 0.5, mode: d.discount_rate, max: d.discount_rate * 2.0 },
        ),
        (
            "hp_cop",
            Distribution::Triangular { min: d.hp_cop * 0.8, mode: d.hp_cop, max: d.hp_cop * 1.15 },
        ),
        (
            "grid_emission_factor_t_per_mwh",
            Distribution::Lognormal { mu: d.grid_emission_factor_t_per_mwh.ln(), sigma: 0.25 },
        ),
        (
            "pump_cost_eur_per_kw",
            Distribution::Uniform { min: d.pump_cost_eur_per_kw * 0.85, max: d.pump_cost_eur_per_kw * 1.25 },
        ),
    ]
}
