//! # dh-economics: CRF-based LCOH/CO2 evaluator and seeded Monte Carlo (spec §4.12)
//!
//! Deterministic evaluation lives in [`deterministic`]; the seeded
//! uncertainty propagation wraps it in [`monte_carlo`]. Both consume the
//! catalog defaults in `dh_catalogs::cost_catalog`.

pub mod crf;
pub mod deterministic;
pub mod monte_carlo;

pub use crf::capital_recovery_factor;
pub use deterministic::{evaluate_dh, evaluate_hp, CostResult, DhCostInputs, HpCostInputs};
pub use monte_carlo::{
    run_monte_carlo, EconomicsSample, MonteCarloConfig, MonteCarloInputs, MonteCarloSummary,
    QuantileSummary, DEFAULT_N_SAMPLES, DEFAULT_SEED,
};
