//! Serializable per-stage artifacts (spec §6): small DTOs this crate writes
//! to disk between `run-cha`/`run-dha`/`run-economics`/`decide` invocations.
//! The upstream run-result types (`ChaRunResult`, `DhaRunResult`,
//! `CostResult`) carry intermediate state the later stages either cannot
//! serialize or do not need, so each stage command distills what it
//! produces into one of these before writing it with
//! `dh_io::writers::write_json`.

use dh_cha::ChaKpis;
use dh_dha::DhaKpis;
use dh_economics::{CostResult, MonteCarloSummary};
use dh_core::{DhError, DhResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaArtifact {
    pub cluster_id: String,
    pub kpis: ChaKpis,
    pub converged: bool,
    pub pipe_capex_eur: f64,
    pub pump_power_kw: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DhaArtifact {
    pub cluster_id: String,
    pub kpis: DhaKpis,
    pub hp_total_kw_design: f64,
    pub unmapped_building_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CostResultDto {
    pub capex_eur: f64,
    pub annual_opex_eur: f64,
    pub lcoh_eur_per_mwh: f64,
    pub co2_t_per_a: f64,
}

impl From<CostResult> for CostResultDto {
    fn from(r: CostResult) -> Self {
        Self { capex_eur: r.capex_eur, annual_opex_eur: r.annual_opex_eur, lcoh_eur_per_mwh: r.lcoh_eur_per_mwh, co2_t_per_a: r.co2_t_per_a }
    }
}

impl From<CostResultDto> for CostResult {
    fn from(r: CostResultDto) -> Self {
        Self { capex_eur: r.capex_eur, annual_opex_eur: r.annual_opex_eur, lcoh_eur_per_mwh: r.lcoh_eur_per_mwh, co2_t_per_a: r.co2_t_per_a }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomicsArtifact {
    pub cluster_id: String,
    pub dh: CostResultDto,
    pub hp: CostResultDto,
    pub monte_carlo: Option<MonteCarloSummary>,
}

/// Read and deserialize a JSON artifact, wrapping a missing file in the
/// same `MissingInputArtifact` variant `dh_io::artifact_discovery` uses so
/// every stage reports a missing upstream dependency the same way.
pub fn read_json_artifact<T: for<'de> Deserialize<'de>>(path: &Path) -> DhResult<T> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| DhError::MissingInputArtifact(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw).map_err(|e| DhError::Parse(format!("{}: {e}", path.display())))
}
