//! Per-cluster batch job definition (spec §5): the self-contained unit of
//! work one worker runs end to end, with no mutable state shared with any
//! other job. Splits "what to run" (the job) from "what happened" (the
//! record).

use chrono::{DateTime, Utc};
use dh_catalogs::cost_catalog::CostDefaults;
use dh_core::{Building, Cluster, HourlyProfileMatrix, LvBus, LvLine, StreetSegment, Transformer};
use dh_io::BaseLoadSource;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Data shared read-only across every job in a batch: loaded once by the
/// caller and handed to the runner as an `Arc`, never mutated afterward
/// (spec §5: "shared resources are read-only tables... loaded once and
/// immutable").
pub struct SharedInputs {
    pub streets: Vec<StreetSegment>,
    pub buildings: Vec<Building>,
    pub lv_buses: Vec<LvBus>,
    pub lv_lines: Vec<LvLine>,
    pub transformers: Vec<Transformer>,
    pub heat_profiles: HourlyProfileMatrix,
    pub base_load: BaseLoadSource,
    pub cost_defaults: CostDefaults,
}

/// One cluster's unit of work: the cluster definition plus a reference to
/// the shared inputs it reads its member buildings and grid from.
#[derive(Clone)]
pub struct ClusterJob {
    pub cluster: Cluster,
    pub shared: Arc<SharedInputs>,
    pub run_monte_carlo: bool,
    pub monte_carlo_n_samples: usize,
    pub monte_carlo_seed: u64,
}

/// Outcome of one cluster job, always produced (never panics out of the
/// batch) so the manifest can report per-cluster status independently
/// (spec §7: "failure in one cluster never aborts a batch").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterJobRecord {
    pub cluster_id: String,
    pub started_utc: DateTime<Utc>,
    pub status: JobStatus,
    pub error: Option<String>,
    pub choice: Option<String>,
    pub robust: Option<bool>,
    pub output_dir: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Ok,
    Cancelled,
    Failed,
}
