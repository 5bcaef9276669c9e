//! Dataset loading (spec §6): resolves the canonical table set under a
//! dataset root directory into the typed domain values the pipeline stages
//! consume -- one directory in, typed tables out, covering this system's
//! building/street/cluster/profile/LV-grid/base-load set. File-format shims
//! for raw GIS stay out of scope; `dh_io::legacy_grid` covers the
//! tagged-import path, this
//! module covers the already-typed canonical one.

use dh_catalogs::cost_catalog::CostDefaults;
use dh_core::{Building, Cluster, DhError, DhResult, HourlyProfileMatrix, LvBus, LvLine, StreetSegment, Transformer};
use dh_io::BaseLoadSource;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The LV grid's canonical on-disk form: a direct JSON mirror of the
/// bus/line/transformer domain types, already reprojected (spec §9:
/// "reprojection happens in the caller, since dh-core never reprojects").
#[derive(Debug, Deserialize)]
struct LvGridDocument {
    buses: Vec<LvBus>,
    lines: Vec<LvLine>,
    transformers: Vec<Transformer>,
}

fn read_lv_grid(path: &Path) -> DhResult<(Vec<LvBus>, Vec<LvLine>, Vec<Transformer>)> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| DhError::MissingInputArtifact(format!("LV grid {}: {e}", path.display())))?;
    let doc: LvGridDocument = serde_json::from_str(&raw)?;
    Ok((doc.buses, doc.lines, doc.transformers))
}

fn read_cost_defaults(path: &Path) -> DhResult<CostDefaults> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| DhError::MissingInputArtifact(format!("cost defaults {}: {e}", path.display())))?;
    toml::from_str(&raw).map_err(|e| DhError::ConfigValidation(format!("cost defaults {}: {e}", path.display())))
}

/// Every input table a cluster pipeline needs, loaded once from a dataset
/// root directory (spec §6's fixed file-name convention).
pub struct Dataset {
    pub root: PathBuf,
    pub streets: Vec<StreetSegment>,
    pub buildings: Vec<Building>,
    pub clusters: Vec<Cluster>,
    pub heat_profiles: HourlyProfileMatrix,
    pub lv_buses: Vec<LvBus>,
    pub lv_lines: Vec<LvLine>,
    pub transformers: Vec<Transformer>,
    pub base_load: BaseLoadSource,
    pub cost_defaults: CostDefaults,
}

impl Dataset {
    /// Load `streets.csv`, `buildings.csv`, `clusters.csv`, `profiles.csv`,
    /// and `lv_grid.json` from `root`; `base_load.json` (read under
    /// `scenario`) and `cost_defaults.toml` are optional, falling back to
    /// an empty scenario and catalog defaults respectively.
    pub fn load(root: impl Into<PathBuf>, scenario: &str) -> DhResult<Self> {
        let root = root.into();
        tracing::info!(root = %root.display(), "loading dataset");

        let streets = dh_io::read_street_table(root.join("streets.csv"))?;
        let buildings = dh_io::read_building_table(root.join("buildings.csv"))?;
        let clusters = dh_io::read_cluster_table(root.join("clusters.csv"))?;
        let heat_profiles = dh_io::read_profile_matrix(root.join("profiles.csv"))?;
        let (lv_buses, lv_lines, transformers) = read_lv_grid(&root.join("lv_grid.json"))?;

        let base_load_path = root.join("base_load.json");
        let base_load = if base_load_path.exists() {
            dh_io::read_scenario_loads(&base_load_path, scenario)?
        } else {
            tracing::warn!("no base_load.json found, assuming zero base electrical load");
            BaseLoadSource::Scenario(Default::default())
        };

        let cost_defaults_path = root.join("cost_defaults.toml");
        let cost_defaults =
            if cost_defaults_path.exists() { read_cost_defaults(&cost_defaults_path)? } else { CostDefaults::default() };

        Ok(Self { root, streets, buildings, clusters, heat_profiles, lv_buses, lv_lines, transformers, base_load, cost_defaults })
    }

    pub fn cluster(&self, cluster_id: &str) -> DhResult<&Cluster> {
        self.clusters.iter().find(|c| c.id == cluster_id).ok_or_else(|| {
            DhError::MissingInputArtifact(format!("cluster '{cluster_id}' not found in {}", self.root.join("clusters.csv").display()))
        })
    }

    pub fn member_buildings(&self, cluster: &Cluster) -> Vec<Building> {
        self.buildings.iter().filter(|b| cluster.member_buildings.contains(&b.id)).cloned().collect()
    }

    /// Build the `dh-batch` shared-inputs bundle from this dataset, for
    /// the `batch` command's fan-out across every cluster.
    pub fn shared_inputs(&self) -> dh_batch::SharedInputs {
        dh_batch::SharedInputs {
            streets: self.streets.clone(),
            buildings: self.buildings.clone(),
            lv_buses: self.lv_buses.clone(),
            lv_lines: self.lv_lines.clone(),
            transformers: self.transformers.clone(),
            heat_profiles: self.heat_profiles.clone(),
            base_load: self.base_load.clone(),
            cost_defaults: self.cost_defaults,
        }
    }
}
