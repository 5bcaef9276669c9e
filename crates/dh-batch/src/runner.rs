//! Batch runner: fans `ClusterJob`s out across a configurable worker pool
//! (spec §5), polling a cooperative cancellation flag between clusters, and
//! writes a manifest recording every job's outcome.

use crate::job::{ClusterJob, ClusterJobRecord, JobStatus};
use crate::manifest::{write_batch_manifest, BatchManifest};
use crate::pipeline::{outcome_to_record, run_cluster};
use dh_contract::config::DecisionConfig;
use dh_core::DhResult;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct BatchRunnerConfig {
    pub jobs: Vec<ClusterJob>,
    pub output_root: PathBuf,
    pub decision: DecisionConfig,
    pub threads: usize,
}

pub struct BatchSummary {
    pub success: usize,
    pub failure: usize,
    pub cancelled: usize,
    pub manifest_path: PathBuf,
    pub jobs: Vec<ClusterJobRecord>,
}

/// Run every job in `config.jobs` across a Rayon thread pool sized by
/// `config.threads` (0 auto-detects via `num_cpus`), polling `cancel`
/// between clusters (spec §5: "a shared cancel flag is polled between
/// clusters"). A job observed after cancellation is recorded as
/// `Cancelled` rather than run.
pub fn run_batch(config: &BatchRunnerConfig, cancel: Arc<AtomicBool>) -> DhResult<BatchSummary> {
    std::fs::create_dir_all(&config.output_root)?;

    let thread_count = if config.threads == 0 { num_cpus::get() } else { config.threads };
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .map_err(|e| dh_core::DhError::Other(format!("building worker pool: {e}")))?;

    let decision_config = &config.decision;
    let output_root = &config.output_root;
    let records: Vec<ClusterJobRecord> = pool.install(|| {
        config
            .jobs
            .par_iter()
            .map(|job| run_one(job, decision_config, output_root, &cancel))
            .collect()
    });

    let success = records.iter().filter(|r| r.status == JobStatus::Ok).count();
    let cancelled = records.iter().filter(|r| r.status == JobStatus::Cancelled).count();
    let failure = records.len() - success - cancelled;

    let manifest = BatchManifest {
        created_utc: chrono::Utc::now(),
        num_jobs: records.len(),
        success,
        failure,
        cancelled,
        jobs: records.clone(),
    };
    let manifest_path = config.output_root.join("batch_manifest.json");
    write_batch_manifest(&manifest_path, &manifest)?;

    Ok(BatchSummary { success, failure, cancelled, manifest_path, jobs: records })
}

fn run_one(
    job: &ClusterJob,
    decision_config: &DecisionConfig,
    output_root: &std::path::Path,
    cancel: &Arc<AtomicBool>,
) -> ClusterJobRecord {
    let output_dir = output_root.join("decision").join(&job.cluster.id);

    if cancel.load(Ordering::Relaxed) {
        return ClusterJobRecord {
            cluster_id: job.cluster.id.clone(),
            started_utc: chrono::Utc::now(),
            status: JobStatus::Cancelled,
            error: None,
            choice: None,
            robust: None,
            output_dir: output_dir.display().to_string(),
        };
    }

    let result = run_cluster(job, decision_config);
    if let Err(err) = &result {
        tracing::warn!(cluster_id = %job.cluster.id, error = %err, "cluster pipeline failed");
    }
    outcome_to_record(&job.cluster.id, &output_dir.display().to_string(), &result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::SharedInputs;
    use dh_catalogs::cost_catalog::CostDefaults;
    use dh_core::units::Kilovolts;
    use dh_core::{
        Cluster, ConstructionBand, Crs, HourlyProfileMatrix, LvBus, LvBusKind, LvLine, Point, Polygon, Polyline,
        RenovationState, StreetSegment, Transformer, UseType,
    };
    use dh_io::BaseLoadSource;
    use std::collections::HashMap;

    fn minimal_shared() -> Arc<SharedInputs> {
        let streets = vec![StreetSegment {
            id: "main".into(),
            geometry: Polyline { points: vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)] },
            name: None,
            crs: Crs("EPSG:25833".into()),
        }];
        let buildings = vec![
            dh_core::Building {
                id: "b1".into(),
                centroid: Point::new(20.0, 5.0),
                crs: Crs("EPSG:25833".into()),
                footprint: Polygon { points: vec![Point::new(20.0, 5.0), Point::new(21.0, 5.0), Point::new(20.0, 6.0)] },
                use_type: UseType::ResidentialSfh,
                construction_band: ConstructionBand::Post2010,
                renovation_state: RenovationState::Full,
                floor_area_m2: None,
                volume_m3: None,
                heat_transmission_coefficient_w_per_k: None,
                annual_heat_demand_kwh: Some(40_000.0),
            },
            dh_core::Building {
                id: "b2".into(),
                centroid: Point::new(90.0, 5.0),
                crs: Crs("EPSG:25833".into()),
                footprint: Polygon { points: vec![Point::new(90.0, 5.0), Point::new(91.0, 5.0), Point::new(90.0, 6.0)] },
                use_type: UseType::ResidentialSfh,
                construction_band: ConstructionBand::Post2010,
                renovation_state: RenovationState::Full,
                floor_area_m2: None,
                volume_m3: None,
                heat_transmission_coefficient_w_per_k: None,
                annual_heat_demand_kwh: Some(40_000.0),
            },
        ];
        let buses = vec![
            LvBus { id: "mv1".into(), nominal_kv: Kilovolts(20.0), coords: Point::new(0.0, 0.0), kind: LvBusKind::MvSlack },
            LvBus { id: "tlv".into(), nominal_kv: Kilovolts(0.4), coords: Point::new(0.0, 1.0), kind: LvBusKind::TransformerLvSide },
            LvBus { id: "lb1".into(), nominal_kv: Kilovolts(0.4), coords: Point::new(50.0, 5.0), kind: LvBusKind::LvNode },
        ];
        let lines = vec![LvLine {
            id: "l1".into(),
            from_bus: "tlv".into(),
            to_bus: "lb1".into(),
            length_km: 0.05,
            r_ohm_per_km: 0.284,
            x_ohm_per_km: 0.083,
            c_nf_per_km: 260.0,
            max_current_ka: 0.27,
        }];
        let transformers = vec![Transformer {
            id: "t1".into(),
            hv_bus: "mv1".into(),
            lv_bus: "tlv".into(),
            rated_mva: 0.4,
            short_circuit_voltage_pct: 4.0,
            resistive_loss_pct: 1.0,
            tap_position: 0,
            tap_range: (-2, 2),
        }];
        let mut series = vec![2.0; dh_core::HOURS_PER_YEAR];
        series[100] = 20.0;
        let mut hours_per_building = HashMap::new();
        hours_per_building.insert("b1".to_string(), series.clone());
        hours_per_building.insert("b2".to_string(), series);
        let mut scenario = HashMap::new();
        scenario.insert("b1".to_string(), 1.0);
        scenario.insert("b2".to_string(), 1.0);

        Arc::new(SharedInputs {
            streets,
            buildings,
            lv_buses: buses,
            lv_lines: lines,
            transformers,
            heat_profiles: HourlyProfileMatrix { hours_per_building },
            base_load: BaseLoadSource::Scenario(scenario),
            cost_defaults: CostDefaults::default(),
        })
    }

    fn cluster() -> Cluster {
        Cluster {
            id: "c1".into(),
            member_buildings: vec!["b1".into(), "b2".into()],
            plant_location: Point::new(0.0, 0.0),
            plant_crs: Crs("EPSG:25833".into()),
            design_hour: 100,
            design_load_kw: 40.0,
        }
    }

    #[test]
    fn cancelled_job_is_recorded_without_running() {
        let cancel = Arc::new(AtomicBool::new(true));
        let job = ClusterJob {
            cluster: cluster(),
            shared: minimal_shared(),
            run_monte_carlo: false,
            monte_carlo_n_samples: 0,
            monte_carlo_seed: 0,
        };
        let dir = tempfile::tempdir().unwrap();
        let record = run_one(&job, &DecisionConfig::default(), dir.path(), &cancel);
        assert_eq!(record.status, JobStatus::Cancelled);
    }

    #[test]
    fn batch_writes_manifest_for_successful_cluster() {
        let job = ClusterJob {
            cluster: cluster(),
            shared: minimal_shared(),
            run_monte_carlo: false,
            monte_carlo_n_samples: 0,
            monte_carlo_seed: 0,
        };
        let dir = tempfile::tempdir().unwrap();
        let config = BatchRunnerConfig {
            jobs: vec![job],
            output_root: dir.path().to_path_buf(),
            decision: DecisionConfig::default(),
            threads: 1,
        };
        let summary = run_batch(&config, Arc::new(AtomicBool::new(false))).unwrap();
        assert_eq!(summary.success, 1);
        assert_eq!(summary.failure, 0);
        assert!(summary.manifest_path.exists());
    }
}
