//! `batch` (supplemented, §C): run every cluster in a dataset across a
//! worker pool (spec §5), writing one shared `batch_manifest.json`.
//! Grounded on `dh_batch::runner::run_batch`'s job/shared-inputs split;
//! this command builds one [`dh_batch::ClusterJob`] per cluster in the
//! dataset and shares the loaded tables across all of them via `Arc`.

use crate::config::RunConfig;
use crate::dataset::Dataset;
use dh_batch::{run_batch, BatchRunnerConfig, ClusterJob};
use dh_core::DhResult;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[allow(clippy::too_many_arguments)]
pub fn handle(
    dataset_root: &Path,
    scenario: &str,
    out_dir: &Path,
    monte_carlo: bool,
    n: usize,
    seed: u64,
    threads: usize,
    config: &RunConfig,
) -> DhResult<()> {
    let dataset = Dataset::load(dataset_root, scenario)?;
    let shared = Arc::new(dataset.shared_inputs());

    let jobs: Vec<ClusterJob> = dataset
        .clusters
        .iter()
        .map(|cluster| ClusterJob {
            cluster: cluster.clone(),
            shared: Arc::clone(&shared),
            run_monte_carlo: monte_carlo,
            monte_carlo_n_samples: n,
            monte_carlo_seed: seed,
        })
        .collect();

    tracing::info!(clusters = jobs.len(), threads, "starting batch run");

    let runner_config =
        BatchRunnerConfig { jobs, output_root: out_dir.to_path_buf(), decision: config.pipeline.decision, threads };

    // Cooperative cancellation (spec §5) is not wired to any external
    // signal on this CLI surface; the flag exists so `run_batch` can be
    // driven the same way by a future signal handler without an API change.
    let cancel = Arc::new(AtomicBool::new(false));
    let summary = run_batch(&runner_config, cancel)?;

    println!(
        "batch complete: {} ok, {} failed, {} cancelled ({} total) -> {}",
        summary.success,
        summary.failure,
        summary.cancelled,
        summary.jobs.len(),
        summary.manifest_path.display()
    );
    for job in &summary.jobs {
        match &job.error {
            Some(err) => println!("  {}: FAILED ({err})", job.cluster_id),
            None => println!(
                "  {}: choice={} robust={:?}",
                job.cluster_id,
                job.choice.as_deref().unwrap_or("?"),
                job.robust
            ),
        }
    }
    Ok(())
}
