//! # dh-batch: worker-pool batch runner (spec §5, §9's "coroutine-style
//! pipelines... modelled as explicit dependencies between stages; the batch
//! runner submits independent cluster tasks to a worker pool").
//!
//! [`runner::run_batch`] fans [`job::ClusterJob`]s out across a Rayon
//! thread pool, each job running [`pipeline::run_cluster`] (CHA and DHA in
//! parallel via `rayon::join`, then economics, then contract assembly and
//! decision) in isolation from every other cluster, and writes a
//! [`manifest::BatchManifest`] summarizing the run.

pub mod job;
pub mod manifest;
pub mod pipeline;
pub mod runner;

pub use job::{ClusterJob, ClusterJobRecord, JobStatus, SharedInputs};
pub use manifest::{load_batch_manifest, write_batch_manifest, BatchManifest};
pub use pipeline::{run_cluster, PipelineOutcome};
pub use runner::{run_batch, BatchRunnerConfig, BatchSummary};
