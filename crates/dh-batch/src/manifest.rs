//! Batch run manifest (spec §6, §8: a record of every cluster's outcome
//! written once per batch invocation).

use crate::job::ClusterJobRecord;
use chrono::{DateTime, Utc};
use dh_core::{DhError, DhResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchManifest {
    pub created_utc: DateTime<Utc>,
    pub num_jobs: usize,
    pub success: usize,
    pub failure: usize,
    pub cancelled: usize,
    pub jobs: Vec<ClusterJobRecord>,
}

pub fn write_batch_manifest(path: impl AsRef<Path>, manifest: &BatchManifest) -> DhResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load_batch_manifest(path: impl AsRef<Path>) -> DhResult<BatchManifest> {
    let text = fs::read_to_string(path.as_ref())?;
    serde_json::from_str(&text).map_err(|e| DhError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;

    #[test]
    fn manifest_writes_and_reads_back() {
        let record = ClusterJobRecord {
            cluster_id: "c1".into(),
            started_utc: Utc::now(),
            status: JobStatus::Ok,
            error: None,
            choice: Some("Dh".into()),
            robust: Some(true),
            output_dir: "results/decision/c1".into(),
        };
        let manifest = BatchManifest {
            created_utc: Utc::now(),
            num_jobs: 1,
            success: 1,
            failure: 0,
            cancelled: 0,
            jobs: vec![record],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch_manifest.json");
        write_batch_manifest(&path, &manifest).unwrap();
        let loaded = load_batch_manifest(&path).unwrap();
        assert_eq!(loaded.num_jobs, 1);
        assert_eq!(loaded.jobs[0].cluster_id, "c1");
    }
}
