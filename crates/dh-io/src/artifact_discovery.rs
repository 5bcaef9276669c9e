//! Artifact discovery (spec §4.17).
//!
//! Per-cluster outputs live under a base directory. For each artifact
//! type, a prioritized list of patterns is tried -- nested per-cluster
//! layout first, then a flat layout -- and the first match wins. Every
//! path tried is logged at `debug!`.

use dh_core::{DhError, DhResult};
use std::path::{Path, PathBuf};

/// Build the default search patterns for one artifact within
/// `results/<phase>/<cluster_id>/` (nested, matching spec §6's described
/// output layout) and a flat fallback directly under the base directory.
pub fn default_patterns(phase: &str, cluster_id: &str, file_name: &str) -> Vec<PathBuf> {
    vec![
        PathBuf::from("results").join(phase).join(cluster_id).join(file_name),
        PathBuf::from(phase).join(cluster_id).join(file_name),
        PathBuf::from(cluster_id).join(file_name),
        PathBuf::from(file_name),
    ]
}

/// Search `base_dir` for the first pattern (relative path) that exists,
/// logging every path tried at `debug!`. Fails with
/// [`DhError::MissingInputArtifact`] listing all patterns tried if none
/// exist.
pub fn find_artifact(base_dir: impl AsRef<Path>, patterns: &[PathBuf]) -> DhResult<PathBuf> {
    let base_dir = base_dir.as_ref();
    let mut tried = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        let candidate = base_dir.join(pattern);
        tracing::debug!(path = %candidate.display(), "probing artifact path");
        if candidate.exists() {
            return Ok(candidate);
        }
        tried.push(candidate.display().to_string());
    }
    Err(DhError::MissingInputArtifact(format!(
        "no artifact found under {}; tried: [{}]",
        base_dir.display(),
        tried.join(", ")
    )))
}

/// Convenience wrapper combining [`default_patterns`] and [`find_artifact`]
/// for the common `results/<phase>/<cluster_id>/<file_name>` layout.
pub fn find_cluster_artifact(
    base_dir: impl AsRef<Path>,
    phase: &str,
    cluster_id: &str,
    file_name: &str,
) -> DhResult<PathBuf> {
    let patterns = default_patterns(phase, cluster_id, file_name);
    find_artifact(base_dir, &patterns)
}
