//! Top-level run configuration (spec §6): `dh_contract::config::PipelineConfig`
//! plus the CLI-only settings that do not belong in a domain crate (the
//! default dataset/output roots and the base-load scenario name). Loaded
//! from TOML via `toml`; unknown keys fail the load exactly as they do for
//! `PipelineConfig` itself.

use dh_contract::config::PipelineConfig;
use dh_core::{DhError, DhResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(flatten)]
    pub pipeline: PipelineConfig,
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    #[serde(default = "default_scenario")]
    pub scenario: String,
}

fn default_output_root() -> PathBuf {
    PathBuf::from("results")
}

fn default_scenario() -> String {
    "default".to_string()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { pipeline: PipelineConfig::from_env_defaults(), output_root: default_output_root(), scenario: default_scenario() }
    }
}

impl RunConfig {
    pub fn from_toml_str(text: &str) -> DhResult<Self> {
        let mut config: RunConfig =
            toml::from_str(text).map_err(|e| DhError::ConfigValidation(format!("run config parse error: {e}")))?;
        config.pipeline.llm_api_key = std::env::var("DH_LLM_API_KEY").ok();
        config.pipeline.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else the environment-sourced defaults
    /// (spec §6: a missing `--config` is not an error, just the defaults).
    pub fn load(path: Option<&Path>) -> DhResult<Self> {
        match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .map_err(|e| DhError::ConfigValidation(format!("reading config {}: {e}", p.display())))?;
                Self::from_toml_str(&text)
            }
            None => Ok(Self::default()),
        }
    }
}

/// Parse `"auto"` or a literal thread count, falling back to the detected
/// core count on anything unparsable rather than failing the run over a
/// malformed flag.
pub fn resolve_thread_count(spec: &str) -> usize {
    if spec.eq_ignore_ascii_case("auto") {
        num_cpus::get()
    } else {
        spec.parse().unwrap_or_else(|_| num_cpus::get())
    }
}
