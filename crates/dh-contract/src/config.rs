//! Recognized pipeline configuration (spec §6): thresholds for the decision
//! engine, Monte Carlo sample count/seed, validation/feedback-loop knobs,
//! and the LLM invocation settings. Any unknown TOML key fails config load
//! (spec §6: "Any unknown key fails configuration load"), enforced via
//! `#[serde(deny_unknown_fields)]` on every level: a fail-closed posture
//! toward malformed input.

use dh_core::{DhError, DhResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DecisionConfig {
    pub robust_win_fraction: f64,
    pub sensitive_win_fraction: f64,
    pub close_cost_rel_threshold: f64,
    pub close_cost_abs_threshold: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            robust_win_fraction: 0.70,
            sensitive_win_fraction: 0.55,
            close_cost_rel_threshold: 0.05,
            close_cost_abs_threshold: 0.0,
        }
    }
}

impl DecisionConfig {
    /// Thresholds in `[0,1]`; sensitive <= robust; absolute threshold >= 0
    /// (spec §4.14's config validation).
    pub fn validate(&self) -> DhResult<()> {
        for (name, value) in [
            ("robust_win_fraction", self.robust_win_fraction),
            ("sensitive_win_fraction", self.sensitive_win_fraction),
            ("close_cost_rel_threshold", self.close_cost_rel_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DhError::ConfigValidation(format!("{name} must be in [0,1], got {value}")));
            }
        }
        if self.sensitive_win_fraction > self.robust_win_fraction {
            return Err(DhError::ConfigValidation(
                "sensitive_win_fraction must be <= robust_win_fraction".into(),
            ));
        }
        if self.close_cost_abs_threshold < 0.0 {
            return Err(DhError::ConfigValidation("close_cost_abs_threshold must be >= 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonteCarloKnobs {
    pub n: usize,
    pub seed: u64,
}

impl Default for MonteCarloKnobs {
    fn default() -> Self {
        Self { n: 500, seed: 42 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationKnobs {
    pub min_confidence: f64,
    pub enable_feedback: bool,
    pub max_iterations: usize,
}

impl Default for ValidationKnobs {
    fn default() -> Self {
        Self { min_confidence: 0.7, enable_feedback: true, max_iterations: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(flatten)]
    pub decision: DecisionConfig,
    pub monte_carlo: MonteCarloKnobs,
    pub validation: ValidationKnobs,
    pub force_template: bool,
    pub llm_timeout_s: u64,
    pub llm_model_name: Option<String>,
    /// Read from the `DH_LLM_API_KEY` environment variable at load time,
    /// never a TOML key and never serialized or logged (spec §6).
    #[serde(skip)]
    pub llm_api_key: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            decision: DecisionConfig::default(),
            monte_carlo: MonteCarloKnobs::default(),
            validation: ValidationKnobs::default(),
            force_template: false,
            llm_timeout_s: 30,
            llm_model_name: None,
            llm_api_key: None,
        }
    }
}

const LLM_API_KEY_ENV_VAR: &str = "DH_LLM_API_KEY";

impl PipelineConfig {
    /// Parse a TOML document; unknown keys at any level fail the load
    /// (`serde`'s `deny_unknown_fields` on every nested struct, since
    /// `#[serde(flatten)]` cannot itself carry the attribute).
    pub fn from_toml_str(text: &str) -> DhResult<Self> {
        let mut config: PipelineConfig = toml::from_str(text)
            .map_err(|e| DhError::ConfigValidation(format!("config parse error: {e}")))?;
        config.llm_api_key = std::env::var(LLM_API_KEY_ENV_VAR).ok();
        config.validate()?;
        Ok(config)
    }

    /// Load defaults with only the environment-sourced API key populated;
    /// used when no config file is given on the CLI.
    pub fn from_env_defaults() -> Self {
        let mut config = PipelineConfig::default();
        config.llm_api_key = std::env::var(LLM_API_KEY_ENV_VAR).ok();
        config
    }

    pub fn validate(&self) -> DhResult<()> {
        self.decision.validate()?;
        if !(0.0..=1.0).contains(&self.validation.min_confidence) {
            return Err(DhError::ConfigValidation("validation.min_confidence must be in [0,1]".into()));
        }
        if self.monte_carlo.n == 0 {
            return Err(DhError::ConfigValidation("monte_carlo.n must be > 0".into()));
        }
        Ok(())
    }
}
