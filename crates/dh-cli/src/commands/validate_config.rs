//! `validate-config` (supplemented, §C): load a run configuration file and
//! report whether it validates, without running a pipeline.

use crate::config::RunConfig;
use dh_core::DhResult;
use std::path::Path;

pub fn handle(config_path: &Path) -> DhResult<()> {
    let config = RunConfig::load(Some(config_path))?;
    println!("{} is valid", config_path.display());
    println!("  robust_win_fraction:      {}", config.pipeline.decision.robust_win_fraction);
    println!("  sensitive_win_fraction:   {}", config.pipeline.decision.sensitive_win_fraction);
    println!("  close_cost_rel_threshold: {}", config.pipeline.decision.close_cost_rel_threshold);
    println!("  monte_carlo.n:            {}", config.pipeline.monte_carlo.n);
    println!("  monte_carlo.seed:         {}", config.pipeline.monte_carlo.seed);
    println!("  validation.max_iterations:{}", config.pipeline.validation.max_iterations);
    println!("  force_template:           {}", config.pipeline.force_template);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(handle(&missing).is_err());
    }
}
