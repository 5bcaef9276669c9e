//! Command-line surface (spec §6): every verb named there
//! (`prepare-data`, `run-cha`, `run-dha`, `run-economics`, `decide`,
//! `report`) made concrete, plus the supplemented `batch`, `validate-config`,
//! and `completions` ambient niceties. One `Cli`/`Commands` derive tree: a
//! global logging/threading/config surface plus one variant per verb, each
//! carrying only that verb's flags.

use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dh", author, version, about = "District heating vs. heat pump decision engine", long_about = None)]
pub struct Cli {
    /// Logging verbosity.
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    /// Run configuration TOML; unset uses built-in defaults plus
    /// `DH_LLM_API_KEY` from the environment.
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Worker thread count: "auto" detects the core count.
    #[arg(long, default_value = "auto", global = true)]
    pub threads: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and validate every input table in a dataset without running a pipeline.
    PrepareData {
        #[arg(long, value_hint = ValueHint::DirPath)]
        dataset_root: PathBuf,
        /// Base-load scenario name (spec §4.9), ignored if no base_load.json is present.
        #[arg(long, default_value = "default")]
        scenario: String,
    },
    /// Run the coupled hydraulic-thermal analysis (CHA) for one cluster.
    RunCha {
        #[arg(long)]
        cluster_id: String,
        #[arg(long, value_hint = ValueHint::DirPath)]
        dataset_root: PathBuf,
        #[arg(long, default_value = "results", value_hint = ValueHint::DirPath)]
        out_dir: PathBuf,
    },
    /// Run the distribution-grid hosting analysis (DHA) for one cluster.
    RunDha {
        #[arg(long)]
        cluster_id: String,
        #[arg(long, value_hint = ValueHint::DirPath)]
        dataset_root: PathBuf,
        #[arg(long, default_value = "default")]
        scenario: String,
        #[arg(long, default_value = "results", value_hint = ValueHint::DirPath)]
        out_dir: PathBuf,
    },
    /// Evaluate deterministic and, optionally, seeded Monte Carlo economics for one cluster.
    RunEconomics {
        #[arg(long)]
        cluster_id: String,
        #[arg(long, value_hint = ValueHint::DirPath)]
        dataset_root: PathBuf,
        /// Monte Carlo sample count; omit to run the deterministic case only.
        #[arg(long)]
        n: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = "results", value_hint = ValueHint::DirPath)]
        out_dir: PathBuf,
    },
    /// Assemble the KPI contract and run the deterministic decision rule for one cluster.
    Decide {
        #[arg(long)]
        cluster_id: String,
        #[arg(long, default_value = "results", value_hint = ValueHint::DirPath)]
        out_dir: PathBuf,
        /// Generate explanatory prose alongside the decision.
        #[arg(long)]
        explain: bool,
        #[arg(long, value_enum, default_value_t = StyleArg::Executive)]
        style: StyleArg,
        /// Fail with exit code 5 instead of falling back to the deterministic template
        /// when the external text generator is unavailable (spec §6, §7).
        #[arg(long)]
        no_fallback: bool,
    },
    /// Render a report from a decided cluster's artifacts.
    Report {
        #[arg(long)]
        cluster_id: String,
        #[arg(long, default_value = "results", value_hint = ValueHint::DirPath)]
        out_dir: PathBuf,
        #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
        format: ReportFormat,
    },
    /// Run every cluster in a dataset across a worker pool (spec §5).
    Batch {
        #[arg(long, value_hint = ValueHint::DirPath)]
        dataset_root: PathBuf,
        #[arg(long, default_value = "default")]
        scenario: String,
        #[arg(long, default_value = "results", value_hint = ValueHint::DirPath)]
        out_dir: PathBuf,
        /// Run Monte Carlo economics for every cluster.
        #[arg(long)]
        monte_carlo: bool,
        #[arg(long, default_value_t = dh_economics::DEFAULT_N_SAMPLES)]
        n: usize,
        #[arg(long, default_value_t = dh_economics::DEFAULT_SEED)]
        seed: u64,
    },
    /// Load and validate a run configuration file without running a pipeline.
    ValidateConfig {
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: PathBuf,
    },
    /// Generate a shell completion script for this CLI.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
        #[arg(long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
}

/// Mirrors `dh_explain::Style`; kept separate so `clap::ValueEnum` does not
/// need to be derived on a type the explanation crate owns.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StyleArg {
    Executive,
    Technical,
    Detailed,
}

impl From<StyleArg> for dh_explain::Style {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Executive => dh_explain::Style::Executive,
            StyleArg::Technical => dh_explain::Style::Technical,
            StyleArg::Detailed => dh_explain::Style::Detailed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Html,
    Md,
    Json,
    All,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
