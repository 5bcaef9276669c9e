//! `dh`: the CLI surface of spec §6. Dispatches to one `commands::*` module
//! per verb, initializes a single `tracing` `FmtSubscriber` once, and maps
//! every pipeline failure to the exit code
//! `DhError::exit_code` assigns (spec §6: "Exit codes: 0 success; 2 invalid
//! input; 3 validation failure; 4 non-convergence; 5 external-service
//! failure when `--no-fallback` is set").

mod artifacts;
mod cli;
mod commands;
mod config;
mod dataset;

use clap::Parser;
use cli::{Cli, Commands};
use config::{resolve_thread_count, RunConfig};
use dh_core::DhResult;
use tracing_subscriber::FmtSubscriber;

fn run(cli: &Cli) -> DhResult<()> {
    let threads = resolve_thread_count(&cli.threads);
    let config = RunConfig::load(cli.config.as_deref())?;

    match &cli.command {
        None => {
            println!("{}", cli::build_cli_command().render_long_help());
            Ok(())
        }
        Some(Commands::PrepareData { dataset_root, scenario }) => {
            commands::prepare_data::handle(dataset_root, scenario)
        }
        Some(Commands::RunCha { cluster_id, dataset_root, out_dir }) => {
            commands::run_cha::handle(cluster_id, dataset_root, out_dir)
        }
        Some(Commands::RunDha { cluster_id, dataset_root, scenario, out_dir }) => {
            commands::run_dha::handle(cluster_id, dataset_root, scenario, out_dir)
        }
        Some(Commands::RunEconomics { cluster_id, dataset_root, n, seed, out_dir }) => {
            commands::run_economics::handle(cluster_id, dataset_root, *n, *seed, out_dir)
        }
        Some(Commands::Decide { cluster_id, out_dir, explain, style, no_fallback }) => {
            commands::decide::handle(cluster_id, out_dir, *explain, *style, *no_fallback, &config)
        }
        Some(Commands::Report { cluster_id, out_dir, format }) => {
            commands::report::handle(cluster_id, out_dir, *format)
        }
        Some(Commands::Batch { dataset_root, scenario, out_dir, monte_carlo, n, seed }) => {
            commands::batch::handle(dataset_root, scenario, out_dir, *monte_carlo, *n, *seed, threads, &config)
        }
        Some(Commands::ValidateConfig { config }) => commands::validate_config::handle(config),
        Some(Commands::Completions { shell, out }) => {
            commands::completions::handle(*shell, out.as_deref()).map_err(dh_core::DhError::Io)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder().with_max_level(cli.log_level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default tracing subscriber failed");

    match run(&cli) {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            tracing::error!(kind = err.kind(), "{err}");
            eprintln!("error [{}]: {err}", err.kind());
            std::process::exit(err.exit_code());
        }
    }
}
