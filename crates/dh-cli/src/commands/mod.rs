//! One module per CLI verb (spec §6): each file owns a single `handle`
//! entry point the dispatcher in `main.rs` calls.

pub mod batch;
pub mod completions;
pub mod decide;
pub mod prepare_data;
pub mod report;
pub mod run_cha;
pub mod run_dha;
pub mod run_economics;
pub mod validate_config;
