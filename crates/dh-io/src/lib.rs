//! # dh-io: table readers, importers, artifact discovery, and writers
//!
//! Reads the building/street/cluster/hourly-profile CSV inputs and the
//! legacy LV-grid JSON format of spec §6, composes the base-electrical-load
//! source (scenario JSON or standard-load-profile CSV) of spec §4.9, probes
//! for upstream artifacts per spec §4.17, and writes the per-cluster output
//! artifacts of spec §6 (JSON, CSV, Parquet). The only crate in the
//! workspace that touches the filesystem for domain data.

pub mod artifact_discovery;
pub mod base_load;
pub mod digest;
pub mod legacy_grid;
pub mod tables;
pub mod writers;

pub use artifact_discovery::{default_patterns, find_artifact, find_cluster_artifact};
pub use base_load::{read_population_table, read_scenario_loads, read_slp_table, BaseLoadSource};
pub use digest::input_digest;
pub use legacy_grid::{import_legacy_grid, ImportedLegacyGrid, HONORED_POWER_TAGS};
pub use tables::{read_building_table, read_cluster_table, read_profile_matrix, read_street_table};
