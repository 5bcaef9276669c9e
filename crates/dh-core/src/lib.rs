//! # dh-core: shared types for the DH/HP decision engine
//!
//! Provides the entity model of spec §3 (buildings, streets, clusters,
//! pipes, LV grid elements), compile-time unit safety, a unified error type,
//! diagnostics, generic undirected-graph helpers, and the determinism/seed
//! harness used throughout the CHA, DHA, economics, and contract crates.
//!
//! The one crate every other crate in the workspace depends on, with no
//! outward dependencies on them.

pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod geometry;
pub mod graph_utils;
pub mod seed;
pub mod units;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use domain::*;
pub use error::{DhError, DhResult};
pub use geometry::{Crs, Point, Polygon, Polyline};
pub use seed::{sub_seed, SeedStream};
