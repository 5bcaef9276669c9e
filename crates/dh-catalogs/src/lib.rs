//! # dh-catalogs: static lookup tables
//!
//! Pipe, cable, and cost/emission catalogs consumed by the CHA pipe sizer,
//! the DHA LV grid builder, and the economics engine. A small
//! constants/schema crate with no behavior of its own.

pub mod cable_catalog;
pub mod cost_catalog;
pub mod pipe_catalog;

pub use cable_catalog::{CableCatalogEntry, CABLE_CATALOG, DEFAULT_LV_LINE};
pub use cost_catalog::{default_distributions, CostDefaults, Distribution};
pub use pipe_catalog::{PipeCatalogEntry, PIPE_CATALOG};
