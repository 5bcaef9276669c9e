//! # dh-contract: KPI-contract schema, assembler, validator, decision rule
//! engine, and pipeline configuration (spec §3, §4.13, §4.14, §6).
//!
//! [`assembler::assemble_contract`] merges CHA/DHA/economics KPI blocks into
//! the versioned [`contract::KpiContract`] and validates it;
//! [`decision::decide`] runs the deterministic feasibility/cost/CO2/
//! robustness cascade over a validated contract; [`config::PipelineConfig`]
//! holds every recognized configuration key.

pub mod assembler;
pub mod config;
pub mod contract;
pub mod decision;
pub mod validator;

pub use assembler::{allowed_numerics, assemble_contract, AssemblyInputs};
pub use config::{DecisionConfig, MonteCarloKnobs, PipelineConfig, ValidationKnobs};
pub use contract::{
    closed_reason_codes, warrants_planning_warning, ContractMetadata, DistrictHeatingBlock,
    HeatPumpsBlock, HpSystemBlock, HydraulicsBlock, KpiContract, LossesBlock, LvGridBlock,
    MonteCarloBlock, CONTRACT_VERSION,
};
pub use decision::{decide, Choice, DecisionReasonCode, DecisionResult};
pub use validator::{required_json_keys, validate_contract, validate_json_shape};
