//! Berth - target materialization for a library dependency manager
//!
//! This crate turns resolver output (specifications resolved per user
//! target definition) into the build units and aggregate targets a project
//! generator materializes, and diffs it against the previous installation.

pub mod analyzer;
pub mod core;
pub mod ops;
pub mod util;

pub use analyzer::{
    analyze_install_state, build_targets, InstallationRecord, PodState, ScopeCache, StateSet,
    TargetError,
};
pub use core::{
    AggregateUnit, BuildUnit, Platform, ResolvedEntry, ResolvedTargets, Specification,
    TargetDefinition, TargetGraph,
};
pub use util::config::InstallationOptions;
