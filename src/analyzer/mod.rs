//! Installation analysis.
//!
//! Two independent passes over the resolver output:
//!
//! - `sandbox_analyzer` diffs it against the previous installation record
//!   and classifies every package as added, deleted, changed or unchanged.
//! - `target_generator` turns it into the graph of build units and
//!   aggregate units the project generator materializes.

pub mod errors;
pub mod sandbox_analyzer;
pub mod state;
pub mod target_generator;
pub mod variant;
pub mod variant_set;

pub use errors::{Result, TargetError};
pub use sandbox_analyzer::{
    analyze_install_state, InstallationRecord, PodDirectories, RecordedPod, SandboxAnalyzer,
    SandboxDirectories,
};
pub use state::{PodState, StateSet};
pub use target_generator::{build_targets, TargetGenerator};
pub use variant::PackageVariant;
pub use variant_set::{ScopeCache, VariantGroup};
