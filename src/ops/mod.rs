//! High-level operations.
//!
//! This module contains the implementation of Berth commands.

pub mod generate;
pub mod graph_file;
pub mod install_state;
pub mod sandbox_manifest;

pub use generate::{format_report, generate_targets, GenerateOptions, GraphReport};
pub use graph_file::{load_input, AnalysisInput, GraphFile};
pub use install_state::{diff_install_state, DiffOptions};
pub use sandbox_manifest::{load_record, save_record, SandboxManifest};
