//! Core data structures for Berth.
//!
//! This module contains the foundational types the analyzer works on:
//! - Platforms and deployment targets
//! - Specifications (packages and their sub-units)
//! - User target definitions and the resolver's output
//! - Generated build and aggregate units

pub mod platform;
pub mod resolved;
pub mod specification;
pub mod target;
pub mod target_definition;

pub use platform::{determine_platform, DeploymentTarget, Platform, PlatformName};
pub use resolved::{ResolvedEntry, ResolvedTargets};
pub use specification::{PodVersion, SpecKind, Specification};
pub use target::{AggregateUnit, BuildType, BuildUnit, TargetGraph, UnitId};
pub use target_definition::{BuildConfigurationType, Inheritance, TargetDefinition};
