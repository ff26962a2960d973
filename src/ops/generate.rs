//! Implementation of `berth targets`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::analyzer::{build_targets, ScopeCache};
use crate::core::{TargetGraph, UnitId};
use crate::ops::graph_file::load_input;
use crate::util::config::InstallationOptions;

/// Options for target generation.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Analysis input file
    pub input: PathBuf,

    pub installation: InstallationOptions,
}

/// Load the analysis input and build its target graph.
pub fn generate_targets(opts: &GenerateOptions) -> Result<TargetGraph> {
    let input = load_input(&opts.input)?;
    tracing::info!(
        "generating targets for {} ({})",
        opts.input.display(),
        if opts.installation.deduplicate_targets {
            "deduplicated"
        } else {
            "per target"
        }
    );

    let mut cache = ScopeCache::new();
    let graph = build_targets(&input.resolved, opts.installation, &mut cache)?;
    Ok(graph)
}

/// Printable view of a generated graph.
#[derive(Debug, Serialize)]
pub struct GraphReport {
    pub fingerprint: String,
    pub units: Vec<UnitReport>,
    pub aggregates: Vec<AggregateReport>,
}

#[derive(Debug, Serialize)]
pub struct UnitReport {
    pub label: String,
    pub scope_suffix: Option<String>,
    pub product: String,
    pub platform: String,
    pub specs: Vec<String>,
    pub targets: Vec<String>,
    pub archs: Vec<String>,
    pub dependencies: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub test_dependencies: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct AggregateReport {
    pub label: String,
    pub platform: String,
    pub archs: Vec<String>,
    pub configurations: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_paths_from: Vec<String>,
}

impl GraphReport {
    pub fn from_graph(graph: &TargetGraph) -> Self {
        let label_of = |ids: &[UnitId]| -> Vec<String> {
            ids.iter().map(|id| graph.unit(*id).label()).collect()
        };

        let units = graph
            .units()
            .iter()
            .map(|unit| UnitReport {
                label: unit.label(),
                scope_suffix: unit.scope_suffix.clone(),
                product: unit.product_name(),
                platform: unit.platform.to_string(),
                specs: unit.specs.iter().map(|s| s.name().to_string()).collect(),
                targets: unit.target_definitions.iter().map(|d| d.label()).collect(),
                archs: unit.archs.clone(),
                dependencies: label_of(&unit.dependent_units),
                test_dependencies: unit
                    .test_dependent_units_by_spec_name
                    .iter()
                    .map(|(spec, ids)| (spec.clone(), label_of(ids)))
                    .collect(),
            })
            .collect();

        let aggregates = graph
            .aggregates()
            .iter()
            .map(|aggregate| AggregateReport {
                label: aggregate.label(),
                platform: aggregate.platform.to_string(),
                archs: aggregate.archs.clone(),
                configurations: aggregate
                    .units_by_configuration
                    .iter()
                    .map(|(configuration, ids)| (configuration.clone(), label_of(ids)))
                    .collect(),
                search_paths_from: aggregate.search_paths_aggregates.clone(),
            })
            .collect();

        GraphReport {
            fingerprint: graph.fingerprint(),
            units,
            aggregates,
        }
    }
}

/// Format a report for terminal output.
pub fn format_report(report: &GraphReport) -> String {
    let mut out = String::new();

    for unit in &report.units {
        let _ = writeln!(out, "{} ({}, {})", unit.label, unit.product, unit.platform);
        let _ = writeln!(out, "    specs: {}", unit.specs.join(", "));
        let _ = writeln!(out, "    targets: {}", unit.targets.join(", "));
        if !unit.dependencies.is_empty() {
            let _ = writeln!(out, "    depends on: {}", unit.dependencies.join(", "));
        }
        for (spec, dependencies) in &unit.test_dependencies {
            if !dependencies.is_empty() {
                let _ = writeln!(out, "    {} depends on: {}", spec, dependencies.join(", "));
            }
        }
    }

    for aggregate in &report.aggregates {
        let _ = writeln!(out, "Pods-{} ({})", aggregate.label, aggregate.platform);
        for (configuration, units) in &aggregate.configurations {
            let _ = writeln!(out, "    {}: {}", configuration, units.join(", "));
        }
        if !aggregate.search_paths_from.is_empty() {
            let _ = writeln!(
                out,
                "    search paths from: {}",
                aggregate.search_paths_from.join(", ")
            );
        }
    }

    out
}
