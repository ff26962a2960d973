//! Generated targets - what the project generator materializes.
//!
//! A BuildUnit is one concrete build target for one package variant. An
//! AggregateUnit is the per-user-target umbrella that lists, per build
//! configuration, which BuildUnits it links.

use std::collections::BTreeMap;
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use serde::{Deserialize, Serialize};

use crate::core::{Platform, Specification, TargetDefinition};
use crate::util::hash::Fingerprint;

/// Architecture setting used when only 64-bit slices are built.
pub const ARCHS_STANDARD_64_BIT: &str = "$(ARCHS_STANDARD_64_BIT)";

/// How a build unit is packaged and linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildType {
    /// Static library (.a)
    #[default]
    StaticLibrary,
    /// Framework bundle wrapping a static library
    StaticFramework,
    /// Dynamically linked framework bundle
    DynamicFramework,
}

impl BuildType {
    /// Infer the build type from the host's packaging and whether the
    /// package declares itself a static framework.
    pub fn infer(host_requires_frameworks: bool, static_framework: bool) -> Self {
        match (host_requires_frameworks, static_framework) {
            (false, _) => BuildType::StaticLibrary,
            (true, true) => BuildType::StaticFramework,
            (true, false) => BuildType::DynamicFramework,
        }
    }

    pub fn is_framework(&self) -> bool {
        matches!(self, BuildType::StaticFramework | BuildType::DynamicFramework)
    }

    pub fn is_dynamic_framework(&self) -> bool {
        matches!(self, BuildType::DynamicFramework)
    }

    /// Name of the built product for a unit labelled `label`.
    pub fn product_name(&self, label: &str) -> String {
        if self.is_framework() {
            format!("{}.framework", label)
        } else {
            format!("lib{}.a", label)
        }
    }
}

/// Index of a BuildUnit inside its TargetGraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub usize);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One concrete build target for one package variant.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildUnit {
    /// Library specs first, then test and app specs
    pub specs: Vec<Specification>,

    /// Platform with the effective deployment target
    pub platform: Platform,

    /// Whether the hosts of this unit package dependencies as frameworks
    pub host_requires_frameworks: bool,

    pub build_type: BuildType,

    pub archs: Vec<String>,

    /// Definitions this unit serves
    pub target_definitions: Vec<TargetDefinition>,

    /// Disambiguates units of the same package
    pub scope_suffix: Option<String>,

    /// Direct (non-transitive) dependencies
    pub dependent_units: Vec<UnitId>,

    /// Extra dependencies of each test spec, keyed by test spec name
    pub test_dependent_units_by_spec_name: BTreeMap<String, Vec<UnitId>>,
}

impl BuildUnit {
    /// Name of the package this unit builds.
    pub fn pod_name(&self) -> &str {
        self.specs.first().map(|s| s.root_name()).unwrap_or_default()
    }

    /// Unique label, e.g. `Foo` or `Foo-iOS`.
    pub fn label(&self) -> String {
        match &self.scope_suffix {
            Some(suffix) if suffix.starts_with('.') => format!("{}{}", self.pod_name(), suffix),
            Some(suffix) => format!("{}-{}", self.pod_name(), suffix),
            None => self.pod_name().to_string(),
        }
    }

    pub fn product_name(&self) -> String {
        self.build_type.product_name(&self.label())
    }

    pub fn requires_frameworks(&self) -> bool {
        self.host_requires_frameworks
    }

    pub fn library_specs(&self) -> impl Iterator<Item = &Specification> {
        self.specs.iter().filter(|s| s.is_library())
    }

    pub fn test_specs(&self) -> impl Iterator<Item = &Specification> {
        self.specs.iter().filter(|s| s.is_test())
    }

    pub fn app_specs(&self) -> impl Iterator<Item = &Specification> {
        self.specs.iter().filter(|s| s.is_app())
    }

    pub fn non_test_specs(&self) -> impl Iterator<Item = &Specification> {
        self.specs.iter().filter(|s| !s.is_test())
    }

    pub fn contains_test_specifications(&self) -> bool {
        self.specs.iter().any(|s| s.is_test())
    }

    pub fn contains_spec(&self, name: &str) -> bool {
        self.specs.iter().any(|s| s.name() == name)
    }

    pub fn serves(&self, definition: &TargetDefinition) -> bool {
        self.target_definitions.contains(definition)
    }
}

/// The umbrella target of one user target definition.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateUnit {
    pub target_definition: TargetDefinition,

    pub platform: Platform,

    pub requires_frameworks: bool,

    pub user_build_configurations: BTreeMap<String, crate::core::BuildConfigurationType>,

    pub archs: Vec<String>,

    /// Units linked per build configuration name
    pub units_by_configuration: BTreeMap<String, Vec<UnitId>>,

    /// Labels of aggregates whose search paths this one inherits
    pub search_paths_aggregates: Vec<String>,
}

impl AggregateUnit {
    pub fn label(&self) -> String {
        self.target_definition.label()
    }

    pub fn units_for_configuration(&self, configuration: &str) -> &[UnitId] {
        self.units_by_configuration
            .get(configuration)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every unit linked in at least one configuration.
    pub fn all_units(&self) -> Vec<UnitId> {
        let mut units: Vec<UnitId> = Vec::new();
        for id in self.units_by_configuration.values().flatten() {
            if !units.contains(id) {
                units.push(*id);
            }
        }
        units
    }
}

/// All generated units plus an edge view for transitive walks.
#[derive(Debug, Clone)]
pub struct TargetGraph {
    units: Vec<BuildUnit>,
    aggregates: Vec<AggregateUnit>,
    graph: DiGraph<UnitId, ()>,
    nodes: Vec<NodeIndex>,
}

impl TargetGraph {
    /// Build the graph from units whose edges are already resolved.
    pub fn new(units: Vec<BuildUnit>, aggregates: Vec<AggregateUnit>) -> Self {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..units.len()).map(|i| graph.add_node(UnitId(i))).collect();

        for (i, unit) in units.iter().enumerate() {
            for dep in &unit.dependent_units {
                if let Some(&to) = nodes.get(dep.0) {
                    if !graph.contains_edge(nodes[i], to) {
                        graph.add_edge(nodes[i], to, ());
                    }
                }
            }
        }

        TargetGraph {
            units,
            aggregates,
            graph,
            nodes,
        }
    }

    pub fn units(&self) -> &[BuildUnit] {
        &self.units
    }

    pub fn aggregates(&self) -> &[AggregateUnit] {
        &self.aggregates
    }

    pub fn unit(&self, id: UnitId) -> &BuildUnit {
        &self.units[id.0]
    }

    pub fn find_unit(&self, label: &str) -> Option<UnitId> {
        self.units.iter().position(|u| u.label() == label).map(UnitId)
    }

    pub fn aggregate(&self, label: &str) -> Option<&AggregateUnit> {
        self.aggregates.iter().find(|a| a.label() == label)
    }

    /// Transitive dependencies of a unit, excluding the unit itself.
    ///
    /// Cycles are cut by the walk's visited set.
    pub fn recursive_dependent_units(&self, id: UnitId) -> Vec<UnitId> {
        self.walk(id, &[id])
    }

    /// Test dependencies of one test spec plus their transitive
    /// dependencies.
    pub fn recursive_test_dependent_units(&self, id: UnitId, test_spec: &str) -> Vec<UnitId> {
        let starts: Vec<UnitId> = self.units[id.0]
            .test_dependent_units_by_spec_name
            .get(test_spec)
            .cloned()
            .unwrap_or_default();
        self.walk(id, &starts)
    }

    fn walk(&self, origin: UnitId, starts: &[UnitId]) -> Vec<UnitId> {
        let mut dfs = Dfs::empty(&self.graph);
        let mut result = Vec::new();
        for start in starts {
            dfs.move_to(self.nodes[start.0]);
            while let Some(node) = dfs.next(&self.graph) {
                let id = self.graph[node];
                if id != origin && !result.contains(&id) {
                    result.push(id);
                }
            }
        }
        result
    }

    /// Stable fingerprint of labels, edges and configuration membership.
    pub fn fingerprint(&self) -> String {
        let mut fp = Fingerprint::new();
        for unit in &self.units {
            fp.update_str(&unit.label());
            fp.update_opt(unit.scope_suffix.as_deref());
            fp.update_str(&unit.platform.to_string());
            fp.update_bool(unit.host_requires_frameworks);
            fp.update_strs(unit.specs.iter().map(|s| s.name()));
            fp.update_strs(unit.target_definitions.iter().map(|d| d.name()));
            for dep in &unit.dependent_units {
                fp.update_str(&self.units[dep.0].label());
            }
            for (spec, deps) in &unit.test_dependent_units_by_spec_name {
                fp.update_str(spec);
                for dep in deps {
                    fp.update_str(&self.units[dep.0].label());
                }
            }
        }
        for aggregate in &self.aggregates {
            fp.update_str(&aggregate.label());
            for (configuration, units) in &aggregate.units_by_configuration {
                fp.update_str(configuration);
                for id in units {
                    fp.update_str(&self.units[id.0].label());
                }
            }
        }
        fp.finish()
    }
}
