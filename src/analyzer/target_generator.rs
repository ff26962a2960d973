//! Build unit and aggregate generation.
//!
//! Turns the resolver's specs-per-definition into the concrete units the
//! project generator materializes:
//!
//! 1. group each definition's specs by root package into variants
//! 2. one BuildUnit per distinct variant, named with its scope suffix
//! 3. direct dependency edges between units
//! 4. per test spec dependency edges
//! 5. one AggregateUnit per definition, listing units per configuration
//!
//! Abstract definitions are dropped up front and produce nothing.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;

use crate::analyzer::errors::{Result, TargetError};
use crate::analyzer::variant::PackageVariant;
use crate::analyzer::variant_set::ScopeCache;
use crate::core::specification::root_name;
use crate::core::target::ARCHS_STANDARD_64_BIT;
use crate::core::{
    determine_platform, AggregateUnit, BuildType, BuildUnit, Platform, PlatformName,
    ResolvedEntry, ResolvedTargets, SpecKind, Specification, TargetDefinition, TargetGraph,
    UnitId,
};
use crate::util::config::InstallationOptions;

/// The specs of one root package under one definition, split by kind.
struct RootSpecs {
    root: String,
    library: Vec<Specification>,
    tests: Vec<Specification>,
    apps: Vec<Specification>,
}

impl RootSpecs {
    fn new(root: &str) -> Self {
        RootSpecs {
            root: root.to_string(),
            library: Vec::new(),
            tests: Vec::new(),
            apps: Vec::new(),
        }
    }

    fn push(&mut self, spec: &Specification) {
        let bucket = match spec.kind() {
            SpecKind::Library => &mut self.library,
            SpecKind::Test => &mut self.tests,
            SpecKind::App => &mut self.apps,
        };
        if !bucket.contains(spec) {
            bucket.push(spec.clone());
        }
    }
}

/// Group entries by root package, in order of first appearance.
fn specs_by_root(entries: &[ResolvedEntry]) -> Vec<RootSpecs> {
    let mut groups: Vec<RootSpecs> = Vec::new();
    for entry in entries {
        let root = entry.spec.root_name();
        let index = match groups.iter().position(|g| g.root == root) {
            Some(index) => index,
            None => {
                groups.push(RootSpecs::new(root));
                groups.len() - 1
            }
        };
        groups[index].push(&entry.spec);
    }

    // Spec order within one package carries no meaning; sort so equal
    // activations compare equal.
    for group in &mut groups {
        group.library.sort();
        group.tests.sort();
        group.apps.sort();
    }
    groups
}

/// A unit whose platform, packaging and edges are not computed yet.
struct UnitDraft {
    platform_name: PlatformName,
    specs: Vec<Specification>,
    definitions: Vec<TargetDefinition>,
    scope_suffix: Option<String>,
}

/// Dependency specs grouped by root package name.
type DependencyGroups = Vec<(String, Vec<Specification>)>;

fn definition_platform(definition: &TargetDefinition) -> Result<&Platform> {
    definition
        .platform()
        .ok_or_else(|| TargetError::MissingPlatform {
            target: definition.label(),
        })
}

fn archs_for(requires_64_bit: bool) -> Vec<String> {
    if requires_64_bit {
        vec![ARCHS_STANDARD_64_BIT.to_string()]
    } else {
        Vec::new()
    }
}

/// Generates the target graph for one analysis pass.
pub struct TargetGenerator<'a> {
    resolved: Vec<(&'a TargetDefinition, &'a [ResolvedEntry])>,
    options: InstallationOptions,
}

impl<'a> TargetGenerator<'a> {
    pub fn new(resolved: &'a ResolvedTargets, options: InstallationOptions) -> Result<Self> {
        let resolved: Vec<_> = resolved
            .iter()
            .filter(|(definition, _)| !definition.is_abstract())
            .collect();

        for (definition, _) in &resolved {
            definition_platform(definition)?;
        }

        Ok(TargetGenerator { resolved, options })
    }

    /// Run every step and return the finished graph.
    pub fn generate(&self, cache: &mut ScopeCache) -> Result<TargetGraph> {
        let drafts = if self.options.deduplicate_targets {
            self.deduplicated_drafts(cache)?
        } else {
            self.scoped_drafts()?
        };

        let mut units: Vec<BuildUnit> = drafts.into_par_iter().map(materialize).collect();
        tracing::debug!("materialized {} build units", units.len());

        self.resolve_edges(&mut units)?;
        let aggregates = self.aggregates(&units)?;

        tracing::info!(
            "generated {} build units for {} targets",
            units.len(),
            aggregates.len()
        );
        Ok(TargetGraph::new(units, aggregates))
    }

    /// One draft per distinct variant of each root package.
    fn deduplicated_drafts(&self, cache: &mut ScopeCache) -> Result<Vec<UnitDraft>> {
        type VariantUses = Vec<(PackageVariant, Vec<TargetDefinition>)>;
        let mut by_root: Vec<(String, VariantUses)> = Vec::new();

        for &(definition, entries) in &self.resolved {
            let platform = definition_platform(definition)?;

            for group in specs_by_root(entries) {
                let RootSpecs {
                    root,
                    library,
                    tests,
                    apps,
                } = group;
                if library.is_empty() {
                    return Err(TargetError::NoLibrarySpecs {
                        pod: root,
                        target: definition.label(),
                    });
                }

                let variant = PackageVariant::new(
                    library,
                    tests,
                    apps,
                    platform.clone(),
                    definition.uses_frameworks(),
                );

                let index = match by_root.iter().position(|(r, _)| *r == root) {
                    Some(index) => index,
                    None => {
                        by_root.push((root, Vec::new()));
                        by_root.len() - 1
                    }
                };
                let variants = &mut by_root[index].1;

                match variants.iter_mut().find(|(existing, _)| *existing == variant) {
                    Some((existing, definitions)) => {
                        existing.merge_auxiliary(variant.test_specs(), variant.app_specs());
                        definitions.push(definition.clone());
                    }
                    None => variants.push((variant, vec![definition.clone()])),
                }
            }
        }

        let mut drafts = Vec::new();
        for (root, uses) in by_root {
            let (variants, definitions): (Vec<PackageVariant>, Vec<Vec<TargetDefinition>>) =
                uses.into_iter().unzip();
            let suffixes = cache.scope_suffixes(&variants)?;
            tracing::debug!("{}: {} variant(s)", root, variants.len());

            for ((variant, definitions), scope_suffix) in
                variants.into_iter().zip(definitions).zip(suffixes)
            {
                drafts.push(UnitDraft {
                    platform_name: variant.platform().name,
                    specs: variant.all_specs(),
                    definitions,
                    scope_suffix,
                });
            }
        }
        Ok(drafts)
    }

    /// One draft per (definition, root package), scoped by the definition.
    fn scoped_drafts(&self) -> Result<Vec<UnitDraft>> {
        let mut drafts = Vec::new();
        for &(definition, entries) in &self.resolved {
            let platform = definition_platform(definition)?;

            for group in specs_by_root(entries) {
                if group.library.is_empty() {
                    return Err(TargetError::NoLibrarySpecs {
                        pod: group.root,
                        target: definition.label(),
                    });
                }
                let specs = group
                    .library
                    .into_iter()
                    .chain(group.tests)
                    .chain(group.apps)
                    .collect();

                drafts.push(UnitDraft {
                    platform_name: platform.name,
                    specs,
                    definitions: vec![definition.clone()],
                    scope_suffix: Some(definition.label()),
                });
            }
        }
        Ok(drafts)
    }

    /// Steps 3 and 4: direct and per-test-spec dependency edges.
    fn resolve_edges(&self, units: &mut [BuildUnit]) -> Result<()> {
        let mut all_specs: HashMap<&str, &Specification> = HashMap::new();
        for (_, entries) in &self.resolved {
            for entry in entries.iter() {
                all_specs.entry(entry.spec.name()).or_insert(&entry.spec);
            }
        }

        // Smallest units first so the first qualifying candidate is minimal.
        let mut units_by_pod: HashMap<&str, Vec<UnitId>> = HashMap::new();
        for (index, unit) in units.iter().enumerate() {
            units_by_pod
                .entry(unit.pod_name())
                .or_default()
                .push(UnitId(index));
        }
        for ids in units_by_pod.values_mut() {
            ids.sort_by_key(|id| units[id.0].specs.len());
        }

        let mut edges = Vec::with_capacity(units.len());
        for unit in units.iter() {
            let non_test: Vec<&Specification> = unit.non_test_specs().collect();
            let dependencies = dependencies_for_specs(unit, &non_test, &all_specs)?;
            let dependent_units = self.filter_dependencies(&dependencies, &units_by_pod, units, unit)?;

            let mut test_units = BTreeMap::new();
            for test_spec in unit.test_specs() {
                let mut test_dependencies = dependencies_for_specs(unit, &[test_spec], &all_specs)?;
                test_dependencies.retain(|(root, _)| !dependencies.iter().any(|(r, _)| r == root));
                let ids = self.filter_dependencies(&test_dependencies, &units_by_pod, units, unit)?;
                test_units.insert(test_spec.name().to_string(), ids);
            }

            tracing::debug!(
                "{} depends on {} unit(s)",
                unit.label(),
                dependent_units.len()
            );
            edges.push((dependent_units, test_units));
        }

        for (unit, (dependent_units, test_units)) in units.iter_mut().zip(edges) {
            unit.dependent_units = dependent_units;
            unit.test_dependent_units_by_spec_name = test_units;
        }
        Ok(())
    }

    /// Pick, for every dependency root, the smallest unit on the same
    /// platform and packaging that carries every needed spec.
    fn filter_dependencies(
        &self,
        dependencies: &DependencyGroups,
        units_by_pod: &HashMap<&str, Vec<UnitId>>,
        units: &[BuildUnit],
        unit: &BuildUnit,
    ) -> Result<Vec<UnitId>> {
        dependencies
            .iter()
            .map(|(root, specs)| {
                units_by_pod
                    .get(root.as_str())
                    .into_iter()
                    .flatten()
                    .copied()
                    .find(|id| {
                        let candidate = &units[id.0];
                        candidate.platform.name == unit.platform.name
                            && candidate.host_requires_frameworks == unit.host_requires_frameworks
                            && (self.options.deduplicate_targets
                                || candidate.target_definitions.iter().any(|d| unit.serves(d)))
                            && specs.iter().all(|s| candidate.contains_spec(s.name()))
                    })
                    .ok_or_else(|| TargetError::UnresolvedDependency {
                        dependent: unit.label(),
                        dependency: root.clone(),
                        platform: unit.platform.to_string(),
                    })
            })
            .collect()
    }

    /// Step 5: one aggregate per definition.
    fn aggregates(&self, units: &[BuildUnit]) -> Result<Vec<AggregateUnit>> {
        let mut aggregates = Vec::with_capacity(self.resolved.len());

        for &(definition, entries) in &self.resolved {
            let platform = definition_platform(definition)?.clone();
            let user_build_configurations = definition.build_configurations();

            let mut configurations: Vec<String> = user_build_configurations.keys().cloned().collect();
            for configuration in definition.all_whitelisted_configurations() {
                if !configurations.contains(&configuration) {
                    configurations.push(configuration);
                }
            }

            let units_by_configuration =
                self.units_by_configuration(definition, entries, units, &configurations)?;

            aggregates.push(AggregateUnit {
                target_definition: definition.clone(),
                archs: archs_for(platform.requires_64_bit_archs()),
                platform,
                requires_frameworks: definition.uses_frameworks(),
                user_build_configurations,
                units_by_configuration,
                search_paths_aggregates: Vec::new(),
            });
        }

        let search_paths: Vec<Vec<String>> = aggregates
            .iter()
            .map(|aggregate| {
                let inherited = aggregate.target_definition.targets_to_inherit_search_paths();
                aggregates
                    .iter()
                    .filter(|other| inherited.contains(&other.target_definition))
                    .map(AggregateUnit::label)
                    .collect()
            })
            .collect();
        for (aggregate, labels) in aggregates.iter_mut().zip(search_paths) {
            aggregate.search_paths_aggregates = labels;
        }

        Ok(aggregates)
    }

    fn units_by_configuration(
        &self,
        definition: &TargetDefinition,
        entries: &[ResolvedEntry],
        units: &[BuildUnit],
        configurations: &[String],
    ) -> Result<BTreeMap<String, Vec<UnitId>>> {
        let mut by_configuration: BTreeMap<String, Vec<UnitId>> = configurations
            .iter()
            .map(|c| (c.clone(), Vec::new()))
            .collect();
        let declared = definition.dependencies();

        for (index, unit) in units.iter().enumerate() {
            if !unit.serves(definition) {
                continue;
            }
            let used = entries
                .iter()
                .any(|e| !e.used_by_tests_only && unit.contains_spec(e.spec.name()));
            if !used {
                continue;
            }

            let pod = unit.pod_name();
            let pod_dependencies: Vec<&String> =
                declared.iter().filter(|d| root_name(d) == pod).collect();

            for configuration in configurations {
                let mut whitelists: Vec<bool> = Vec::new();
                for dependency in &pod_dependencies {
                    let enabled = definition.pod_whitelisted_for_configuration(dependency, configuration);
                    if !whitelists.contains(&enabled) {
                        whitelists.push(enabled);
                    }
                }

                match whitelists.as_slice() {
                    [] | [true] => {}
                    [false] => continue,
                    _ => {
                        let mut whitelisted: Vec<String> = Vec::new();
                        for dependency in &pod_dependencies {
                            for name in definition.whitelisted_configurations_for(dependency) {
                                if !whitelisted.contains(&name) {
                                    whitelisted.push(name);
                                }
                            }
                        }
                        return Err(TargetError::ConfigurationConflict {
                            pod: pod.to_string(),
                            target: definition.label(),
                            configuration: configuration.clone(),
                            whitelisted,
                        });
                    }
                }

                by_configuration
                    .entry(configuration.clone())
                    .or_default()
                    .push(UnitId(index));
            }
        }

        Ok(by_configuration)
    }
}

/// Step 2: fix platform, packaging and archs of a unit.
fn materialize(draft: UnitDraft) -> BuildUnit {
    let host_requires_frameworks = draft.definitions.iter().any(|d| d.uses_frameworks());
    let static_framework = draft.specs.iter().any(|s| s.is_static_framework());
    let build_type = BuildType::infer(host_requires_frameworks, static_framework);
    let platform = determine_platform(
        draft.platform_name,
        &draft.specs,
        build_type.is_dynamic_framework(),
    );
    let requires_64_bit = draft
        .definitions
        .iter()
        .all(|d| d.platform().is_some_and(|p| p.requires_64_bit_archs()));

    BuildUnit {
        specs: draft.specs,
        platform,
        host_requires_frameworks,
        build_type,
        archs: archs_for(requires_64_bit),
        target_definitions: draft.definitions,
        scope_suffix: draft.scope_suffix,
        dependent_units: Vec::new(),
        test_dependent_units_by_spec_name: BTreeMap::new(),
    }
}

/// Specs `specs` directly depend on, grouped by root, excluding the unit's
/// own package.
fn dependencies_for_specs(
    unit: &BuildUnit,
    specs: &[&Specification],
    all_specs: &HashMap<&str, &Specification>,
) -> Result<DependencyGroups> {
    let mut groups: DependencyGroups = Vec::new();

    for spec in specs {
        for name in spec.dependencies(unit.platform.name) {
            let dependency = all_specs.get(name).ok_or_else(|| TargetError::UnresolvedDependency {
                dependent: spec.name().to_string(),
                dependency: name.to_string(),
                platform: unit.platform.to_string(),
            })?;

            let root = dependency.root_name();
            if root == unit.pod_name() || specs.contains(dependency) {
                continue;
            }

            match groups.iter_mut().find(|(r, _)| r == root) {
                Some((_, members)) => {
                    if !members.contains(*dependency) {
                        members.push((*dependency).clone());
                    }
                }
                None => groups.push((root.to_string(), vec![(*dependency).clone()])),
            }
        }
    }

    Ok(groups)
}

/// Build the target graph for `resolved`.
pub fn build_targets(
    resolved: &ResolvedTargets,
    options: InstallationOptions,
    cache: &mut ScopeCache,
) -> Result<TargetGraph> {
    TargetGenerator::new(resolved, options)?.generate(cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Inheritance;

    fn spec(name: &str) -> Specification {
        Specification::new(name, "1.0").unwrap()
    }

    fn ios(target: &str) -> Platform {
        Platform::with_target(PlatformName::Ios, target).unwrap()
    }

    fn target(name: &str) -> TargetDefinition {
        TargetDefinition::new(name).with_platform(ios("9.0"))
    }

    fn entries(specs: &[&Specification]) -> Vec<ResolvedEntry> {
        specs.iter().map(|s| ResolvedEntry::new((*s).clone())).collect()
    }

    fn build(resolved: &ResolvedTargets) -> Result<TargetGraph> {
        build_targets(resolved, InstallationOptions::default(), &mut ScopeCache::new())
    }

    fn labels(graph: &TargetGraph) -> Vec<String> {
        graph.units().iter().map(BuildUnit::label).collect()
    }

    fn unit<'g>(graph: &'g TargetGraph, label: &str) -> &'g BuildUnit {
        let id = graph.find_unit(label).unwrap();
        graph.unit(id)
    }

    fn dependency_labels(graph: &TargetGraph, label: &str) -> Vec<String> {
        unit(graph, label)
            .dependent_units
            .iter()
            .map(|id| graph.unit(*id).label())
            .collect()
    }

    #[test]
    fn test_identical_variants_share_one_unit() {
        let foo = spec("Foo");
        let t1 = target("T1").with_dependency("Foo");
        let t2 = target("T2").with_dependency("Foo");

        let mut resolved = ResolvedTargets::new();
        resolved.insert(t1.clone(), entries(&[&foo]));
        resolved.insert(t2.clone(), entries(&[&foo]));

        let graph = build(&resolved).unwrap();
        assert_eq!(labels(&graph), vec!["Foo"]);

        let foo_unit = &graph.units()[0];
        assert_eq!(foo_unit.scope_suffix, None);
        assert!(foo_unit.serves(&t1));
        assert!(foo_unit.serves(&t2));
        assert_eq!(foo_unit.build_type, BuildType::StaticLibrary);
        assert_eq!(foo_unit.product_name(), "libFoo.a");
    }

    #[test]
    fn test_different_spec_sets_are_scoped() {
        let foo = spec("Foo");
        let extra = spec("Foo/Extra");

        let mut resolved = ResolvedTargets::new();
        resolved.insert(target("T1"), entries(&[&foo]));
        resolved.insert(target("T2"), entries(&[&foo, &extra]));

        let graph = build(&resolved).unwrap();
        assert_eq!(labels(&graph), vec!["Foo", "Foo-Extra"]);
        assert!(unit(&graph, "Foo-Extra").contains_spec("Foo/Extra"));
        assert!(!unit(&graph, "Foo").contains_spec("Foo/Extra"));
    }

    #[test]
    fn test_platform_variants() {
        let foo = spec("Foo");
        let osx = Platform::with_target(PlatformName::Osx, "10.10").unwrap();

        let mut resolved = ResolvedTargets::new();
        resolved.insert(target("App"), entries(&[&foo]));
        resolved.insert(TargetDefinition::new("Mac").with_platform(osx), entries(&[&foo]));

        let graph = build(&resolved).unwrap();
        assert_eq!(labels(&graph), vec!["Foo-iOS", "Foo-OSX"]);
        assert_eq!(unit(&graph, "Foo-OSX").archs, vec![ARCHS_STANDARD_64_BIT.to_string()]);
        assert!(unit(&graph, "Foo-iOS").archs.is_empty());
        assert_eq!(
            graph.aggregate("Mac").unwrap().archs,
            vec![ARCHS_STANDARD_64_BIT.to_string()]
        );
    }

    #[test]
    fn test_dependency_picks_smallest_covering_unit() {
        let core = spec("Core");
        let core_extra = spec("Core/Extra");
        let app_lib = spec("AppLib").with_dependency("Core");

        let mut resolved = ResolvedTargets::new();
        resolved.insert(target("T1"), entries(&[&core, &app_lib]));
        resolved.insert(target("T2"), entries(&[&core, &core_extra]));

        let graph = build(&resolved).unwrap();
        assert_eq!(dependency_labels(&graph, "AppLib"), vec!["Core"]);
        assert!(unit(&graph, "Core").dependent_units.is_empty());
    }

    #[test]
    fn test_subspec_dependency_requires_covering_unit() {
        let core = spec("Core");
        let core_extra = spec("Core/Extra");
        let app_lib = spec("AppLib").with_dependency("Core/Extra");

        let mut resolved = ResolvedTargets::new();
        resolved.insert(target("T1"), entries(&[&core]));
        resolved.insert(target("T2"), entries(&[&core, &core_extra, &app_lib]));

        let graph = build(&resolved).unwrap();
        assert_eq!(dependency_labels(&graph, "AppLib"), vec!["Core-Extra"]);
    }

    #[test]
    fn test_intra_package_dependencies_are_not_edges() {
        let core = spec("Core");
        let core_extra = spec("Core/Extra").with_dependency("Core");

        let mut resolved = ResolvedTargets::new();
        resolved.insert(target("App"), entries(&[&core, &core_extra]));

        let graph = build(&resolved).unwrap();
        assert!(unit(&graph, "Core").dependent_units.is_empty());
    }

    #[test]
    fn test_framework_hosts_do_not_link_static_units() {
        let core = spec("Core");
        let app_lib = spec("AppLib").with_dependency("Core");

        let mut resolved = ResolvedTargets::new();
        resolved.insert(target("Static"), entries(&[&core]));
        resolved.insert(
            target("Dynamic").with_uses_frameworks(true),
            entries(&[&core, &app_lib]),
        );

        let graph = build(&resolved).unwrap();
        assert_eq!(labels(&graph), vec!["Core-library", "Core-framework", "AppLib"]);
        assert_eq!(dependency_labels(&graph, "AppLib"), vec!["Core-framework"]);
    }

    #[test]
    fn test_dynamic_framework_raises_deployment_target() {
        let foo = spec("Foo")
            .with_deployment_target(PlatformName::Ios, "7.0")
            .unwrap();
        let definition = TargetDefinition::new("App")
            .with_platform(ios("7.0"))
            .with_uses_frameworks(true);

        let mut resolved = ResolvedTargets::new();
        resolved.insert(definition, entries(&[&foo]));

        let graph = build(&resolved).unwrap();
        let foo_unit = unit(&graph, "Foo");
        assert_eq!(foo_unit.build_type, BuildType::DynamicFramework);
        assert_eq!(foo_unit.platform, ios("8.0"));
        assert_eq!(foo_unit.product_name(), "Foo.framework");
    }

    #[test]
    fn test_static_framework_spec() {
        let foo = spec("Foo").with_static_framework(true);
        let definition = target("App").with_uses_frameworks(true);

        let mut resolved = ResolvedTargets::new();
        resolved.insert(definition, entries(&[&foo]));

        let graph = build(&resolved).unwrap();
        assert_eq!(graph.units()[0].build_type, BuildType::StaticFramework);
    }

    #[test]
    fn test_test_spec_edges() {
        let foo = spec("Foo");
        let foo_tests = spec("Foo/Tests")
            .with_kind(SpecKind::Test)
            .with_dependency("Foo")
            .with_dependency("Mock")
            .with_dependency("Bar");
        let bar = spec("Bar");
        let mock = spec("Mock");
        let foo = foo.with_dependency("Bar");

        let mut resolved = ResolvedTargets::new();
        resolved.insert(
            target("App"),
            vec![
                ResolvedEntry::new(foo.clone()),
                ResolvedEntry::new(foo_tests.clone()),
                ResolvedEntry::new(bar.clone()),
                ResolvedEntry::tests_only(mock.clone()),
            ],
        );

        let graph = build(&resolved).unwrap();
        let foo_id = graph.find_unit("Foo").unwrap();
        let foo_unit = graph.unit(foo_id);

        assert_eq!(dependency_labels(&graph, "Foo"), vec!["Bar"]);
        let test_deps: Vec<String> = foo_unit.test_dependent_units_by_spec_name["Foo/Tests"]
            .iter()
            .map(|id| graph.unit(*id).label())
            .collect();
        // `Bar` is already a direct dependency.
        assert_eq!(test_deps, vec!["Mock"]);

        let aggregate = graph.aggregate("App").unwrap();
        let debug: Vec<String> = aggregate
            .units_for_configuration("Debug")
            .iter()
            .map(|id| graph.unit(*id).label())
            .collect();
        assert_eq!(debug, vec!["Foo", "Bar"]);
    }

    #[test]
    fn test_test_specs_merge_into_equal_variant() {
        let foo = spec("Foo");
        let foo_tests = spec("Foo/Tests").with_kind(SpecKind::Test);

        let mut resolved = ResolvedTargets::new();
        resolved.insert(target("T1"), entries(&[&foo]));
        resolved.insert(target("T2"), entries(&[&foo, &foo_tests]));

        let graph = build(&resolved).unwrap();
        assert_eq!(labels(&graph), vec!["Foo"]);
        assert!(graph.units()[0].contains_test_specifications());
    }

    #[test]
    fn test_only_test_specs_is_an_error() {
        let foo_tests = spec("Foo/Tests").with_kind(SpecKind::Test);

        let mut resolved = ResolvedTargets::new();
        resolved.insert(target("App"), entries(&[&foo_tests]));

        let err = build(&resolved).unwrap_err();
        assert!(matches!(err, TargetError::NoLibrarySpecs { ref pod, .. } if pod == "Foo"));
    }

    #[test]
    fn test_unknown_dependency() {
        let foo = spec("Foo").with_dependency("Missing");

        let mut resolved = ResolvedTargets::new();
        resolved.insert(target("App"), entries(&[&foo]));

        let err = build(&resolved).unwrap_err();
        assert!(matches!(
            err,
            TargetError::UnresolvedDependency { ref dependency, .. } if dependency == "Missing"
        ));
    }

    #[test]
    fn test_dependency_without_compatible_unit() {
        let bar = spec("Bar");
        let foo = spec("Foo").with_dependency("Bar");
        let osx = Platform::with_target(PlatformName::Osx, "10.10").unwrap();

        let mut resolved = ResolvedTargets::new();
        resolved.insert(target("App"), entries(&[&foo, &bar]));
        resolved.insert(TargetDefinition::new("Mac").with_platform(osx), entries(&[&foo]));

        let err = build(&resolved).unwrap_err();
        assert!(matches!(
            err,
            TargetError::UnresolvedDependency { ref dependent, ref dependency, .. }
                if dependent == "Foo-OSX" && dependency == "Bar"
        ));
    }

    #[test]
    fn test_missing_platform() {
        let mut resolved = ResolvedTargets::new();
        resolved.insert(TargetDefinition::new("App"), entries(&[&spec("Foo")]));

        let err = build(&resolved).unwrap_err();
        assert!(matches!(err, TargetError::MissingPlatform { ref target } if target == "App"));
    }

    #[test]
    fn test_abstract_definitions_produce_nothing() {
        let base = TargetDefinition::new("Base")
            .with_abstract(true)
            .with_platform(ios("9.0"));
        let app = TargetDefinition::child("App", &base);

        let mut resolved = ResolvedTargets::new();
        resolved.insert(base, entries(&[&spec("Foo")]));
        resolved.insert(app.clone(), entries(&[&spec("Bar")]));

        let graph = build(&resolved).unwrap();
        assert_eq!(labels(&graph), vec!["Bar"]);
        assert_eq!(graph.aggregates().len(), 1);
        assert_eq!(graph.aggregates()[0].target_definition, app);
    }

    #[test]
    fn test_configuration_conflict() {
        let definition = target("App")
            .with_configurations_dependency("Foo/A", ["Release"])
            .with_dependency("Foo/B");

        let mut resolved = ResolvedTargets::new();
        resolved.insert(definition, entries(&[&spec("Foo/A"), &spec("Foo/B")]));

        let err = build(&resolved).unwrap_err();
        assert!(err.to_string().contains("whitelisted for Release"));
        match err {
            TargetError::ConfigurationConflict {
                pod,
                target,
                configuration,
                whitelisted,
            } => {
                assert_eq!(pod, "Foo");
                assert_eq!(target, "App");
                assert_eq!(configuration, "Debug");
                assert_eq!(whitelisted, vec!["Release".to_string()]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_whitelisted_unit_only_in_its_configuration() {
        let definition = target("App")
            .with_configurations_dependency("Foo", ["Release"])
            .with_dependency("Bar");

        let mut resolved = ResolvedTargets::new();
        resolved.insert(definition, entries(&[&spec("Foo"), &spec("Bar")]));

        let graph = build(&resolved).unwrap();
        let aggregate = graph.aggregate("App").unwrap();
        let names = |configuration: &str| -> Vec<String> {
            aggregate
                .units_for_configuration(configuration)
                .iter()
                .map(|id| graph.unit(*id).label())
                .collect()
        };
        assert_eq!(names("Debug"), vec!["Bar"]);
        assert_eq!(names("Release"), vec!["Foo", "Bar"]);
    }

    #[test]
    fn test_tests_only_units_are_not_aggregated() {
        let mut resolved = ResolvedTargets::new();
        resolved.insert(
            target("App"),
            vec![
                ResolvedEntry::new(spec("Foo")),
                ResolvedEntry::tests_only(spec("Mock")),
            ],
        );

        let graph = build(&resolved).unwrap();
        assert_eq!(graph.units().len(), 2);
        let aggregate = graph.aggregate("App").unwrap();
        assert_eq!(aggregate.all_units().len(), 1);
    }

    #[test]
    fn test_search_path_inheritance() {
        let app = target("App");
        let tests = TargetDefinition::child("AppTests", &app).with_inheritance(Inheritance::SearchPaths);

        let mut resolved = ResolvedTargets::new();
        resolved.insert(app, entries(&[&spec("Foo")]));
        resolved.insert(tests, entries(&[&spec("Bar")]));

        let graph = build(&resolved).unwrap();
        let aggregate = graph.aggregate("App-AppTests").unwrap();
        assert_eq!(aggregate.search_paths_aggregates, vec!["App".to_string()]);
        assert!(graph.aggregate("App").unwrap().search_paths_aggregates.is_empty());
    }

    #[test]
    fn test_without_deduplication_every_definition_gets_units() {
        let foo = spec("Foo");
        let bar = spec("Bar").with_dependency("Foo");

        let mut resolved = ResolvedTargets::new();
        resolved.insert(target("T1"), entries(&[&foo, &bar]));
        resolved.insert(target("T2"), entries(&[&foo]));

        let options = InstallationOptions {
            deduplicate_targets: false,
            ..InstallationOptions::default()
        };
        let graph = build_targets(&resolved, options, &mut ScopeCache::new()).unwrap();

        assert_eq!(labels(&graph), vec!["Foo-T1", "Bar-T1", "Foo-T2"]);
        assert_eq!(dependency_labels(&graph, "Bar-T1"), vec!["Foo-T1"]);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let foo = spec("Foo");
        let extra = spec("Foo/Extra");
        let bar = spec("Bar").with_dependency("Foo");

        let mut resolved = ResolvedTargets::new();
        resolved.insert(target("T1"), entries(&[&foo, &bar]));
        resolved.insert(target("T2"), entries(&[&foo, &extra]));

        let mut cache = ScopeCache::new();
        let first = build_targets(&resolved, InstallationOptions::default(), &mut cache).unwrap();
        let second = build_targets(&resolved, InstallationOptions::default(), &mut cache).unwrap();

        assert_eq!(first.units(), second.units());
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(cache.len(), 2);
    }
}
