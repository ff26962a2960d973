//! Analysis input file.
//!
//! A `graph.toml` describes resolver output: the specifications, the user's
//! target definition tree, and the specs resolved for each definition.
//!
//! ```toml
//! [[spec]]
//! name = "Foo"
//! version = "1.0"
//! dependencies = ["Bar"]
//! deployment_targets = { ios = "9.0" }
//!
//! [[target]]
//! name = "App"
//! platform = "ios 9.0"
//! dependencies = ["Foo"]
//! whitelist = { Release = ["Foo"] }
//!
//! [[resolved]]
//! target = "App"
//! specs = ["Foo", "Bar"]
//! ```
//!
//! `parent` and `resolved.target` name definitions by label.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::specification::root_name;
use crate::core::{
    BuildConfigurationType, Inheritance, Platform, PlatformName, ResolvedEntry, ResolvedTargets,
    SpecKind, Specification, TargetDefinition,
};
use crate::util::fs::read_to_string;
use crate::util::hash::sha256_str;

/// Raw analysis input as deserialized from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct GraphFile {
    #[serde(rename = "spec", default)]
    pub specs: Vec<SpecEntry>,

    #[serde(rename = "target", default)]
    pub targets: Vec<TargetEntry>,

    #[serde(default)]
    pub resolved: Vec<ResolvedEntryDecl>,
}

/// A `[[spec]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecEntry {
    pub name: String,

    pub version: String,

    #[serde(default)]
    pub kind: SpecKind,

    /// Checksum of the root package, inherited by its sub-units. Defaults to
    /// the SHA-256 of the normalized root entry.
    #[serde(default, skip_serializing)]
    pub checksum: Option<String>,

    #[serde(default)]
    pub static_framework: bool,

    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Platform name -> extra dependencies on that platform
    #[serde(default)]
    pub platform_dependencies: BTreeMap<String, Vec<String>>,

    /// Platform name -> minimum deployment target
    #[serde(default)]
    pub deployment_targets: BTreeMap<String, String>,
}

/// A `[[target]]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetEntry {
    pub name: String,

    /// Label of the parent definition, declared earlier in the file
    #[serde(default)]
    pub parent: Option<String>,

    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,

    /// e.g. `ios 9.0` or `osx`
    #[serde(default)]
    pub platform: Option<String>,

    #[serde(default)]
    pub uses_frameworks: Option<bool>,

    #[serde(default)]
    pub inheritance: Inheritance,

    #[serde(default)]
    pub build_configurations: BTreeMap<String, BuildConfigurationType>,

    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Configuration name -> dependencies only enabled for it
    #[serde(default)]
    pub whitelist: BTreeMap<String, Vec<String>>,
}

/// A `[[resolved]]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolvedEntryDecl {
    /// Label of the target definition
    pub target: String,

    #[serde(default)]
    pub specs: Vec<String>,

    /// Specs only pulled in by test specs
    #[serde(default)]
    pub tests_only: Vec<String>,
}

/// Everything one analysis pass needs.
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    /// Every declared specification, in file order
    pub specs: Vec<Specification>,
    pub resolved: ResolvedTargets,
}

impl AnalysisInput {
    /// The specifications that were resolved for at least one definition.
    pub fn resolved_specs(&self) -> Vec<Specification> {
        self.resolved.specifications()
    }
}

impl GraphFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = read_to_string(path)?;
        Self::parse(&content).with_context(|| format!("in {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "failed to parse analysis input")
    }

    pub fn into_input(self) -> Result<AnalysisInput> {
        let checksums = package_checksums(&self.specs)?;
        let mut specs_by_name: HashMap<String, Specification> = HashMap::new();
        let mut specs = Vec::with_capacity(self.specs.len());
        for entry in &self.specs {
            let checksum = checksums
                .get(root_name(&entry.name))
                .cloned()
                .with_context(|| format!("no checksum for `{}`", entry.name))?;
            let spec = entry.to_specification(checksum)?;
            if specs_by_name.insert(spec.name().to_string(), spec.clone()).is_some() {
                bail!("specification `{}` is declared twice", spec.name());
            }
            specs.push(spec);
        }

        let mut definitions: HashMap<String, TargetDefinition> = HashMap::new();
        for entry in &self.targets {
            let parent = match &entry.parent {
                Some(label) => Some(definitions.get(label).with_context(|| {
                    format!(
                        "target `{}` names unknown parent `{}` (parents must be declared first)",
                        entry.name, label
                    )
                })?),
                None => None,
            };
            let definition = entry.to_definition(parent)?;
            let label = definition.label();
            if definitions.insert(label.clone(), definition).is_some() {
                bail!("target `{}` is declared twice", label);
            }
        }
        tracing::debug!(
            "loaded {} specifications and {} targets",
            specs.len(),
            definitions.len()
        );

        let mut resolved = ResolvedTargets::new();
        for decl in &self.resolved {
            let definition = definitions
                .get(&decl.target)
                .with_context(|| format!("resolved entries name unknown target `{}`", decl.target))?;

            let lookup = |name: &String| {
                specs_by_name.get(name).cloned().with_context(|| {
                    format!(
                        "target `{}` resolves undeclared specification `{}`",
                        decl.target, name
                    )
                })
            };
            let mut entries = Vec::with_capacity(decl.specs.len() + decl.tests_only.len());
            for name in &decl.specs {
                entries.push(ResolvedEntry::new(lookup(name)?));
            }
            for name in &decl.tests_only {
                entries.push(ResolvedEntry::tests_only(lookup(name)?));
            }
            resolved.insert(definition.clone(), entries);
        }

        Ok(AnalysisInput { specs, resolved })
    }
}

impl SpecEntry {
    /// SHA-256 of the entry with its checksum field left out.
    pub fn normalized_checksum(&self) -> Result<String> {
        let normalized = serde_json::to_string(self)?;
        Ok(sha256_str(&normalized))
    }

    fn to_specification(&self, checksum: String) -> Result<Specification> {
        let mut spec = Specification::new(self.name.clone(), &self.version)
            .with_context(|| format!("invalid specification `{}`", self.name))?
            .with_kind(self.kind)
            .with_checksum(checksum)
            .with_static_framework(self.static_framework);

        for dependency in &self.dependencies {
            spec = spec.with_dependency(dependency.clone());
        }
        for (platform, dependencies) in &self.platform_dependencies {
            let platform: PlatformName = platform.parse()?;
            for dependency in dependencies {
                spec = spec.with_platform_dependency(platform, dependency.clone());
            }
        }
        for (platform, target) in &self.deployment_targets {
            let platform: PlatformName = platform.parse()?;
            spec = spec
                .with_deployment_target(platform, target)
                .with_context(|| format!("invalid deployment target for `{}`", self.name))?;
        }

        Ok(spec)
    }
}

impl TargetEntry {
    fn to_definition(&self, parent: Option<&TargetDefinition>) -> Result<TargetDefinition> {
        let mut definition = match parent {
            Some(parent) => TargetDefinition::child(self.name.clone(), parent),
            None => TargetDefinition::new(self.name.clone()),
        }
        .with_abstract(self.is_abstract)
        .with_inheritance(self.inheritance);

        if let Some(platform) = &self.platform {
            let platform: Platform = platform
                .parse()
                .with_context(|| format!("invalid platform for target `{}`", self.name))?;
            definition = definition.with_platform(platform);
        }
        if let Some(uses_frameworks) = self.uses_frameworks {
            definition = definition.with_uses_frameworks(uses_frameworks);
        }
        for (configuration, kind) in &self.build_configurations {
            definition = definition.with_build_configuration(configuration.clone(), *kind);
        }

        for dependency in &self.dependencies {
            let configurations: Vec<&String> = self
                .whitelist
                .iter()
                .filter(|(_, names)| names.contains(dependency))
                .map(|(configuration, _)| configuration)
                .collect();

            definition = if configurations.is_empty() {
                definition.with_dependency(dependency.clone())
            } else {
                definition.with_configurations_dependency(dependency.clone(), configurations)
            };
        }

        for (configuration, names) in &self.whitelist {
            if let Some(name) = names.iter().find(|n| !self.dependencies.contains(*n)) {
                bail!(
                    "target `{}` whitelists `{}` for `{}` but does not depend on it",
                    self.name,
                    name,
                    configuration
                );
            }
        }

        Ok(definition)
    }
}

/// Checksum of every root package declared in `entries`.
///
/// The root entry decides. A package declared only through sub-units takes
/// the first explicit sub-unit checksum by name, else a digest over all of
/// its entries sorted by name.
fn package_checksums(entries: &[SpecEntry]) -> Result<BTreeMap<String, String>> {
    let mut packages: BTreeMap<&str, Vec<&SpecEntry>> = BTreeMap::new();
    for entry in entries {
        packages.entry(root_name(&entry.name)).or_default().push(entry);
    }

    let mut checksums = BTreeMap::new();
    for (root, mut members) in packages {
        members.sort_by(|a, b| a.name.cmp(&b.name));

        let checksum = match members.iter().find(|e| e.name == root) {
            Some(entry) => match &entry.checksum {
                Some(checksum) => checksum.clone(),
                None => entry.normalized_checksum()?,
            },
            None => match members.iter().find_map(|e| e.checksum.clone()) {
                Some(checksum) => checksum,
                None => {
                    let digests = members
                        .iter()
                        .map(|e| e.normalized_checksum())
                        .collect::<Result<Vec<_>>>()?;
                    sha256_str(&digests.join("\n"))
                }
            },
        };
        checksums.insert(root.to_string(), checksum);
    }
    Ok(checksums)
}

/// Read and convert the analysis input at `path`.
pub fn load_input(path: &Path) -> Result<AnalysisInput> {
    GraphFile::load(path)?.into_input()
}
