//! User-declared build target definitions.
//!
//! Target definitions form a tree: a child inherits its parent's platform,
//! framework packaging, build configurations and (depending on its
//! inheritance mode) the parent's dependencies and configuration whitelists.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::platform::Platform;

/// Type of a user build configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildConfigurationType {
    Debug,
    Release,
}

/// How much of its parent a target definition inherits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inheritance {
    /// Inherit dependencies, whitelists and search paths
    #[default]
    Complete,
    /// Inherit nothing from the parent
    None,
    /// Only inherit header search paths (used by test bundles hosted in apps)
    SearchPaths,
}

/// The build configurations assumed when a target declares none.
pub fn default_build_configurations() -> BTreeMap<String, BuildConfigurationType> {
    BTreeMap::from([
        ("Debug".to_string(), BuildConfigurationType::Debug),
        ("Release".to_string(), BuildConfigurationType::Release),
    ])
}

/// A node in the user's target tree.
///
/// Cheap to clone; two definitions are equal when their labels are equal.
#[derive(Clone)]
pub struct TargetDefinition {
    inner: Arc<TargetDefinitionInner>,
}

#[derive(Clone)]
struct TargetDefinitionInner {
    name: String,
    parent: Option<TargetDefinition>,
    is_abstract: bool,
    platform: Option<Platform>,
    uses_frameworks: Option<bool>,
    build_configurations: Option<BTreeMap<String, BuildConfigurationType>>,
    inheritance: Inheritance,
    /// configuration name -> names of the dependencies enabled for it
    whitelist: BTreeMap<String, BTreeSet<String>>,
    dependencies: Vec<String>,
}

impl TargetDefinition {
    /// Create a root target definition.
    pub fn new(name: impl Into<String>) -> Self {
        TargetDefinition {
            inner: Arc::new(TargetDefinitionInner {
                name: name.into(),
                parent: None,
                is_abstract: false,
                platform: None,
                uses_frameworks: None,
                build_configurations: None,
                inheritance: Inheritance::Complete,
                whitelist: BTreeMap::new(),
                dependencies: Vec::new(),
            }),
        }
    }

    /// Create a definition nested under `parent`.
    pub fn child(name: impl Into<String>, parent: &TargetDefinition) -> Self {
        let mut def = TargetDefinition::new(name);
        Arc::make_mut(&mut def.inner).parent = Some(parent.clone());
        def
    }

    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        Arc::make_mut(&mut self.inner).is_abstract = is_abstract;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        Arc::make_mut(&mut self.inner).platform = Some(platform);
        self
    }

    pub fn with_uses_frameworks(mut self, uses_frameworks: bool) -> Self {
        Arc::make_mut(&mut self.inner).uses_frameworks = Some(uses_frameworks);
        self
    }

    pub fn with_build_configuration(
        mut self,
        name: impl Into<String>,
        kind: BuildConfigurationType,
    ) -> Self {
        Arc::make_mut(&mut self.inner)
            .build_configurations
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), kind);
        self
    }

    pub fn with_inheritance(mut self, inheritance: Inheritance) -> Self {
        Arc::make_mut(&mut self.inner).inheritance = inheritance;
        self
    }

    /// Declare a dependency on a package or sub-unit, enabled for all
    /// configurations.
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.inner).dependencies.push(name.into());
        self
    }

    /// Declare a dependency that is only enabled for the given
    /// configurations.
    pub fn with_configurations_dependency<I, S>(mut self, name: impl Into<String>, configurations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let inner = Arc::make_mut(&mut self.inner);
        for configuration in configurations {
            inner
                .whitelist
                .entry(configuration.into())
                .or_default()
                .insert(name.clone());
        }
        inner.dependencies.push(name);
        self
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn parent(&self) -> Option<&TargetDefinition> {
        self.inner.parent.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    pub fn is_abstract(&self) -> bool {
        self.inner.is_abstract
    }

    pub fn inheritance(&self) -> Inheritance {
        self.inner.inheritance
    }

    /// Unique label: the parent's label joined with this name.
    pub fn label(&self) -> String {
        match &self.inner.parent {
            Some(parent) => format!("{}-{}", parent.label(), self.inner.name),
            None => self.inner.name.clone(),
        }
    }

    /// The platform of this definition or its closest ancestor.
    pub fn platform(&self) -> Option<&Platform> {
        self.inner
            .platform
            .as_ref()
            .or_else(|| self.inner.parent.as_ref().and_then(|p| p.platform()))
    }

    /// Whether packages consumed by this target are packaged as frameworks.
    pub fn uses_frameworks(&self) -> bool {
        match self.inner.uses_frameworks {
            Some(value) => value,
            None => self
                .inner
                .parent
                .as_ref()
                .is_some_and(|p| p.uses_frameworks()),
        }
    }

    /// User build configurations, inherited or defaulted.
    pub fn build_configurations(&self) -> BTreeMap<String, BuildConfigurationType> {
        if let Some(configurations) = &self.inner.build_configurations {
            return configurations.clone();
        }
        match &self.inner.parent {
            Some(parent) => parent.build_configurations(),
            None => default_build_configurations(),
        }
    }

    fn inherits_parent(&self) -> Option<&TargetDefinition> {
        match self.inner.inheritance {
            Inheritance::None => None,
            Inheritance::Complete | Inheritance::SearchPaths => self.inner.parent.as_ref(),
        }
    }

    /// Declared dependency names, including inherited ones.
    pub fn dependencies(&self) -> Vec<String> {
        let mut dependencies = match self.inherits_parent() {
            Some(parent) if self.inner.inheritance == Inheritance::Complete => parent.dependencies(),
            _ => Vec::new(),
        };
        for dep in &self.inner.dependencies {
            if !dependencies.contains(dep) {
                dependencies.push(dep.clone());
            }
        }
        dependencies
    }

    /// Whether the dependency `name` is enabled for `configuration`.
    ///
    /// A dependency that appears in no whitelist is enabled everywhere.
    /// Configuration names compare case-insensitively.
    pub fn pod_whitelisted_for_configuration(&self, name: &str, configuration: &str) -> bool {
        let mut found = false;
        for (whitelisted_configuration, names) in &self.inner.whitelist {
            if names.contains(name) {
                found = true;
                if whitelisted_configuration.eq_ignore_ascii_case(configuration) {
                    return true;
                }
            }
        }
        if found {
            return false;
        }
        match self.inherits_parent() {
            Some(parent) => parent.pod_whitelisted_for_configuration(name, configuration),
            None => true,
        }
    }

    /// Configurations whose whitelists explicitly name `name`, here or in
    /// the ancestors this definition inherits from.
    pub fn whitelisted_configurations_for(&self, name: &str) -> Vec<String> {
        let mut configurations = match self.inherits_parent() {
            Some(parent) => parent.whitelisted_configurations_for(name),
            None => Vec::new(),
        };
        for (configuration, names) in &self.inner.whitelist {
            if names.contains(name) && !configurations.contains(configuration) {
                configurations.push(configuration.clone());
            }
        }
        configurations
    }

    /// Every configuration name mentioned by a whitelist here or upstream.
    pub fn all_whitelisted_configurations(&self) -> Vec<String> {
        let mut configurations = match self.inherits_parent() {
            Some(parent) => parent.all_whitelisted_configurations(),
            None => Vec::new(),
        };
        for configuration in self.inner.whitelist.keys() {
            if !configurations.contains(configuration) {
                configurations.push(configuration.clone());
            }
        }
        configurations
    }

    /// Definitions whose search paths this definition inherits.
    pub fn targets_to_inherit_search_paths(&self) -> Vec<TargetDefinition> {
        let Some(parent) = &self.inner.parent else {
            return Vec::new();
        };
        let same_platform = match (self.platform(), parent.platform()) {
            (Some(a), Some(b)) => a.name == b.name,
            (None, None) => true,
            _ => false,
        };

        if self.inner.inheritance == Inheritance::SearchPaths {
            let mut targets = parent.targets_to_inherit_search_paths();
            targets.push(parent.clone());
            targets
        } else if same_platform {
            parent.targets_to_inherit_search_paths()
        } else {
            Vec::new()
        }
    }
}

impl PartialEq for TargetDefinition {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.label() == other.label()
    }
}

impl Eq for TargetDefinition {}

impl Hash for TargetDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.label().hash(state)
    }
}

impl fmt::Debug for TargetDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetDefinition")
            .field("label", &self.label())
            .field("abstract", &self.inner.is_abstract)
            .field("platform", &self.platform().map(|p| p.to_string()))
            .finish()
    }
}

impl fmt::Display for TargetDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
