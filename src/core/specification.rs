//! Specifications - descriptors of a package or one of its sub-units.
//!
//! A package `Foo` is described by a root specification named `Foo` and any
//! number of sub-unit specifications whose names are paths below the root
//! (`Foo/Core`, `Foo/Core/Extras`, `Foo/Tests`). Sub-units are library,
//! test or app specifications.
//!
//! Specifications are owned by the specification repository and are never
//! mutated by the analyzer. They are Arc-wrapped for cheap cloning.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::platform::{DeploymentTarget, PlatformName};

/// Separator between the root name and sub-unit names.
pub const SUBSPEC_SEPARATOR: char = '/';

/// Prefix marking an unpinned version tracking a branch head.
const HEAD_PREFIX: &str = "HEAD";

/// Return the root package name for a (possibly sub-unit) name.
pub fn root_name(name: &str) -> &str {
    name.split(SUBSPEC_SEPARATOR).next().unwrap_or(name)
}

/// Check that a name is a root or a well-formed sub-unit path.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .split(SUBSPEC_SEPARATOR)
            .all(|segment| !segment.trim().is_empty())
}

/// What a specification produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecKind {
    /// Library code linked into consumers
    #[default]
    Library,
    /// Test bundle
    Test,
    /// Application host
    App,
}

/// The resolved version of a package.
///
/// Head versions track a branch rather than a release and are always
/// reinstalled in update mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PodVersion {
    version: Version,
    head: bool,
}

impl PodVersion {
    pub fn new(version: Version) -> Self {
        PodVersion {
            version,
            head: false,
        }
    }

    pub fn head(version: Version) -> Self {
        PodVersion {
            version,
            head: true,
        }
    }

    /// Parse `1.2.3`, lenient `1.2` / `1`, `HEAD` or `HEAD based on 1.2`.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Some(rest) = trimmed.strip_prefix(HEAD_PREFIX) {
            let base = rest.trim().trim_start_matches("based on").trim();
            let version = if base.is_empty() {
                Version::new(0, 0, 0)
            } else {
                parse_lenient_version(base)?
            };
            return Ok(PodVersion::head(version));
        }
        Ok(PodVersion::new(parse_lenient_version(trimmed)?))
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn is_head(&self) -> bool {
        self.head
    }
}

fn parse_lenient_version(s: &str) -> Result<Version> {
    if let Ok(version) = Version::parse(s) {
        return Ok(version);
    }
    match DeploymentTarget::parse(s) {
        Ok(target) => Ok(target.version().clone()),
        Err(_) => bail!("invalid version '{}'", s),
    }
}

impl fmt::Display for PodVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.head {
            write!(f, "{} based on {}", HEAD_PREFIX, self.version)
        } else {
            write!(f, "{}", self.version)
        }
    }
}

impl FromStr for PodVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        PodVersion::parse(s)
    }
}

/// An immutable package or sub-unit descriptor.
#[derive(Clone)]
pub struct Specification {
    inner: Arc<SpecificationInner>,
}

#[derive(Clone)]
struct SpecificationInner {
    name: String,
    version: PodVersion,
    checksum: Option<String>,
    kind: SpecKind,
    deployment_targets: BTreeMap<PlatformName, DeploymentTarget>,
    dependencies: Vec<String>,
    platform_dependencies: BTreeMap<PlatformName, Vec<String>>,
    static_framework: bool,
}

impl Specification {
    /// Create a library specification.
    pub fn new(name: impl Into<String>, version: &str) -> Result<Self> {
        let name = name.into();
        if !is_valid_name(&name) {
            bail!("invalid specification name '{}'", name);
        }

        Ok(Specification {
            inner: Arc::new(SpecificationInner {
                name,
                version: PodVersion::parse(version)?,
                checksum: None,
                kind: SpecKind::Library,
                deployment_targets: BTreeMap::new(),
                dependencies: Vec::new(),
                platform_dependencies: BTreeMap::new(),
                static_framework: false,
            }),
        })
    }

    /// Set what this specification produces.
    pub fn with_kind(mut self, kind: SpecKind) -> Self {
        Arc::make_mut(&mut self.inner).kind = kind;
        self
    }

    /// Set the checksum of the descriptor this specification came from.
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.inner).checksum = Some(checksum.into());
        self
    }

    /// Declare a minimum deployment target for a platform.
    pub fn with_deployment_target(mut self, platform: PlatformName, target: &str) -> Result<Self> {
        let target = DeploymentTarget::parse(target)?;
        Arc::make_mut(&mut self.inner)
            .deployment_targets
            .insert(platform, target);
        Ok(self)
    }

    /// Add a dependency that applies on every platform.
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.inner).dependencies.push(name.into());
        self
    }

    /// Add a dependency that only applies on one platform.
    pub fn with_platform_dependency(mut self, platform: PlatformName, name: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.inner)
            .platform_dependencies
            .entry(platform)
            .or_default()
            .push(name.into());
        self
    }

    /// Mark the package as packaged into a static framework.
    pub fn with_static_framework(mut self, static_framework: bool) -> Self {
        Arc::make_mut(&mut self.inner).static_framework = static_framework;
        self
    }

    /// Full name, e.g. `Foo/Core`.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Name of the root specification, e.g. `Foo`.
    pub fn root_name(&self) -> &str {
        root_name(&self.inner.name)
    }

    pub fn is_root(&self) -> bool {
        !self.inner.name.contains(SUBSPEC_SEPARATOR)
    }

    /// Sub-unit path segments below the root (empty for the root itself).
    pub fn subspec_path(&self) -> Vec<&str> {
        self.inner.name.split(SUBSPEC_SEPARATOR).skip(1).collect()
    }

    pub fn version(&self) -> &PodVersion {
        &self.inner.version
    }

    pub fn checksum(&self) -> Option<&str> {
        self.inner.checksum.as_deref()
    }

    pub fn kind(&self) -> SpecKind {
        self.inner.kind
    }

    pub fn is_library(&self) -> bool {
        self.inner.kind == SpecKind::Library
    }

    pub fn is_test(&self) -> bool {
        self.inner.kind == SpecKind::Test
    }

    pub fn is_app(&self) -> bool {
        self.inner.kind == SpecKind::App
    }

    pub fn is_static_framework(&self) -> bool {
        self.inner.static_framework
    }

    /// The deployment target declared for `platform`, if any.
    pub fn deployment_target(&self, platform: PlatformName) -> Option<DeploymentTarget> {
        self.inner.deployment_targets.get(&platform).cloned()
    }

    /// Names of the specifications this one depends on for `platform`.
    pub fn dependencies(&self, platform: PlatformName) -> Vec<&str> {
        let platform_specific = self
            .inner
            .platform_dependencies
            .get(&platform)
            .into_iter()
            .flatten();

        self.inner
            .dependencies
            .iter()
            .chain(platform_specific)
            .map(String::as_str)
            .collect()
    }
}

impl PartialEq for Specification {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.name == other.inner.name
    }
}

impl Eq for Specification {}

impl Hash for Specification {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.name.hash(state)
    }
}

impl PartialOrd for Specification {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Specification {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.inner.name.cmp(&other.inner.name)
    }
}

impl fmt::Debug for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specification")
            .field("name", &self.inner.name)
            .field("version", &self.inner.version.to_string())
            .field("kind", &self.inner.kind)
            .finish()
    }
}

impl fmt::Display for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.inner.name, self.inner.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_name() {
        assert_eq!(root_name("Foo"), "Foo");
        assert_eq!(root_name("Foo/Core"), "Foo");
        assert_eq!(root_name("Foo/Core/Extras"), "Foo");
    }

    #[test]
    fn test_name_validation() {
        assert!(is_valid_name("Foo"));
        assert!(is_valid_name("Foo/Bar/Baz"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("/Foo"));
        assert!(!is_valid_name("Foo/"));
        assert!(!is_valid_name("Foo//Bar"));
        assert!(Specification::new("Foo//Bar", "1.0").is_err());
    }

    #[test]
    fn test_subspec_path() {
        let spec = Specification::new("Foo/Core/Extras", "1.0").unwrap();
        assert_eq!(spec.subspec_path(), vec!["Core", "Extras"]);
        assert!(!spec.is_root());

        let root = Specification::new("Foo", "1.0").unwrap();
        assert!(root.subspec_path().is_empty());
        assert!(root.is_root());
    }

    #[test]
    fn test_pod_version_parsing() {
        let v = PodVersion::parse("1.0").unwrap();
        assert_eq!(v.version(), &Version::new(1, 0, 0));
        assert!(!v.is_head());

        let head = PodVersion::parse("HEAD based on 2.1").unwrap();
        assert!(head.is_head());
        assert_eq!(head.version(), &Version::new(2, 1, 0));
        assert_eq!(head.to_string(), "HEAD based on 2.1.0");

        assert!(PodVersion::parse("HEAD").unwrap().is_head());
        assert!(PodVersion::parse("one").is_err());
        assert_ne!(PodVersion::parse("1.0").unwrap(), head);
    }

    #[test]
    fn test_platform_dependencies() {
        let spec = Specification::new("Foo", "1.0")
            .unwrap()
            .with_dependency("Bar")
            .with_platform_dependency(PlatformName::Ios, "Baz/Core");

        assert_eq!(spec.dependencies(PlatformName::Ios), vec!["Bar", "Baz/Core"]);
        assert_eq!(spec.dependencies(PlatformName::Osx), vec!["Bar"]);
    }

    #[test]
    fn test_equality_by_name() {
        let a = Specification::new("Foo/Core", "1.0").unwrap();
        let b = Specification::new("Foo/Core", "1.0")
            .unwrap()
            .with_kind(SpecKind::Library);
        let c = Specification::new("Foo/Tests", "1.0")
            .unwrap()
            .with_kind(SpecKind::Test);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(c.is_test());
    }
}
