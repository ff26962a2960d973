//! Platforms and deployment targets.
//!
//! A Platform pairs a platform name (iOS, OSX, ...) with an optional
//! deployment target. Deployment targets are lenient versions: `9`, `9.0`
//! and `9.0.0` all denote the same target.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::Specification;

/// The iOS deployment target from which only 64-bit binaries are produced.
pub const IOS_64_BIT_ONLY_VERSION: (u64, u64) = (11, 0);

/// The minimum iOS deployment target that supports dynamic frameworks.
pub const IOS_DYNAMIC_FRAMEWORK_MINIMUM: (u64, u64) = (8, 0);

/// Name of a supported platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformName {
    Ios,
    #[serde(alias = "macos")]
    Osx,
    Tvos,
    Watchos,
}

impl PlatformName {
    /// Human readable name, as used in scope suffixes.
    pub fn string_name(&self) -> &'static str {
        match self {
            PlatformName::Ios => "iOS",
            PlatformName::Osx => "OSX",
            PlatformName::Tvos => "tvOS",
            PlatformName::Watchos => "watchOS",
        }
    }

    /// Deployment target assumed when a specification does not declare one.
    pub fn default_deployment_target(&self) -> DeploymentTarget {
        match self {
            PlatformName::Ios => DeploymentTarget::new(4, 3, 0),
            PlatformName::Osx => DeploymentTarget::new(10, 6, 0),
            PlatformName::Tvos => DeploymentTarget::new(9, 0, 0),
            PlatformName::Watchos => DeploymentTarget::new(2, 0, 0),
        }
    }
}

impl fmt::Display for PlatformName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlatformName::Ios => "ios",
            PlatformName::Osx => "osx",
            PlatformName::Tvos => "tvos",
            PlatformName::Watchos => "watchos",
        };
        f.write_str(name)
    }
}

impl FromStr for PlatformName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ios" => Ok(PlatformName::Ios),
            "osx" | "macos" => Ok(PlatformName::Osx),
            "tvos" => Ok(PlatformName::Tvos),
            "watchos" => Ok(PlatformName::Watchos),
            _ => bail!(
                "unknown platform '{}'; expected 'ios', 'osx', 'tvos' or 'watchos'",
                s
            ),
        }
    }
}

/// A deployment target version such as `9.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeploymentTarget(Version);

impl DeploymentTarget {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        DeploymentTarget(Version::new(major, minor, patch))
    }

    /// Parse `9`, `9.0` or `9.0.1`. Missing components are zero.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            bail!("invalid deployment target '{}'", s);
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .with_context(|| format!("invalid deployment target '{}'", s))?;
        }

        Ok(DeploymentTarget::new(numbers[0], numbers[1], numbers[2]))
    }

    pub fn version(&self) -> &Version {
        &self.0
    }

    fn at_least(&self, (major, minor): (u64, u64)) -> bool {
        self.0 >= Version::new(major, minor, 0)
    }
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.patch == 0 {
            write!(f, "{}.{}", self.0.major, self.0.minor)
        } else {
            write!(f, "{}.{}.{}", self.0.major, self.0.minor, self.0.patch)
        }
    }
}

impl FromStr for DeploymentTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        DeploymentTarget::parse(s)
    }
}

impl Serialize for DeploymentTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DeploymentTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        DeploymentTarget::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A platform with an optional deployment target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    pub name: PlatformName,
    pub deployment_target: Option<DeploymentTarget>,
}

impl Platform {
    pub fn new(name: PlatformName, deployment_target: Option<DeploymentTarget>) -> Self {
        Platform {
            name,
            deployment_target,
        }
    }

    pub fn ios() -> Self {
        Platform::new(PlatformName::Ios, None)
    }

    pub fn osx() -> Self {
        Platform::new(PlatformName::Osx, None)
    }

    /// Build a platform from a name and a lenient version string.
    pub fn with_target(name: PlatformName, target: &str) -> Result<Self> {
        Ok(Platform::new(name, Some(DeploymentTarget::parse(target)?)))
    }

    /// The declared deployment target, or the platform default.
    pub fn effective_deployment_target(&self) -> DeploymentTarget {
        self.deployment_target
            .clone()
            .unwrap_or_else(|| self.name.default_deployment_target())
    }

    /// Label used when platforms with the same name must be told apart,
    /// e.g. `iOS7.0`.
    pub fn scope_label(&self) -> String {
        self.to_string().replace(' ', "")
    }

    /// Whether binaries for this platform are 64-bit only.
    pub fn requires_64_bit_archs(&self) -> bool {
        match self.name {
            PlatformName::Osx => true,
            PlatformName::Ios => self
                .effective_deployment_target()
                .at_least(IOS_64_BIT_ONLY_VERSION),
            PlatformName::Watchos | PlatformName::Tvos => false,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.deployment_target {
            Some(target) => write!(f, "{} {}", self.name.string_name(), target),
            None => f.write_str(self.name.string_name()),
        }
    }
}

/// Parses `ios`, `ios 9.0` or `ios@9.0`.
impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().splitn(2, |c: char| c == ' ' || c == '@');
        let name: PlatformName = parts.next().unwrap_or_default().parse()?;
        match parts.next().map(str::trim).filter(|t| !t.is_empty()) {
            Some(target) => Platform::with_target(name, target),
            None => Ok(Platform::new(name, None)),
        }
    }
}

impl PartialOrd for Platform {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Platform {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.deployment_target.cmp(&other.deployment_target))
    }
}

/// Compute the platform a build unit is compiled for.
///
/// The deployment target is the highest one declared across `specs` (falling
/// back to the platform default). Dynamic frameworks on iOS are raised to the
/// minimum iOS version that can load them.
pub fn determine_platform(
    name: PlatformName,
    specs: &[Specification],
    dynamic_framework: bool,
) -> Platform {
    let default = name.default_deployment_target();
    let mut target = specs
        .iter()
        .map(|spec| spec.deployment_target(name).unwrap_or_else(|| default.clone()))
        .max()
        .unwrap_or(default);

    if name == PlatformName::Ios && dynamic_framework {
        let (major, minor) = IOS_DYNAMIC_FRAMEWORK_MINIMUM;
        let minimum = DeploymentTarget::new(major, minor, 0);
        if target < minimum {
            target = minimum;
        }
    }

    Platform::new(name, Some(target))
}
