//! Build-relevant activation state of one package.

use std::hash::{Hash, Hasher};

use crate::core::{Platform, Specification};

/// The activated specs of one root package under one target definition,
/// plus the platform and packaging they are built for.
///
/// Identity is the ordered library spec list, the platform and the
/// framework requirement. Test and app specs ride along and can be merged
/// in later without affecting equality or hashing.
#[derive(Debug, Clone)]
pub struct PackageVariant {
    specs: Vec<Specification>,
    test_specs: Vec<Specification>,
    app_specs: Vec<Specification>,
    platform: Platform,
    requires_frameworks: bool,
}

impl PackageVariant {
    /// `specs` are the library specs and must not be empty.
    pub fn new(
        specs: Vec<Specification>,
        test_specs: Vec<Specification>,
        app_specs: Vec<Specification>,
        platform: Platform,
        requires_frameworks: bool,
    ) -> Self {
        PackageVariant {
            specs,
            test_specs,
            app_specs,
            platform,
            requires_frameworks,
        }
    }

    /// A variant with library specs only.
    pub fn library(specs: Vec<Specification>, platform: Platform, requires_frameworks: bool) -> Self {
        PackageVariant::new(specs, Vec::new(), Vec::new(), platform, requires_frameworks)
    }

    pub fn root_name(&self) -> &str {
        self.specs.first().map(|s| s.root_name()).unwrap_or_default()
    }

    /// Library specs, in activation order.
    pub fn specs(&self) -> &[Specification] {
        &self.specs
    }

    pub fn test_specs(&self) -> &[Specification] {
        &self.test_specs
    }

    pub fn app_specs(&self) -> &[Specification] {
        &self.app_specs
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn requires_frameworks(&self) -> bool {
        self.requires_frameworks
    }

    /// Library specs followed by test and app specs.
    pub fn all_specs(&self) -> Vec<Specification> {
        self.specs
            .iter()
            .chain(&self.test_specs)
            .chain(&self.app_specs)
            .cloned()
            .collect()
    }

    /// Union test and app specs contributed by another target definition.
    pub fn merge_auxiliary(&mut self, test_specs: &[Specification], app_specs: &[Specification]) {
        union_into(&mut self.test_specs, test_specs);
        union_into(&mut self.app_specs, app_specs);
    }
}

fn union_into(target: &mut Vec<Specification>, extra: &[Specification]) {
    for spec in extra {
        if !target.contains(spec) {
            target.push(spec.clone());
        }
    }
}

impl PartialEq for PackageVariant {
    fn eq(&self, other: &Self) -> bool {
        self.specs == other.specs
            && self.platform == other.platform
            && self.requires_frameworks == other.requires_frameworks
    }
}

impl Eq for PackageVariant {}

impl Hash for PackageVariant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.specs.hash(state);
        self.platform.hash(state);
        self.requires_frameworks.hash(state);
    }
}
