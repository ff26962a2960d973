//! Scope suffixes for the variants of one package.
//!
//! When one package is built in several variants, each variant's unit gets
//! a suffix describing what sets it apart from the others. Variants are
//! split by library spec set first, then by packaging (`framework` /
//! `library`), then by platform. A level that does not split the group
//! contributes no text.

use std::collections::HashMap;

use crate::analyzer::errors::{Result, TargetError};
use crate::analyzer::variant::PackageVariant;
use crate::core::Specification;

/// Variant index and the suffix computed for it so far.
type Scoped = Vec<(usize, Option<String>)>;

/// All variants sharing one root package.
#[derive(Debug, Clone, Copy)]
pub struct VariantGroup<'a> {
    variants: &'a [PackageVariant],
}

impl<'a> VariantGroup<'a> {
    pub fn new(variants: &'a [PackageVariant]) -> Self {
        VariantGroup { variants }
    }

    /// Suffix of each variant, in input order.
    ///
    /// A lone variant gets no suffix. Suffixes are pairwise distinct.
    pub fn scope_suffixes(&self) -> Result<Vec<Option<String>>> {
        if self.variants.len() <= 1 {
            return Ok(vec![None; self.variants.len()]);
        }

        let all: Vec<usize> = (0..self.variants.len()).collect();
        let mut suffixes = vec![None; self.variants.len()];
        for (index, suffix) in self.scope_by_specs(&all) {
            suffixes[index] = suffix;
        }

        self.check_distinct(&suffixes)?;
        Ok(suffixes)
    }

    fn check_distinct(&self, suffixes: &[Option<String>]) -> Result<()> {
        for (i, suffix) in suffixes.iter().enumerate() {
            if suffixes[..i].contains(suffix) {
                return Err(TargetError::DuplicateScopeSuffix {
                    pod: self.variants[i].root_name().to_string(),
                    suffix: suffix.clone().unwrap_or_else(|| "(none)".to_string()),
                });
            }
        }
        Ok(())
    }

    /// Split `indices` by `key`, keeping groups in order of first appearance.
    fn group_by<K, F>(&self, indices: &[usize], key: F) -> Vec<Vec<usize>>
    where
        K: PartialEq,
        F: Fn(&PackageVariant) -> K,
    {
        let mut groups: Vec<(K, Vec<usize>)> = Vec::new();
        for &index in indices {
            let k = key(&self.variants[index]);
            match groups.iter_mut().find(|(existing, _)| *existing == k) {
                Some((_, members)) => members.push(index),
                None => groups.push((k, vec![index])),
            }
        }
        groups.into_iter().map(|(_, members)| members).collect()
    }

    /// Prefix each suffix with `label` of its variant, unless there was only
    /// one group to tell apart.
    fn scope_if_necessary<F>(&self, mut groups: Vec<Scoped>, label: F) -> Scoped
    where
        F: Fn(&PackageVariant) -> Option<String>,
    {
        if groups.len() == 1 {
            return groups.remove(0);
        }

        groups
            .into_iter()
            .flatten()
            .map(|(index, suffix)| {
                let scope = [label(&self.variants[index]), suffix]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join("-");
                (index, (!scope.is_empty()).then_some(scope))
            })
            .collect()
    }

    fn scope_by_specs(&self, indices: &[usize]) -> Scoped {
        let groups = self.group_by(indices, |v| v.specs().to_vec());

        let mut spec_lists = groups.iter().map(|g| self.variants[g[0]].specs());
        let first = spec_lists.next().unwrap_or_default().to_vec();
        let common: Vec<Specification> = spec_lists.fold(first, |common, specs| {
            common.into_iter().filter(|s| specs.contains(s)).collect()
        });

        let scoped = groups.iter().map(|g| self.scope_by_build_type(g)).collect();
        self.scope_if_necessary(scoped, |variant| {
            let mut names: Vec<String> = variant
                .specs()
                .iter()
                .filter(|s| !common.contains(s))
                .map(spec_token)
                .collect();
            names.sort();
            (!names.is_empty()).then(|| names.join("-"))
        })
    }

    fn scope_by_build_type(&self, indices: &[usize]) -> Scoped {
        let groups = self.group_by(indices, |v| v.requires_frameworks());
        let scoped = groups.iter().map(|g| self.scope_by_platform(g)).collect();
        self.scope_if_necessary(scoped, |variant| {
            let label = if variant.requires_frameworks() {
                "framework"
            } else {
                "library"
            };
            Some(label.to_string())
        })
    }

    fn scope_by_platform(&self, indices: &[usize]) -> Scoped {
        let by_name = self.group_by(indices, |v| v.platform().name);

        if by_name.iter().all(|g| g.len() == 1) {
            let scoped = by_name.iter().map(|g| without_suffix(g)).collect();
            self.scope_if_necessary(scoped, |v| Some(v.platform().name.string_name().to_string()))
        } else {
            // Same platform name, different deployment targets.
            let by_platform = self.group_by(indices, |v| v.platform().clone());
            let scoped = by_platform.iter().map(|g| without_suffix(g)).collect();
            self.scope_if_necessary(scoped, |v| Some(v.platform().scope_label()))
        }
    }
}

fn without_suffix(indices: &[usize]) -> Scoped {
    indices.iter().map(|&i| (i, None)).collect()
}

/// `root` for the root spec, otherwise the sub-unit path joined with `_`.
fn spec_token(spec: &Specification) -> String {
    if spec.is_root() {
        "root".to_string()
    } else {
        spec.subspec_path().join("_")
    }
}

/// Memoized scope suffixes, keyed by the variant list they were computed
/// for.
///
/// The cache is owned by the caller and may outlive one generator run.
#[derive(Debug, Default)]
pub struct ScopeCache {
    suffixes: HashMap<Vec<PackageVariant>, Vec<Option<String>>>,
}

impl ScopeCache {
    pub fn new() -> Self {
        ScopeCache::default()
    }

    pub fn scope_suffixes(&mut self, variants: &[PackageVariant]) -> Result<Vec<Option<String>>> {
        if let Some(cached) = self.suffixes.get(variants) {
            return Ok(cached.clone());
        }
        let computed = VariantGroup::new(variants).scope_suffixes()?;
        self.suffixes.insert(variants.to_vec(), computed.clone());
        Ok(computed)
    }

    pub fn len(&self) -> usize {
        self.suffixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }
}
