//! Resolver output consumed by the analyzer.

use crate::core::{Specification, TargetDefinition};

/// A specification assigned to a target definition by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub spec: Specification,

    /// The specification is only pulled in by test specifications.
    pub used_by_tests_only: bool,
}

impl ResolvedEntry {
    pub fn new(spec: Specification) -> Self {
        ResolvedEntry {
            spec,
            used_by_tests_only: false,
        }
    }

    pub fn tests_only(spec: Specification) -> Self {
        ResolvedEntry {
            spec,
            used_by_tests_only: true,
        }
    }
}

/// Resolved entries grouped by target definition, in resolver order.
///
/// Iteration order is insertion order; every ordering decision downstream
/// depends on it.
#[derive(Debug, Clone, Default)]
pub struct ResolvedTargets {
    entries: Vec<(TargetDefinition, Vec<ResolvedEntry>)>,
}

impl ResolvedTargets {
    pub fn new() -> Self {
        ResolvedTargets::default()
    }

    /// Record the entries of a definition. Entries for a definition already
    /// present are appended.
    pub fn insert(&mut self, definition: TargetDefinition, entries: Vec<ResolvedEntry>) {
        match self.entries.iter_mut().find(|(d, _)| *d == definition) {
            Some((_, existing)) => existing.extend(entries),
            None => self.entries.push((definition, entries)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TargetDefinition, &[ResolvedEntry])> {
        self.entries.iter().map(|(d, e)| (d, e.as_slice()))
    }

    pub fn definitions(&self) -> impl Iterator<Item = &TargetDefinition> {
        self.entries.iter().map(|(d, _)| d)
    }

    pub fn entries_for(&self, definition: &TargetDefinition) -> &[ResolvedEntry] {
        self.entries
            .iter()
            .find(|(d, _)| d == definition)
            .map(|(_, e)| e.as_slice())
            .unwrap_or(&[])
    }

    /// Every distinct resolved specification, in first-seen order.
    pub fn specifications(&self) -> Vec<Specification> {
        let mut specs: Vec<Specification> = Vec::new();
        for (_, entries) in &self.entries {
            for entry in entries {
                if !specs.contains(&entry.spec) {
                    specs.push(entry.spec.clone());
                }
            }
        }
        specs
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
