//! Install state of packages between two analysis passes.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::analyzer::errors::{Result, TargetError};
use crate::core::specification::{is_valid_name, root_name};

/// Category of a package in a StateSet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PodState {
    Added,
    Deleted,
    Changed,
    Unchanged,
}

impl PodState {
    /// Every category, in display order.
    pub const ALL: [PodState; 4] = [
        PodState::Added,
        PodState::Deleted,
        PodState::Changed,
        PodState::Unchanged,
    ];

    /// One-character marker used when listing states.
    pub fn marker(&self) -> char {
        match self {
            PodState::Added => 'A',
            PodState::Deleted => 'R',
            PodState::Changed => 'M',
            PodState::Unchanged => '-',
        }
    }
}

impl fmt::Display for PodState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PodState::Added => "added",
            PodState::Deleted => "deleted",
            PodState::Changed => "changed",
            PodState::Unchanged => "unchanged",
        };
        f.write_str(name)
    }
}

/// Root package names partitioned into added, deleted, changed and
/// unchanged.
///
/// A root name lives in at most one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StateSet {
    added: BTreeSet<String>,
    deleted: BTreeSet<String>,
    changed: BTreeSet<String>,
    unchanged: BTreeSet<String>,
}

impl StateSet {
    pub fn new() -> Self {
        StateSet::default()
    }

    /// Record `name` (or its root, for a sub-unit name) under `state`.
    pub fn add_name(&mut self, name: &str, state: PodState) -> Result<()> {
        if !is_valid_name(name) {
            return Err(TargetError::InvalidName {
                name: name.to_string(),
            });
        }
        let root = root_name(name);

        if let Some(existing) = self.state_of(root) {
            if existing != state {
                return Err(TargetError::ConflictingState {
                    name: root.to_string(),
                    existing,
                    requested: state,
                });
            }
            return Ok(());
        }

        self.names_mut(state).insert(root.to_string());
        Ok(())
    }

    /// Fold another set into this one.
    pub fn merge(&mut self, other: &StateSet) -> Result<()> {
        for state in PodState::ALL {
            for name in other.names(state) {
                self.add_name(name, state)?;
            }
        }
        Ok(())
    }

    /// Category of a root name, if it was recorded.
    pub fn state_of(&self, name: &str) -> Option<PodState> {
        PodState::ALL
            .into_iter()
            .find(|state| self.names(*state).contains(name))
    }

    pub fn names(&self, state: PodState) -> &BTreeSet<String> {
        match state {
            PodState::Added => &self.added,
            PodState::Deleted => &self.deleted,
            PodState::Changed => &self.changed,
            PodState::Unchanged => &self.unchanged,
        }
    }

    fn names_mut(&mut self, state: PodState) -> &mut BTreeSet<String> {
        match state {
            PodState::Added => &mut self.added,
            PodState::Deleted => &mut self.deleted,
            PodState::Changed => &mut self.changed,
            PodState::Unchanged => &mut self.unchanged,
        }
    }

    pub fn added(&self) -> &BTreeSet<String> {
        &self.added
    }

    pub fn deleted(&self) -> &BTreeSet<String> {
        &self.deleted
    }

    pub fn changed(&self) -> &BTreeSet<String> {
        &self.changed
    }

    pub fn unchanged(&self) -> &BTreeSet<String> {
        &self.unchanged
    }

    pub fn is_empty(&self) -> bool {
        PodState::ALL.iter().all(|s| self.names(*s).is_empty())
    }

    pub fn len(&self) -> usize {
        PodState::ALL.iter().map(|s| self.names(*s).len()).sum()
    }

    /// Whether anything must be (re)installed or removed.
    pub fn needs_install(&self) -> bool {
        !self.added.is_empty() || !self.changed.is_empty() || !self.deleted.is_empty()
    }

    /// One `<marker> <name>` line per package, grouped by category in
    /// display order and sorted within each category.
    pub fn display_lines(&self) -> Vec<String> {
        PodState::ALL
            .iter()
            .flat_map(|state| {
                self.names(*state)
                    .iter()
                    .map(move |name| format!("{} {}", state.marker(), name))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_name_normalizes_to_root() {
        let mut state = StateSet::new();
        state.add_name("Foo/Core", PodState::Added).unwrap();
        state.add_name("Foo", PodState::Added).unwrap();

        assert_eq!(state.added().len(), 1);
        assert!(state.added().contains("Foo"));
        assert_eq!(state.state_of("Foo"), Some(PodState::Added));
    }

    #[test]
    fn test_add_name_rejects_malformed_names() {
        let mut state = StateSet::new();
        for name in ["", "/Foo", "Foo//Bar"] {
            let err = state.add_name(name, PodState::Changed).unwrap_err();
            assert!(matches!(err, TargetError::InvalidName { .. }));
        }
        assert!(state.is_empty());
    }

    #[test]
    fn test_conflicting_categories() {
        let mut state = StateSet::new();
        state.add_name("Foo", PodState::Added).unwrap();

        let err = state.add_name("Foo/Core", PodState::Deleted).unwrap_err();
        assert!(matches!(
            err,
            TargetError::ConflictingState {
                existing: PodState::Added,
                requested: PodState::Deleted,
                ..
            }
        ));
    }

    #[test]
    fn test_merge() {
        let mut a = StateSet::new();
        a.add_name("Foo", PodState::Added).unwrap();

        let mut b = StateSet::new();
        b.add_name("Bar", PodState::Unchanged).unwrap();
        b.add_name("Foo", PodState::Added).unwrap();

        a.merge(&b).unwrap();
        assert_eq!(a.len(), 2);
        assert!(a.needs_install());

        let mut c = StateSet::new();
        c.add_name("Bar", PodState::Changed).unwrap();
        assert!(a.merge(&c).is_err());
    }

    #[test]
    fn test_needs_install() {
        let mut state = StateSet::new();
        assert!(!state.needs_install());

        state.add_name("Foo", PodState::Unchanged).unwrap();
        assert!(!state.needs_install());

        state.add_name("Bar", PodState::Deleted).unwrap();
        assert!(state.needs_install());
    }

    #[test]
    fn test_display_lines_order() {
        let mut state = StateSet::new();
        state.add_name("Zed", PodState::Unchanged).unwrap();
        state.add_name("Bar", PodState::Changed).unwrap();
        state.add_name("Old", PodState::Deleted).unwrap();
        state.add_name("New", PodState::Added).unwrap();
        state.add_name("Abc", PodState::Added).unwrap();

        assert_eq!(
            state.display_lines(),
            vec!["A Abc", "A New", "R Old", "M Bar", "- Zed"]
        );
    }
}
