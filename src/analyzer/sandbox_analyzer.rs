//! Diff of the resolved packages against the previous installation.
//!
//! Each root name seen in either the resolution or the installation record
//! is classified by an ordered cascade (first match wins):
//!
//! 1. added: newly resolved, or its directory is missing on disk
//! 2. deleted: recorded but no longer resolved
//! 3. changed: version, checksum or sub-unit list differ, the package was
//!    pre-downloaded, its directory is empty, or it tracks a head version
//!    and an update was requested
//! 4. unchanged

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::analyzer::errors::Result;
use crate::analyzer::state::{PodState, StateSet};
use crate::core::specification::root_name;
use crate::core::{PodVersion, Specification};
use crate::util::fs::dir_is_empty;

/// What the previous installation recorded about one root package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPod {
    pub version: PodVersion,
    pub checksum: Option<String>,
    /// Names of every installed sub-unit, including the root itself
    pub spec_names: Vec<String>,
    pub predownloaded: bool,
}

/// The persisted state of the previous installation, keyed by root name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallationRecord {
    pods: BTreeMap<String, RecordedPod>,
}

impl InstallationRecord {
    pub fn new() -> Self {
        InstallationRecord::default()
    }

    /// Build the record an installation of `specs` leaves behind.
    pub fn from_specs(specs: &[Specification]) -> Self {
        let mut record = InstallationRecord::new();
        let roots: BTreeSet<&str> = specs.iter().map(|s| s.root_name()).collect();
        for root in roots {
            let Some(spec) = package_spec(specs, root) else {
                continue;
            };
            let spec_names: BTreeSet<&str> = specs
                .iter()
                .filter(|s| s.root_name() == root)
                .map(|s| s.name())
                .collect();
            record.pods.insert(
                root.to_string(),
                RecordedPod {
                    version: spec.version().clone(),
                    checksum: spec.checksum().map(str::to_string),
                    spec_names: spec_names.into_iter().map(str::to_string).collect(),
                    predownloaded: false,
                },
            );
        }
        record
    }

    /// Record `pod` under the root of `name`.
    ///
    /// An entry keyed by a sub-unit name merges into its root's entry. The
    /// root's own entry decides version and checksum.
    pub fn insert(&mut self, name: &str, pod: RecordedPod) {
        let root = root_name(name);
        match self.pods.entry(root.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(pod);
            }
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get_mut();
                if root == name {
                    existing.version = pod.version;
                    existing.checksum = pod.checksum;
                }
                existing.predownloaded |= pod.predownloaded;
                existing.spec_names.extend(pod.spec_names);
                existing.spec_names.sort();
                existing.spec_names.dedup();
            }
        }
    }

    pub fn get(&self, root: &str) -> Option<&RecordedPod> {
        self.pods.get(root)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RecordedPod)> {
        self.pods.iter().map(|(name, pod)| (name.as_str(), pod))
    }

    /// Recorded root names, sorted.
    pub fn root_names(&self) -> impl Iterator<Item = &str> {
        self.pods.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }

    /// Sorted, de-duplicated sub-unit names recorded for `root`.
    fn spec_names(&self, root: &str) -> Vec<&str> {
        let names: BTreeSet<&str> = self
            .pods
            .get(root)
            .into_iter()
            .flat_map(|pod| pod.spec_names.iter().map(String::as_str))
            .collect();
        names.into_iter().collect()
    }
}

/// On-disk view of the installed package directories.
pub trait PodDirectories {
    /// Whether the directory for `root` exists.
    fn exists(&self, root: &str) -> bool;

    /// Whether the directory for `root` exists and has no entries.
    fn is_empty(&self, root: &str) -> bool;
}

/// Package directories laid out as `<pods_dir>/<root name>`.
#[derive(Debug, Clone)]
pub struct SandboxDirectories {
    root: PathBuf,
}

impl SandboxDirectories {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        SandboxDirectories { root: root.into() }
    }

    pub fn pod_dir(&self, root: &str) -> PathBuf {
        self.root.join(root)
    }
}

impl PodDirectories for SandboxDirectories {
    fn exists(&self, root: &str) -> bool {
        self.pod_dir(root).is_dir()
    }

    fn is_empty(&self, root: &str) -> bool {
        dir_is_empty(&self.pod_dir(root))
    }
}

/// Classifies root packages against an installation record.
pub struct SandboxAnalyzer<'a> {
    specs: &'a [Specification],
    record: Option<&'a InstallationRecord>,
    directories: &'a dyn PodDirectories,
    update_mode: bool,
}

impl<'a> SandboxAnalyzer<'a> {
    pub fn new(
        specs: &'a [Specification],
        record: Option<&'a InstallationRecord>,
        directories: &'a dyn PodDirectories,
        update_mode: bool,
    ) -> Self {
        SandboxAnalyzer {
            specs,
            record,
            directories,
            update_mode,
        }
    }

    pub fn analyze(&self) -> Result<StateSet> {
        let mut state = StateSet::new();
        let resolved = self.resolved_pods();

        let Some(record) = self.record else {
            tracing::debug!("no installation record, every package is added");
            for name in &resolved {
                state.add_name(name, PodState::Added)?;
            }
            return Ok(state);
        };

        let mut all_names: BTreeSet<&str> = resolved.iter().copied().collect();
        all_names.extend(record.root_names());

        for name in all_names {
            let pod_state = self.pod_state(name, &resolved, record);
            tracing::debug!("{} {}", pod_state.marker(), name);
            state.add_name(name, pod_state)?;
        }

        Ok(state)
    }

    fn pod_state(&self, pod: &str, resolved: &BTreeSet<&str>, record: &InstallationRecord) -> PodState {
        let is_resolved = resolved.contains(pod);
        let is_recorded = record.get(pod).is_some();

        if (is_resolved && !is_recorded) || !self.directories.exists(pod) {
            PodState::Added
        } else if !is_resolved && is_recorded {
            PodState::Deleted
        } else if self.pod_changed(pod, record) {
            PodState::Changed
        } else {
            PodState::Unchanged
        }
    }

    fn pod_changed(&self, pod: &str, record: &InstallationRecord) -> bool {
        let (Some(spec), Some(recorded)) = (self.root_spec(pod), record.get(pod)) else {
            return true;
        };

        if spec.version() != &recorded.version {
            return true;
        }
        if spec.checksum() != recorded.checksum.as_deref() {
            return true;
        }
        if self.resolved_spec_names(pod) != record.spec_names(pod) {
            return true;
        }
        if recorded.predownloaded {
            return true;
        }
        if self.directories.is_empty(pod) {
            return true;
        }
        self.update_mode && spec.version().is_head()
    }

    fn resolved_pods(&self) -> BTreeSet<&'a str> {
        self.specs.iter().map(|s| s.root_name()).collect()
    }

    fn root_spec(&self, pod: &str) -> Option<&'a Specification> {
        package_spec(self.specs, pod)
    }

    fn resolved_spec_names(&self, pod: &str) -> Vec<&'a str> {
        let names: BTreeSet<&str> = self
            .specs
            .iter()
            .filter(|s| s.root_name() == pod)
            .map(|s| s.name())
            .collect();
        names.into_iter().collect()
    }
}

/// The spec carrying version and checksum for package `root`: the root spec
/// itself, or the sub-unit with the smallest name when only sub-units were
/// resolved.
fn package_spec<'s>(specs: &'s [Specification], root: &str) -> Option<&'s Specification> {
    specs.iter().find(|s| s.name() == root).or_else(|| {
        specs
            .iter()
            .filter(|s| s.root_name() == root)
            .min_by(|a, b| a.name().cmp(b.name()))
    })
}

/// Compute the install state of `specs` relative to `record`.
///
/// Without a record every resolved root is added.
pub fn analyze_install_state(
    specs: &[Specification],
    record: Option<&InstallationRecord>,
    directories: &dyn PodDirectories,
    update_mode: bool,
) -> Result<StateSet> {
    SandboxAnalyzer::new(specs, record, directories, update_mode).analyze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    /// In-memory package directories.
    #[derive(Default)]
    struct MockDirectories {
        missing: HashSet<String>,
        empty: HashSet<String>,
    }

    impl PodDirectories for MockDirectories {
        fn exists(&self, root: &str) -> bool {
            !self.missing.contains(root)
        }

        fn is_empty(&self, root: &str) -> bool {
            self.empty.contains(root)
        }
    }

    fn spec(name: &str, version: &str, checksum: &str) -> Specification {
        Specification::new(name, version)
            .unwrap()
            .with_checksum(checksum)
    }

    fn recorded(version: &str, checksum: &str, names: &[&str]) -> RecordedPod {
        RecordedPod {
            version: PodVersion::parse(version).unwrap(),
            checksum: Some(checksum.to_string()),
            spec_names: names.iter().map(|n| n.to_string()).collect(),
            predownloaded: false,
        }
    }

    #[test]
    fn test_bootstrap_without_record() {
        let specs = vec![spec("Foo", "1.0", "a"), spec("Foo/Core", "1.0", "a"), spec("Bar", "1.0", "b")];
        let state = analyze_install_state(&specs, None, &MockDirectories::default(), false).unwrap();

        assert_eq!(state.added().iter().collect::<Vec<_>>(), vec!["Bar", "Foo"]);
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_checksum_change_marks_changed() {
        let specs = vec![spec("Bar", "1.0", "xyz")];
        let mut record = InstallationRecord::new();
        record.insert("Bar", recorded("1.0", "abc", &["Bar"]));

        let state = analyze_install_state(&specs, Some(&record), &MockDirectories::default(), false).unwrap();
        assert_eq!(state.changed().iter().collect::<Vec<_>>(), vec!["Bar"]);
        assert!(state.added().is_empty());
    }

    #[test]
    fn test_full_cascade() {
        let specs = vec![
            spec("Same", "1.0", "s"),
            spec("New", "1.0", "n"),
            spec("Bumped", "2.0", "b"),
            spec("Grown", "1.0", "g"),
            spec("Grown/Extra", "1.0", "g"),
        ];
        let mut record = InstallationRecord::new();
        record.insert("Same", recorded("1.0", "s", &["Same"]));
        record.insert("Bumped", recorded("1.0", "b", &["Bumped"]));
        record.insert("Grown", recorded("1.0", "g", &["Grown"]));
        record.insert("Gone", recorded("1.0", "x", &["Gone"]));

        let state = analyze_install_state(&specs, Some(&record), &MockDirectories::default(), false).unwrap();

        assert_eq!(state.state_of("Same"), Some(PodState::Unchanged));
        assert_eq!(state.state_of("New"), Some(PodState::Added));
        assert_eq!(state.state_of("Bumped"), Some(PodState::Changed));
        assert_eq!(state.state_of("Grown"), Some(PodState::Changed));
        assert_eq!(state.state_of("Gone"), Some(PodState::Deleted));
        // Every name of either side lands in exactly one category.
        assert_eq!(state.len(), 5);
    }

    #[test]
    fn test_missing_directory_wins_over_everything() {
        let specs = vec![spec("Foo", "1.0", "a")];
        let mut record = InstallationRecord::new();
        record.insert("Foo", recorded("1.0", "a", &["Foo"]));
        record.insert("Gone", recorded("1.0", "x", &["Gone"]));

        let dirs = MockDirectories {
            missing: HashSet::from(["Foo".to_string(), "Gone".to_string()]),
            ..Default::default()
        };
        let state = analyze_install_state(&specs, Some(&record), &dirs, false).unwrap();

        assert_eq!(state.state_of("Foo"), Some(PodState::Added));
        assert_eq!(state.state_of("Gone"), Some(PodState::Added));
    }

    #[test]
    fn test_predownloaded_and_empty_directory() {
        let specs = vec![spec("Pre", "1.0", "p"), spec("Hollow", "1.0", "h")];
        let mut record = InstallationRecord::new();
        record.insert(
            "Pre",
            RecordedPod {
                predownloaded: true,
                ..recorded("1.0", "p", &["Pre"])
            },
        );
        record.insert("Hollow", recorded("1.0", "h", &["Hollow"]));

        let dirs = MockDirectories {
            empty: HashSet::from(["Hollow".to_string()]),
            ..Default::default()
        };
        let state = analyze_install_state(&specs, Some(&record), &dirs, false).unwrap();

        assert_eq!(state.state_of("Pre"), Some(PodState::Changed));
        assert_eq!(state.state_of("Hollow"), Some(PodState::Changed));
    }

    #[test]
    fn test_head_versions_only_change_in_update_mode() {
        let specs = vec![spec("Edge", "HEAD based on 1.0", "e")];
        let mut record = InstallationRecord::new();
        record.insert("Edge", recorded("HEAD based on 1.0", "e", &["Edge"]));
        let dirs = MockDirectories::default();

        let state = analyze_install_state(&specs, Some(&record), &dirs, false).unwrap();
        assert_eq!(state.state_of("Edge"), Some(PodState::Unchanged));

        let state = analyze_install_state(&specs, Some(&record), &dirs, true).unwrap();
        assert_eq!(state.state_of("Edge"), Some(PodState::Changed));
    }

    #[test]
    fn test_record_from_specs() {
        let specs = vec![
            spec("Foo/Core", "1.0", "f"),
            spec("Foo", "1.0", "f"),
            spec("Bar", "2.0", "b"),
        ];
        let record = InstallationRecord::from_specs(&specs);

        assert_eq!(record.root_names().collect::<Vec<_>>(), vec!["Bar", "Foo"]);
        assert_eq!(record.get("Foo").unwrap().spec_names, vec!["Foo", "Foo/Core"]);

        // A record of the current resolution reports nothing to do.
        let state = analyze_install_state(&specs, Some(&record), &MockDirectories::default(), false).unwrap();
        assert!(!state.needs_install());
    }

    #[test]
    fn test_sub_unit_only_package_ignores_resolution_order() {
        let specs = vec![spec("Foo/A", "1.0", "aaa"), spec("Foo/B", "1.0", "bbb")];
        let record = InstallationRecord::from_specs(&specs);
        assert_eq!(record.get("Foo").unwrap().checksum.as_deref(), Some("aaa"));

        let reordered = vec![specs[1].clone(), specs[0].clone()];
        assert_eq!(InstallationRecord::from_specs(&reordered), record);

        let state = analyze_install_state(&reordered, Some(&record), &MockDirectories::default(), false).unwrap();
        assert_eq!(state.state_of("Foo"), Some(PodState::Unchanged));
    }

    #[test]
    fn test_sub_unit_keys_merge_into_root() {
        let mut record = InstallationRecord::new();
        record.insert("Foo/Core", recorded("0.9", "old", &["Foo/Core"]));
        record.insert("Foo", recorded("1.0", "a", &["Foo"]));

        assert_eq!(record.root_names().collect::<Vec<_>>(), vec!["Foo"]);
        let foo = record.get("Foo").unwrap();
        assert_eq!(foo.version, PodVersion::parse("1.0").unwrap());
        assert_eq!(foo.checksum.as_deref(), Some("a"));
        assert_eq!(foo.spec_names, vec!["Foo", "Foo/Core"]);

        let specs = vec![spec("Foo", "1.0", "a"), spec("Foo/Core", "1.0", "a")];
        let state = analyze_install_state(&specs, Some(&record), &MockDirectories::default(), false).unwrap();
        assert_eq!(state.state_of("Foo"), Some(PodState::Unchanged));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_sandbox_directories_on_disk() {
        let tmp = TempDir::new().unwrap();
        let dirs = SandboxDirectories::new(tmp.path());
        assert!(!dirs.exists("Foo"));

        std::fs::create_dir_all(dirs.pod_dir("Foo")).unwrap();
        assert!(dirs.exists("Foo"));
        assert!(dirs.is_empty("Foo"));

        std::fs::write(dirs.pod_dir("Foo").join("Foo.h"), "").unwrap();
        assert!(!dirs.is_empty("Foo"));
    }
}
