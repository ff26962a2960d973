//! Implementation of `berth diff`.

use std::path::PathBuf;

use anyhow::Result;

use crate::analyzer::{analyze_install_state, InstallationRecord, SandboxDirectories, StateSet};
use crate::ops::graph_file::load_input;
use crate::ops::sandbox_manifest::{load_record, save_record};

/// Options for the install state diff.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Analysis input file
    pub input: PathBuf,

    /// Installation record of the previous run
    pub manifest: PathBuf,

    /// Directory holding one sub-directory per installed root package
    pub pods_dir: PathBuf,

    /// Reinstall head versions
    pub update: bool,

    /// Write the record of this resolution back to `manifest`
    pub save: bool,
}

/// Compare the resolved packages with the previous installation.
pub fn diff_install_state(opts: &DiffOptions) -> Result<StateSet> {
    let input = load_input(&opts.input)?;
    let specs = input.resolved_specs();
    let record = load_record(&opts.manifest)?;
    let directories = SandboxDirectories::new(opts.pods_dir.clone());

    let state = analyze_install_state(&specs, record.as_ref(), &directories, opts.update)?;
    tracing::info!(
        "{} added, {} changed, {} deleted, {} unchanged",
        state.added().len(),
        state.changed().len(),
        state.deleted().len(),
        state.unchanged().len()
    );

    if opts.save {
        save_record(&opts.manifest, &InstallationRecord::from_specs(&specs))?;
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::PodState;
    use std::path::Path;
    use tempfile::TempDir;

    const INPUT: &str = r#"
[[spec]]
name = "Foo"
version = "1.0"
checksum = "aaa"

[[spec]]
name = "Bar"
version = "1.0"
checksum = "xyz"

[[target]]
name = "App"
platform = "ios 9.0"
dependencies = ["Foo", "Bar"]

[[resolved]]
target = "App"
specs = ["Foo", "Bar"]
"#;

    fn setup(tmp: &Path) -> DiffOptions {
        let input = tmp.join("graph.toml");
        std::fs::write(&input, INPUT).unwrap();

        let pods_dir = tmp.join("Pods");
        for pod in ["Foo", "Bar", "Old"] {
            std::fs::create_dir_all(pods_dir.join(pod)).unwrap();
            std::fs::write(pods_dir.join(pod).join("README"), "x").unwrap();
        }

        DiffOptions {
            input,
            manifest: pods_dir.join("Manifest.toml"),
            pods_dir,
            update: false,
            save: false,
        }
    }

    #[test]
    fn test_first_install_adds_everything() {
        let tmp = TempDir::new().unwrap();
        let opts = setup(tmp.path());

        let state = diff_install_state(&opts).unwrap();
        assert_eq!(state.added().len(), 2);
        assert!(state.needs_install());
        assert!(!opts.manifest.exists());
    }

    #[test]
    fn test_changed_checksum_and_deleted_pod() {
        let tmp = TempDir::new().unwrap();
        let opts = setup(tmp.path());
        std::fs::write(
            &opts.manifest,
            r#"
version = 1

[[pod]]
name = "Foo"
version = "1.0"
checksum = "aaa"

[[pod]]
name = "Bar"
version = "1.0"
checksum = "abc"

[[pod]]
name = "Old"
version = "0.1"
"#,
        )
        .unwrap();

        let state = diff_install_state(&opts).unwrap();
        assert_eq!(state.state_of("Foo"), Some(PodState::Unchanged));
        assert_eq!(state.state_of("Bar"), Some(PodState::Changed));
        assert_eq!(state.state_of("Old"), Some(PodState::Deleted));
    }

    #[test]
    fn test_save_then_diff_is_unchanged() {
        let tmp = TempDir::new().unwrap();
        let mut opts = setup(tmp.path());
        opts.save = true;

        diff_install_state(&opts).unwrap();
        assert!(opts.manifest.exists());

        opts.save = false;
        let state = diff_install_state(&opts).unwrap();
        assert!(!state.needs_install());
        assert_eq!(state.unchanged().len(), 2);
    }
}
