//! Installation record encoding and decoding.
//!
//! `Manifest.toml` in the sandbox records what the previous installation
//! left on disk. It is rewritten after every successful installation.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analyzer::{InstallationRecord, RecordedPod};
use crate::core::PodVersion;
use crate::util::fs::{read_to_string, write_string};

/// Current on-disk format version.
pub const MANIFEST_VERSION: u32 = 1;

/// Installation record representation for serialization.
#[derive(Debug, Serialize, Deserialize)]
pub struct SandboxManifest {
    /// Record format version
    pub version: u32,

    /// Installed root packages
    #[serde(rename = "pod", default)]
    pub pods: Vec<ManifestPod>,
}

/// An installed root package.
#[derive(Debug, Serialize, Deserialize)]
pub struct ManifestPod {
    pub name: String,

    /// Installed version, possibly `HEAD based on X`
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    /// Installed sub-unit names, the root included
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specs: Vec<String>,

    /// Fetched ahead of resolution from an external source
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub predownloaded: bool,
}

impl SandboxManifest {
    pub fn from_record(record: &InstallationRecord) -> Self {
        let pods = record
            .iter()
            .map(|(name, pod)| ManifestPod {
                name: name.to_string(),
                version: pod.version.to_string(),
                checksum: pod.checksum.clone(),
                specs: pod.spec_names.clone(),
                predownloaded: pod.predownloaded,
            })
            .collect();

        SandboxManifest {
            version: MANIFEST_VERSION,
            pods,
        }
    }

    pub fn to_record(&self) -> Result<InstallationRecord> {
        let mut record = InstallationRecord::new();
        for pod in &self.pods {
            let version = PodVersion::parse(&pod.version)
                .with_context(|| format!("invalid version for `{}`", pod.name))?;

            let mut spec_names = pod.specs.clone();
            if spec_names.is_empty() {
                spec_names.push(pod.name.clone());
            }
            spec_names.sort();
            spec_names.dedup();

            record.insert(
                &pod.name,
                RecordedPod {
                    version,
                    checksum: pod.checksum.clone(),
                    spec_names,
                    predownloaded: pod.predownloaded,
                },
            );
        }
        Ok(record)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = read_to_string(path)?;
        let manifest: SandboxManifest = toml::from_str(&content)
            .with_context(|| format!("failed to parse installation record: {}", path.display()))?;

        if manifest.version > MANIFEST_VERSION {
            anyhow::bail!(
                "installation record {} has format version {}, newest supported is {}",
                path.display(),
                manifest.version,
                MANIFEST_VERSION
            );
        }
        Ok(manifest)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        let with_header = format!(
            "# This file is automatically generated by Berth.\n\
             # It is not intended for manual editing.\n\n\
             {content}"
        );

        write_string(path, &with_header)
    }
}

/// Load the installation record at `path`, if one exists.
pub fn load_record(path: &Path) -> Result<Option<InstallationRecord>> {
    if !path.exists() {
        tracing::debug!("no installation record at {}", path.display());
        return Ok(None);
    }
    SandboxManifest::load(path)?.to_record().map(Some)
}

/// Write `record` to `path`, creating parent directories.
pub fn save_record(path: &Path, record: &InstallationRecord) -> Result<()> {
    SandboxManifest::from_record(record).save(path)?;
    tracing::info!("wrote installation record to {}", path.display());
    Ok(())
}
