//! Service-account manifest loading.
//!
//! The manifest lives at `~/.fbauth/config.json` and names one credential file
//! per project:
//!
//! ```json
//! { "serviceAccounts": [ { "projectId": "acme-prod", "filepath": "~/keys/prod.json" } ] }
//! ```
//!
//! Every referenced file is read eagerly so that a broken entry aborts startup
//! before any command runs. The first entry is the default credential.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::paths::Paths;

/// On-disk manifest document
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Manifest {
    pub service_accounts: Vec<ServiceAccountRef>,
}

/// One `{projectId, filepath}` entry of the manifest
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ServiceAccountRef {
    pub project_id: String,
    pub filepath: String,
}

impl Manifest {
    /// Read and strictly parse the manifest file
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

/// A loaded service-account credential. The payload is opaque here.
#[derive(Clone)]
pub struct Credential {
    pub project_id: String,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("project_id", &self.project_id)
            .field("path", &self.path)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// All configured credentials, in manifest order. Never empty.
#[derive(Debug, Clone)]
pub struct CredentialSet {
    entries: Vec<Credential>,
}

impl CredentialSet {
    /// Load the manifest at `paths.config_file` and every credential it names
    pub fn load(paths: &Paths) -> Result<Self> {
        let manifest = Manifest::read(&paths.config_file)?;
        Self::from_manifest(&manifest, paths)
    }

    /// Read the credential files referenced by an already parsed manifest
    pub fn from_manifest(manifest: &Manifest, paths: &Paths) -> Result<Self> {
        if manifest.service_accounts.is_empty() {
            bail!(
                "No service accounts configured in {:?}\nHint: Add at least one {{\"projectId\", \"filepath\"}} entry to \"serviceAccounts\".",
                paths.config_file
            );
        }

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(manifest.service_accounts.len());

        for entry in &manifest.service_accounts {
            if !seen.insert(entry.project_id.as_str()) {
                bail!(
                    "Project '{}' is configured more than once in {:?}",
                    entry.project_id,
                    paths.config_file
                );
            }

            let path = paths.resolve_credential_path(&entry.filepath);
            let bytes = fs::read(&path).with_context(|| {
                format!(
                    "Failed to read service account file for project '{}': {:?}",
                    entry.project_id, path
                )
            })?;

            debug!(project = %entry.project_id, path = %path.display(), "loaded credential");

            entries.push(Credential {
                project_id: entry.project_id.clone(),
                path,
                bytes,
            });
        }

        Ok(Self { entries })
    }

    /// The default credential (first manifest entry)
    pub fn current(&self) -> &Credential {
        &self.entries[0]
    }

    /// Look up a credential by project id
    pub fn get(&self, project_id: &str) -> Option<&Credential> {
        self.entries.iter().find(|c| c.project_id == project_id)
    }

    /// Pick the credential for `--project`, or the default when none was given
    pub fn select(&self, project_id: Option<&str>) -> Result<&Credential> {
        match project_id {
            None => Ok(self.current()),
            Some(id) => self.get(id).with_context(|| {
                format!(
                    "Project '{}' is not configured.\nHint: Configured projects are: {}",
                    id,
                    self.project_ids().join(", ")
                )
            }),
        }
    }

    pub fn project_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|c| c.project_id.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.entries.iter()
    }
}
