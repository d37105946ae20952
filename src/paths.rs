use anyhow::{Context, Result};
use directories::BaseDirs;
use std::path::{Path, PathBuf};

/// All computed paths used by fbauth
#[derive(Debug, Clone)]
pub struct Paths {
    /// The user's home directory
    pub home_dir: PathBuf,
    /// ~/.fbauth
    pub base_dir: PathBuf,
    /// ~/.fbauth/config.json
    pub config_file: PathBuf,
}

impl Paths {
    pub fn new() -> Result<Self> {
        let base_dirs = BaseDirs::new().context("Failed to determine home directory")?;
        Ok(Self::from_home(base_dirs.home_dir()))
    }

    /// Compute the layout relative to an explicit home directory
    pub fn from_home(home: &Path) -> Self {
        let base_dir = home.join(".fbauth");
        let config_file = base_dir.join("config.json");

        Self {
            home_dir: home.to_path_buf(),
            base_dir,
            config_file,
        }
    }

    /// Resolve a credential `filepath` from the manifest.
    ///
    /// `~/` expands to the home directory and relative paths are taken
    /// relative to the manifest's directory.
    pub fn resolve_credential_path(&self, raw: &str) -> PathBuf {
        if let Some(rest) = raw.strip_prefix("~/") {
            return self.home_dir.join(rest);
        }

        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}
