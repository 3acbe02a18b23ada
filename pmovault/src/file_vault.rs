//! File-backed credential store
//!
//! One file per key under a vault directory. Every `set` writes the file
//! before returning, so the durability contract of [`CredentialStore`] holds
//! even if the process dies right after the call.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dirs::home_dir;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::CredentialStore;

/// Environment variable overriding the vault location.
const ENV_VAULT_DIR: &str = "PMOFLIX_VAULT_DIR";

/// Default dot-directory name, in the current or home directory.
const VAULT_DIR_NAME: &str = ".pmoflix";

/// Credential store persisted as one file per key.
///
/// Keys are restricted to simple names (no path separators, no dots) so a
/// key can never escape the vault directory.
///
/// # Example
///
/// ```rust,no_run
/// use pmovault::FileVault;
///
/// let vault = FileVault::new(".pmoflix")?;
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug)]
pub struct FileVault {
    vault_dir: PathBuf,
}

impl FileVault {
    /// Opens (creating if needed) a vault at the given directory.
    pub fn new<P: AsRef<Path>>(vault_dir: P) -> Result<Self> {
        let vault_dir = vault_dir.as_ref().to_path_buf();
        Self::validate_vault_dir(&vault_dir)?;
        Ok(Self { vault_dir })
    }

    /// Opens the default vault, resolved in order:
    ///
    /// 1. The `PMOFLIX_VAULT_DIR` environment variable
    /// 2. `.pmoflix` in the current directory, if it already exists
    /// 3. `.pmoflix` in the user's home directory (created if needed)
    pub fn open_default() -> Result<Self> {
        Self::new(Self::find_vault_dir())
    }

    /// Directory this vault reads and writes.
    pub fn vault_dir(&self) -> &Path {
        &self.vault_dir
    }

    fn find_vault_dir() -> PathBuf {
        if let Ok(env_path) = env::var(ENV_VAULT_DIR) {
            info!(env_var = ENV_VAULT_DIR, path = %env_path, "Using vault directory from env");
            return PathBuf::from(env_path);
        }

        let local = PathBuf::from(VAULT_DIR_NAME);
        if local.exists() {
            return local;
        }

        if let Some(home) = home_dir() {
            return home.join(VAULT_DIR_NAME);
        }

        local
    }

    fn validate_vault_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
            info!("Created vault directory: {}", path.display());
        }

        if !path.is_dir() {
            return Err(anyhow!(
                "vault path is not a directory: {}",
                path.display()
            ));
        }

        // Check write permission up front rather than on first login
        let marker = path.join(".write_test");
        fs::write(&marker, b"test")?;
        fs::remove_file(&marker)?;

        Ok(())
    }

    /// Builds the file path for a key, rejecting names that could leave the
    /// vault directory.
    fn entry_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(anyhow!("invalid vault key: {:?}", key));
        }
        Ok(self.vault_dir.join(format!("{}.yaml", key)))
    }
}

#[async_trait]
impl CredentialStore for FileVault {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.entry_path(key)?;

        if !path.exists() {
            debug!("Vault entry does not exist: {}", path.display());
            return Ok(None);
        }

        let value = fs::read_to_string(&path)?;
        debug!("Read vault entry from {}", path.display());
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.entry_path(key)?;
        fs::write(&path, value)?;
        debug!("Wrote vault entry to {}", path.display());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.entry_path(key)?;

        if path.exists() {
            fs::remove_file(&path)?;
            debug!("Deleted vault entry: {}", path.display());
        }

        Ok(())
    }
}
