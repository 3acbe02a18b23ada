//! # PMOVault
//!
//! Durable key-value storage for PMOFlix credentials.
//!
//! This crate provides the persistence boundary used by the session layer:
//! a small string-keyed store with `get`/`set`/`delete` semantics. Values are
//! opaque to the vault (the session layer decides the encoding); the vault
//! only guarantees that what was set is what gets read back.
//!
//! Two implementations are provided:
//! - [`FileVault`]: one file per key under a vault directory, written through
//!   to disk on every mutation.
//! - [`MemoryVault`]: a process-local map, mainly for tests.
//!
//! The [`encryption`] module encrypts remembered passwords with a
//! machine-bound key so a copied vault file is useless on another host.
//!
//! ## Usage
//!
//! ```no_run
//! use pmovault::{CredentialStore, FileVault};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let vault = FileVault::open_default()?;
//! vault.set("session", "server: https://demo.example").await?;
//! let record = vault.get("session").await?;
//! assert!(record.is_some());
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

pub mod encryption;
mod file_vault;

pub use file_vault::FileVault;

/// String-keyed durable storage consumed by the session layer.
///
/// Implementations must be `Send + Sync` so a store handle can be shared
/// across async tasks behind an `Arc`.
///
/// # Contract
///
/// - `set` followed by `get` on the same key returns the value that was set
///   (round-trip, byte for byte).
/// - `get` on an absent key returns `Ok(None)`, never an error.
/// - `delete` on an absent key is a no-op.
/// - Mutations are durable before the call returns: a crash immediately
///   after `set` must not lose the value.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Reads the value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes the value stored under `key`, if any.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// In-memory credential store.
///
/// Backs the trait with a plain map. Nothing survives the process; meant for
/// tests and for running against a throwaway session.
#[derive(Debug, Default)]
pub struct MemoryVault {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryVault {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().unwrap().remove(key);
        Ok(())
    }
}
