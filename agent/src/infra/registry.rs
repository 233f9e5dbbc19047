//! Infrastructure implementation of the `RegistryStore` port.
//!
//! `JsonRegistryStore` keeps the registry in one JSON file. Every mutation is
//! a full read-modify-write on a blocking thread, finished by an atomic
//! write (temp file + rename) so readers never see a partial list.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::sync::Mutex;

use crate::application::ports::RegistryStore;
use crate::domain::{AppRecord, RegistryDocument};
use crate::infra::fs::write_atomic;

/// File-backed application registry.
pub struct JsonRegistryStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonRegistryStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty registry.
    fn load_sync(path: &Path) -> Result<RegistryDocument> {
        if !path.exists() {
            return Ok(RegistryDocument::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading registry {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(RegistryDocument::default());
        }
        serde_json::from_str(&content).with_context(|| format!("parsing registry {}", path.display()))
    }

    fn save_sync(path: &Path, doc: &RegistryDocument) -> Result<()> {
        let content = serde_json::to_string_pretty(doc).context("serializing registry")?;
        write_atomic(path, &content)
    }

    async fn read(&self) -> Result<RegistryDocument> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::load_sync(&path))
            .await
            .context("registry load task panicked")?
    }

    /// Apply `change` to the stored document and write it back.
    async fn modify<T, F>(&self, change: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut RegistryDocument) -> Result<T> + Send + 'static,
    {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let mut doc = Self::load_sync(&path)?;
            let out = change(&mut doc)?;
            Self::save_sync(&path, &doc)?;
            Ok(out)
        })
        .await
        .context("registry update task panicked")?
    }
}

impl RegistryStore for JsonRegistryStore {
    async fn load(&self) -> Result<Vec<AppRecord>> {
        Ok(self.read().await?.apps)
    }

    async fn add(&self, record: AppRecord) -> Result<()> {
        let name = record.app_name.clone();
        self.modify(move |doc| doc.add(record).map_err(anyhow::Error::from))
            .await?;
        tracing::debug!(app = %name, "registry record added");
        Ok(())
    }

    async fn remove_by_name(&self, name: &str) -> Result<Option<String>> {
        let owned = name.to_string();
        let removed = self.modify(move |doc| Ok(doc.remove_by_name(&owned))).await?;
        if removed.is_some() {
            tracing::debug!(app = %name, "registry record removed");
        }
        Ok(removed)
    }

    async fn find_by_group(&self, group_id: &str) -> Result<Vec<AppRecord>> {
        Ok(self.read().await?.find_by_group(group_id))
    }
}
