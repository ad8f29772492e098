//! Deployment state persistence.
//!
//! `save` is a full overwrite. [`FileCacheStore`] writes to a temporary
//! file in the cache directory and renames it over the target, so a crash
//! mid-save leaves the previous file intact.

use dashmap::DashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::cache::state::DeploymentState;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache file {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load/save interface for deployment state.
pub trait CacheStore: Send + Sync {
    /// Load the state for `(env, cache_name)`, `None` when nothing is stored.
    fn load(&self, env: &str, cache_name: &str) -> Result<Option<DeploymentState>, CacheError>;

    /// Overwrite the stored state. `env` and `cache_name` are stamped into it.
    fn save(&self, env: &str, cache_name: &str, state: &DeploymentState) -> Result<(), CacheError>;
}

/// One JSON file per `(env, cache_name)` under a directory.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the cache file; legacy files lack the `.json` extension.
    pub fn cache_path(&self, env: &str, cache_name: &str, legacy: bool) -> PathBuf {
        let filename = format!("{}-{}", env, cache_name);
        if legacy {
            self.dir.join(filename)
        } else {
            self.dir.join(format!("{}.json", filename))
        }
    }

    fn read(path: &Path) -> Result<DeploymentState, CacheError> {
        let file = File::open(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| CacheError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl CacheStore for FileCacheStore {
    fn load(&self, env: &str, cache_name: &str) -> Result<Option<DeploymentState>, CacheError> {
        for legacy in [false, true] {
            let path = self.cache_path(env, cache_name, legacy);
            if path.is_file() {
                let state = Self::read(&path)?;
                tracing::info!(
                    path = %path.display(),
                    items = state.items.len(),
                    legacy,
                    "Loaded deployment cache"
                );
                return Ok(Some(state));
            }
        }
        Ok(None)
    }

    fn save(&self, env: &str, cache_name: &str, state: &DeploymentState) -> Result<(), CacheError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| CacheError::Io { path, source }
        };

        fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))?;
        let path = self.cache_path(env, cache_name, false);

        let mut stamped = state.clone();
        stamped.env = env.to_string();
        stamped.cache_name = cache_name.to_string();

        let tmp = NamedTempFile::new_in(&self.dir).map_err(io_err(&self.dir))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, &stamped).map_err(|source| CacheError::Corrupt {
                path: path.clone(),
                source,
            })?;
            writer.flush().map_err(io_err(tmp.path()))?;
        }
        tmp.as_file().sync_all().map_err(io_err(tmp.path()))?;
        tmp.persist(&path).map_err(|e| CacheError::Io {
            path: path.clone(),
            source: e.error,
        })?;

        tracing::debug!(
            path = %path.display(),
            on_chain = stamped.on_chain_count(),
            items = stamped.items.len(),
            "Saved deployment cache"
        );
        Ok(())
    }
}

/// In-process store, keyed like the file store.
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStore {
    inner: Arc<DashMap<(String, String), DeploymentState>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self, env: &str, cache_name: &str) -> Result<Option<DeploymentState>, CacheError> {
        Ok(self
            .inner
            .get(&(env.to_string(), cache_name.to_string()))
            .map(|entry| entry.value().clone()))
    }

    fn save(&self, env: &str, cache_name: &str, state: &DeploymentState) -> Result<(), CacheError> {
        let mut stamped = state.clone();
        stamped.env = env.to_string();
        stamped.cache_name = cache_name.to_string();
        self.inner.insert((env.to_string(), cache_name.to_string()), stamped);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
