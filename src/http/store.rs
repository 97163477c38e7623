//! Resource storage behind the server
//!
//! Resource names are request targets (`/index.html`). The store is the only
//! place the server touches persistent state.

use super::{Error, Result};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// How a body is written to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// The resource must not exist yet
    Create,
    /// Replace the current contents (PUT)
    Overwrite,
    /// Append to the current contents (POST)
    Append,
}

/// Resource lookup and write capability
pub trait ResourceStore: Send + Sync {
    /// Whether the resource exists
    fn exists(&self, name: &str) -> bool;

    /// Full contents of the resource
    fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Write `data` to the resource
    fn write(&self, name: &str, data: &[u8], mode: WriteMode) -> Result<()>;
}

/// Files under a document root
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Serve files below `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsStore { root: root.into() }
    }

    /// The document root
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = name.trim_start_matches('/');
        if relative.is_empty() || relative.split('/').any(|s| s == "..") {
            return Err(Error::Store(format!("invalid resource name {}", name)));
        }
        Ok(self.root.join(relative))
    }
}

fn store_error(name: &str, err: std::io::Error) -> Error {
    Error::Store(format!("{}: {}", name, err))
}

impl ResourceStore for FsStore {
    fn exists(&self, name: &str) -> bool {
        self.resolve(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.resolve(name)?;
        fs::read(path).map_err(|e| store_error(name, e))
    }

    fn write(&self, name: &str, data: &[u8], mode: WriteMode) -> Result<()> {
        let path = self.resolve(name)?;
        let mut options = OpenOptions::new();
        match mode {
            WriteMode::Create => options.write(true).create_new(true),
            WriteMode::Overwrite => options.write(true).create(true).truncate(true),
            WriteMode::Append => options.append(true).create(true),
        };

        let mut file = options.open(path).map_err(|e| store_error(name, e))?;
        file.write_all(data).map_err(|e| store_error(name, e))
    }
}

/// Store kept in memory, for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryStore {
    resources: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource
    pub fn with(self, name: &str, data: impl Into<Vec<u8>>) -> Self {
        if let Ok(mut resources) = self.resources.lock() {
            resources.insert(name.to_string(), data.into());
        }
        self
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.resources
            .lock()
            .map_err(|_| Error::Store("store lock poisoned".to_string()))
    }
}

impl ResourceStore for MemoryStore {
    fn exists(&self, name: &str) -> bool {
        self.lock().map(|r| r.contains_key(name)).unwrap_or(false)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.lock()?
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Store(format!("{}: no such resource", name)))
    }

    fn write(&self, name: &str, data: &[u8], mode: WriteMode) -> Result<()> {
        let mut resources = self.lock()?;
        match mode {
            WriteMode::Create if resources.contains_key(name) => {
                Err(Error::Store(format!("{}: already exists", name)))
            }
            WriteMode::Create | WriteMode::Overwrite => {
                resources.insert(name.to_string(), data.to_vec());
                Ok(())
            }
            WriteMode::Append => {
                resources
                    .entry(name.to_string())
                    .or_default()
                    .extend_from_slice(data);
                Ok(())
            }
        }
    }
}
