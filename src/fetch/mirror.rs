//! Local copies of fetched documents
//!
//! Layout under the output directory:
//!
//! ```text
//! <out>/<host><document path>      primary document
//! <out>/<host>/<local name>        embedded resources, flattened
//! ```

use super::orchestrator::FetchedResource;
use crate::http::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes one origin's documents below `<out>/<host>`
#[derive(Debug, Clone)]
pub struct Mirror {
    host_dir: PathBuf,
}

impl Mirror {
    pub fn new(output_dir: impl AsRef<Path>, host: &str) -> Self {
        Mirror {
            host_dir: output_dir.as_ref().join(host),
        }
    }

    /// `<out>/<host>`
    pub fn host_dir(&self) -> &Path {
        &self.host_dir
    }

    /// Write the primary document at its path below the host directory
    pub fn write_document(&self, path: &str, data: &[u8]) -> Result<PathBuf> {
        let file = self.host_dir.join(checked_relative(path)?);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file, data)?;
        debug!(file = %file.display(), length = data.len(), "document written");
        Ok(file)
    }

    /// Write an embedded resource directly in the host directory
    pub fn write_resource(&self, resource: &FetchedResource) -> Result<PathBuf> {
        let name = checked_relative(&resource.local_name)?;
        if name.contains('/') {
            return Err(Error::InvalidTarget(format!(
                "resource name {} is not flat",
                resource.local_name
            )));
        }

        fs::create_dir_all(&self.host_dir)?;
        let file = self.host_dir.join(name);
        fs::write(&file, &resource.bytes)?;
        debug!(file = %file.display(), length = resource.bytes.len(), "resource written");
        Ok(file)
    }
}

/// Point every fetched reference in `document` at its local copy
pub fn rewrite(document: &str, fetched: &[FetchedResource]) -> String {
    fetched
        .iter()
        .fold(document.to_string(), |text, resource| {
            text.replace(&resource.reference, &resource.local_name)
        })
}

fn checked_relative(path: &str) -> Result<&str> {
    let relative = path.trim_start_matches('/');
    if relative.is_empty() || relative.split('/').any(|s| s == "..") {
        return Err(Error::InvalidTarget(format!("cannot mirror {}", path)));
    }
    Ok(relative)
}
