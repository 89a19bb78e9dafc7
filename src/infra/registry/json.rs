//! JSON file unit registry.
//!
//! The whole registry is one JSON array. Flushes write a sibling temp file and
//! rename it over the target, so a crash leaves either the old or the new
//! registry on disk, never a partial one.

use std::fs::{self, create_dir_all};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::core::error::{OrchestratorError, OrchestratorResult};
use crate::core::registry::RegistryStore;
use crate::core::unit::WorkUnit;

/// Registry persisted as a single JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileRegistry {
    path: PathBuf,
}

impl JsonFileRegistry {
    /// Use `path` as the registry file, creating its parent directory.
    pub fn new(path: impl AsRef<Path>) -> OrchestratorResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent).map_err(OrchestratorError::backend)?;
        }
        Ok(Self { path })
    }

    /// Registry file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl RegistryStore for JsonFileRegistry {
    fn load(&self) -> OrchestratorResult<Vec<WorkUnit>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(OrchestratorError::backend(e)),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            OrchestratorError::Backend(format!(
                "failed to parse registry {}: {e}",
                self.path.display()
            ))
        })
    }

    fn flush(&mut self, units: &[WorkUnit]) -> OrchestratorResult<()> {
        let body = serde_json::to_vec_pretty(units).map_err(OrchestratorError::backend)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, body).map_err(OrchestratorError::backend)?;
        fs::rename(&tmp, &self.path).map_err(OrchestratorError::backend)
    }
}
