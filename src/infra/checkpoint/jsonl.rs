//! File-backed checkpoint store.
//!
//! Each unit gets one JSON-lines file under the store directory; a save appends
//! one line. Records are filtered by `unitId` on read, so two ids that sanitize
//! to the same file name never see each other's checkpoints.

use std::fs::{self, create_dir_all, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::core::checkpoint::{ensure_newer, Checkpoint, CheckpointStore};
use crate::core::error::{OrchestratorError, OrchestratorResult};

/// Append-only checkpoint log in JSON lines, one file per unit.
#[derive(Debug, Clone)]
pub struct JsonlCheckpointStore {
    dir: PathBuf,
}

impl JsonlCheckpointStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn new(dir: impl AsRef<Path>) -> OrchestratorResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        create_dir_all(&dir).map_err(OrchestratorError::backend)?;
        Ok(Self { dir })
    }

    /// Directory holding the per-unit files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_path(&self, unit_id: &str) -> PathBuf {
        let name: String = unit_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.jsonl"))
    }

    fn read_log(&self, unit_id: &str) -> OrchestratorResult<Vec<Checkpoint>> {
        let path = self.file_path(unit_id);
        let file = match OpenOptions::new().read(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(OrchestratorError::backend(e)),
        };
        let mut log = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(OrchestratorError::backend)?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Checkpoint>(&line) {
                Ok(checkpoint) if checkpoint.unit_id == unit_id => log.push(checkpoint),
                Ok(_) => {}
                Err(e) => {
                    // A torn trailing write must not hide the records before it.
                    tracing::warn!(
                        "skipping unreadable checkpoint line {} in {}: {}",
                        n + 1,
                        path.display(),
                        e
                    );
                }
            }
        }
        log.sort_by_key(|c| c.iteration);
        Ok(log)
    }

    fn append(&self, checkpoint: &Checkpoint) -> OrchestratorResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_path(&checkpoint.unit_id))
            .map_err(OrchestratorError::backend)?;
        let line = serde_json::to_string(checkpoint).map_err(OrchestratorError::backend)?;
        writeln!(file, "{line}").map_err(OrchestratorError::backend)?;
        file.sync_data().map_err(OrchestratorError::backend)
    }
}

impl CheckpointStore for JsonlCheckpointStore {
    fn save(&mut self, checkpoint: Checkpoint) -> OrchestratorResult<()> {
        let latest = self.latest_iteration(&checkpoint.unit_id)?;
        ensure_newer(&checkpoint.unit_id, checkpoint.iteration, latest)?;
        self.append(&checkpoint)
    }

    fn load_latest(&self, unit_id: &str) -> OrchestratorResult<Option<Checkpoint>> {
        Ok(self.read_log(unit_id)?.pop())
    }

    fn history(&self, unit_id: &str) -> OrchestratorResult<Vec<Checkpoint>> {
        self.read_log(unit_id)
    }

    fn delete_all(&mut self, unit_id: &str) -> OrchestratorResult<()> {
        let path = self.file_path(unit_id);
        let others: Vec<Checkpoint> = match fs::read_to_string(&path) {
            Ok(raw) => raw
                .lines()
                .filter_map(|line| serde_json::from_str::<Checkpoint>(line).ok())
                .filter(|c| c.unit_id != unit_id)
                .collect(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(OrchestratorError::backend(e)),
        };
        if others.is_empty() {
            return fs::remove_file(&path).map_err(OrchestratorError::backend);
        }
        let mut body = String::new();
        for checkpoint in &others {
            body.push_str(&serde_json::to_string(checkpoint).map_err(OrchestratorError::backend)?);
            body.push('\n');
        }
        fs::write(&path, body).map_err(OrchestratorError::backend)
    }
}
