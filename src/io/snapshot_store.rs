use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;

use crate::io::lock::FileLock;
use crate::io::store::{ChangeQueue, StoreError, TaskStore, apply_change};
use crate::model::task::{Label, Snapshot};

/// Task store backed by a JSON snapshot file on disk.
///
/// `commit` re-reads the file under an advisory lock, applies the staged
/// changes and replaces the file atomically.
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    labels: Vec<Label>,
    queue: ChangeQueue,
}

impl SnapshotStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        SnapshotStore {
            path: path.into(),
            labels: Vec::new(),
            queue: ChangeQueue::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskStore for SnapshotStore {
    fn fetch_all(&mut self) -> Result<Snapshot, StoreError> {
        let _lock = FileLock::acquire_default(&self.path)?;
        let snapshot = read_snapshot(&self.path)?;
        self.labels = snapshot.labels.clone();
        Ok(snapshot)
    }

    fn list_labels(&self, predicate: &dyn Fn(&Label) -> bool) -> Vec<Label> {
        self.labels
            .iter()
            .filter(|l| predicate(l))
            .cloned()
            .collect()
    }

    fn queue(&self) -> &ChangeQueue {
        &self.queue
    }

    fn queue_mut(&mut self) -> &mut ChangeQueue {
        &mut self.queue
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        let _lock = FileLock::acquire_default(&self.path)?;
        let mut snapshot = read_snapshot(&self.path)?;
        let now = Utc::now().naive_utc();
        for change in self.queue.changes() {
            apply_change(&mut snapshot, change, now);
        }
        write_snapshot(&self.path, &snapshot)?;
        self.queue.clear();
        Ok(())
    }
}

/// Read and parse a snapshot file
pub fn read_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Serialize a snapshot and replace `path` atomically
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    let mut content = serde_json::to_string_pretty(snapshot)?;
    content.push('\n');
    atomic_write(path, content.as_bytes())?;
    Ok(())
}

/// Write `content` to `path` atomically using a temp file + rename.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{Task, TaskId};
    use tempfile::TempDir;

    fn seed(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("tasks.json");
        let snapshot = Snapshot {
            timezone: Some("UTC".into()),
            tasks: vec![Task::new("1", "p", "Write report")],
            ..Default::default()
        };
        write_snapshot(&path, &snapshot).unwrap();
        path
    }

    #[test]
    fn fetch_reads_the_file() {
        let tmp = TempDir::new().unwrap();
        let path = seed(&tmp);
        let mut store = SnapshotStore::open(&path);
        let snapshot = store.fetch_all().unwrap();
        assert_eq!(snapshot.tasks.len(), 1);
        assert_eq!(snapshot.timezone.as_deref(), Some("UTC"));
    }

    #[test]
    fn commit_persists_changes() {
        let tmp = TempDir::new().unwrap();
        let path = seed(&tmp);
        let mut store = SnapshotStore::open(&path);
        store.fetch_all().unwrap();
        store.stage_complete(&TaskId::from("1"));
        store.commit().unwrap();

        assert_eq!(store.pending_count(), 0);
        let on_disk = read_snapshot(&path).unwrap();
        assert!(on_disk.tasks[0].completed);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let tmp = TempDir::new().unwrap();
        let mut store = SnapshotStore::open(tmp.path().join("absent.json"));
        assert!(matches!(store.fetch_all(), Err(StoreError::Io(_))));
    }
}
