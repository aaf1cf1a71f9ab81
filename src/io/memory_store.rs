use chrono::{NaiveDateTime, Utc};

use crate::io::store::{ChangeQueue, StoreError, TaskStore, apply_change};
use crate::model::task::{Label, Snapshot};

/// Task store held entirely in memory. Commit applies staged changes to the
/// held snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Snapshot,
    queue: ChangeQueue,
    commits: usize,
    /// Commit time for advancing recurring tasks; wall clock when unset
    clock: Option<NaiveDateTime>,
}

impl MemoryStore {
    pub fn new(snapshot: Snapshot) -> Self {
        MemoryStore {
            snapshot,
            ..Default::default()
        }
    }

    /// Pin the time commits are applied at (UTC)
    pub fn at(mut self, now: NaiveDateTime) -> Self {
        self.clock = Some(now);
        self
    }

    /// Current committed state
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> Snapshot {
        self.snapshot
    }

    /// Number of successful commits so far
    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl TaskStore for MemoryStore {
    fn fetch_all(&mut self) -> Result<Snapshot, StoreError> {
        Ok(self.snapshot.clone())
    }

    fn list_labels(&self, predicate: &dyn Fn(&Label) -> bool) -> Vec<Label> {
        self.snapshot
            .labels
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
        let now = self.clock.unwrap_or_else(|| Utc::now().naive_utc());
        for change in self.queue.take() {
            apply_change(&mut self.snapshot, &change, now);
        }
        self.commits += 1;
        Ok(())
    }
}
