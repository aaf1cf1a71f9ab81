use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::warn;

use crate::io::lock::LockError;
use crate::model::task::{Due, Label, LabelId, Snapshot, Task, TaskId};
use crate::parse::next_occurrence;

/// Error type for task store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store rejected the request ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// New value for a task's due date
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "op", content = "string")]
pub enum DueUpdate {
    Clear,
    /// Free-text expression interpreted by the store (`today`, `in 3 days`)
    Set(String),
}

/// Field mutations for one task. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<DueUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<LabelId>>,
}

impl TaskUpdate {
    pub fn content(content: String) -> Self {
        TaskUpdate {
            content: Some(content),
            ..Default::default()
        }
    }

    pub fn due(due: DueUpdate) -> Self {
        TaskUpdate {
            due: Some(due),
            ..Default::default()
        }
    }

    pub fn labels(labels: Vec<LabelId>) -> Self {
        TaskUpdate {
            labels: Some(labels),
            ..Default::default()
        }
    }
}

/// A staged mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Change {
    Update { id: TaskId, update: TaskUpdate },
    Complete { id: TaskId },
    Uncomplete { id: TaskId },
}

impl Change {
    pub fn task_id(&self) -> &TaskId {
        match self {
            Change::Update { id, .. } | Change::Complete { id } | Change::Uncomplete { id } => id,
        }
    }
}

/// Pending-change queue local to one run
#[derive(Debug, Clone, Default)]
pub struct ChangeQueue {
    changes: Vec<Change>,
}

impl ChangeQueue {
    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn take(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.changes)
    }

    pub fn clear(&mut self) {
        self.changes.clear();
    }
}

/// Boundary to the external task store.
///
/// Mutations are staged into a local queue and only become visible to the
/// store on `commit`.
pub trait TaskStore {
    /// Full snapshot pull
    fn fetch_all(&mut self) -> Result<Snapshot, StoreError>;

    /// Labels known from the last fetch that satisfy `predicate`
    fn list_labels(&self, predicate: &dyn Fn(&Label) -> bool) -> Vec<Label>;

    fn queue(&self) -> &ChangeQueue;

    fn queue_mut(&mut self) -> &mut ChangeQueue;

    /// Flush the staged queue to the store
    fn commit(&mut self) -> Result<(), StoreError>;

    fn stage_update(&mut self, id: &TaskId, update: TaskUpdate) {
        self.queue_mut().push(Change::Update {
            id: id.clone(),
            update,
        });
    }

    fn stage_complete(&mut self, id: &TaskId) {
        self.queue_mut().push(Change::Complete { id: id.clone() });
    }

    fn stage_uncomplete(&mut self, id: &TaskId) {
        self.queue_mut().push(Change::Uncomplete { id: id.clone() });
    }

    fn pending(&self) -> &[Change] {
        self.queue().changes()
    }

    fn pending_count(&self) -> usize {
        self.queue().len()
    }

    /// Drop staged changes without sending them
    fn discard(&mut self) {
        self.queue_mut().clear();
    }
}

impl<T: TaskStore + ?Sized> TaskStore for Box<T> {
    fn fetch_all(&mut self) -> Result<Snapshot, StoreError> {
        (**self).fetch_all()
    }

    fn list_labels(&self, predicate: &dyn Fn(&Label) -> bool) -> Vec<Label> {
        (**self).list_labels(predicate)
    }

    fn queue(&self) -> &ChangeQueue {
        (**self).queue()
    }

    fn queue_mut(&mut self) -> &mut ChangeQueue {
        (**self).queue_mut()
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        (**self).commit()
    }
}

/// Apply a staged change to a local snapshot, the way the store would.
/// Closing a recurring task moves it to its next occurrence after `now`
/// instead of completing it. Changes for unknown tasks are ignored.
pub fn apply_change(snapshot: &mut Snapshot, change: &Change, now: NaiveDateTime) {
    let Some(task) = snapshot.task_mut(change.task_id()) else {
        return;
    };
    match change {
        Change::Update { update, .. } => {
            if let Some(content) = &update.content {
                task.content = content.clone();
            }
            match &update.due {
                Some(DueUpdate::Clear) => task.due = None,
                Some(DueUpdate::Set(expr)) => task.due = Some(Due::from_string(expr)),
                None => {}
            }
            if let Some(labels) = &update.labels {
                task.labels = labels.clone();
            }
        }
        Change::Complete { .. } if task.is_recurring() => advance_recurring(task, now),
        Change::Complete { .. } => task.completed = true,
        Change::Uncomplete { .. } => task.completed = false,
    }
}

fn advance_recurring(task: &mut Task, now: NaiveDateTime) {
    let Some(due) = &task.due else {
        return;
    };
    match next_occurrence(due, now) {
        Ok(Some(next)) => {
            task.due = Some(next);
            task.completed = false;
        }
        Ok(None) => task.completed = false,
        Err(e) => {
            warn!(task = %task.content, error = %e, "cannot advance recurring task, completing it");
            task.completed = true;
        }
    }
}
