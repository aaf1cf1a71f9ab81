//! Todoist Sync API backend.
//!
//! Reads projects, items, labels and the user's zone with one full sync and
//! sends the staged queue as a single batch of commands. Todoist items carry
//! label names, so label names double as label identifiers here.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::io::store::{Change, ChangeQueue, DueUpdate, StoreError, TaskStore};
use crate::model::task::{Due, Label, LabelId, Project, ProjectId, Snapshot, Task, TaskId};

const RESOURCE_TYPES: &str = r#"["projects","items","labels","user"]"#;

/// Task store talking to the Todoist Sync API
pub struct TodoistStore {
    client: reqwest::blocking::Client,
    url: String,
    token: String,
    labels: Vec<Label>,
    queue: ChangeQueue,
}

impl TodoistStore {
    pub fn new(url: &str, token: &str) -> Result<Self, StoreError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("cascade/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(TodoistStore {
            client,
            url: url.to_string(),
            token: token.to_string(),
            labels: Vec::new(),
            queue: ChangeQueue::default(),
        })
    }

    fn post(&self, form: &[(&str, &str)]) -> Result<reqwest::blocking::Response, StoreError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .form(form)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

impl TaskStore for TodoistStore {
    fn fetch_all(&mut self) -> Result<Snapshot, StoreError> {
        debug!(url = %self.url, "full sync");
        let response: SyncResponse = self
            .post(&[("sync_token", "*"), ("resource_types", RESOURCE_TYPES)])?
            .json()?;
        let snapshot = response.into_snapshot();
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
        let commands: Vec<Value> = self
            .queue
            .changes()
            .iter()
            .map(|c| sync_command(c, &uuid::Uuid::new_v4().to_string()))
            .collect();
        let payload = serde_json::to_string(&commands)?;
        let response: CommitResponse = self.post(&[("commands", payload.as_str())])?.json()?;

        let failed: Vec<String> = response
            .sync_status
            .iter()
            .filter(|(_, status)| status.as_str() != Some("ok"))
            .map(|(uuid, status)| format!("{uuid}: {status}"))
            .collect();
        if !failed.is_empty() {
            return Err(StoreError::Api {
                status: 200,
                body: failed.join("; "),
            });
        }
        self.queue.clear();
        Ok(())
    }
}

/// Build one Sync API command for a staged change
fn sync_command(change: &Change, uuid: &str) -> Value {
    match change {
        Change::Update { id, update } => {
            let mut args = json!({ "id": id });
            if let Some(content) = &update.content {
                args["content"] = json!(content);
            }
            match &update.due {
                Some(DueUpdate::Clear) => args["due"] = Value::Null,
                Some(DueUpdate::Set(expr)) => args["due"] = json!({ "string": expr }),
                None => {}
            }
            if let Some(labels) = &update.labels {
                args["labels"] = json!(labels);
            }
            json!({ "type": "item_update", "uuid": uuid, "args": args })
        }
        Change::Complete { id } => {
            json!({ "type": "item_close", "uuid": uuid, "args": { "id": id } })
        }
        Change::Uncomplete { id } => {
            json!({ "type": "item_uncomplete", "uuid": uuid, "args": { "id": id } })
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SyncResponse {
    #[serde(default)]
    projects: Vec<SyncProject>,
    #[serde(default)]
    items: Vec<SyncItem>,
    #[serde(default)]
    labels: Vec<SyncLabel>,
    #[serde(default)]
    user: Option<SyncUser>,
}

#[derive(Debug, Deserialize)]
struct SyncProject {
    id: String,
    name: String,
    #[serde(default)]
    is_archived: bool,
    #[serde(default)]
    is_deleted: bool,
}

#[derive(Debug, Deserialize)]
struct SyncItem {
    id: String,
    project_id: String,
    #[serde(default)]
    parent_id: Option<String>,
    content: String,
    #[serde(default)]
    child_order: i64,
    #[serde(default)]
    checked: bool,
    #[serde(default)]
    is_deleted: bool,
    #[serde(default)]
    due: Option<Due>,
    #[serde(default)]
    labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SyncLabel {
    name: String,
    #[serde(default)]
    is_deleted: bool,
}

#[derive(Debug, Deserialize)]
struct SyncUser {
    #[serde(default)]
    tz_info: Option<TzInfo>,
}

#[derive(Debug, Deserialize)]
struct TzInfo {
    timezone: String,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    sync_status: HashMap<String, Value>,
}

impl SyncResponse {
    fn into_snapshot(self) -> Snapshot {
        let projects = self
            .projects
            .into_iter()
            .filter(|p| !p.is_deleted)
            .map(|p| Project {
                id: ProjectId(p.id),
                name: p.name,
                is_archived: p.is_archived,
            })
            .collect();
        let tasks = self
            .items
            .into_iter()
            .filter(|i| !i.is_deleted)
            .map(|i| Task {
                id: TaskId(i.id),
                project_id: ProjectId(i.project_id),
                parent_id: i.parent_id.map(TaskId),
                content: i.content,
                child_order: i.child_order,
                completed: i.checked,
                due: i.due,
                labels: i.labels.into_iter().map(LabelId).collect(),
            })
            .collect();
        let labels = self
            .labels
            .into_iter()
            .filter(|l| !l.is_deleted)
            .map(|l| Label {
                id: LabelId(l.name.clone()),
                name: l.name,
            })
            .collect();
        Snapshot {
            timezone: self.user.and_then(|u| u.tz_info).map(|tz| tz.timezone),
            projects,
            tasks,
            labels,
        }
    }
}
