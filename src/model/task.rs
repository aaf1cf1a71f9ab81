use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }
    };
}

string_id!(
    /// Store-assigned task identifier
    TaskId
);
string_id!(
    /// Store-assigned project identifier
    ProjectId
);
string_id!(
    /// Label identifier. The Todoist backend uses the label name here.
    LabelId
);

/// A project as reported by the task store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    /// Raw name; trailing whitespace is insignificant
    pub name: String,
    #[serde(default)]
    pub is_archived: bool,
}

/// Due-date descriptor attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Due {
    /// `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS` or the same with a trailing `Z`.
    /// Absent when the due date was staged locally as a free-text string.
    #[serde(default)]
    pub date: Option<String>,
    /// Explicit IANA zone; None means "the user's zone"
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    /// Human expression the date was derived from (`every monday`, `today`)
    #[serde(default)]
    pub string: Option<String>,
}

impl Due {
    /// A due descriptor known only by its free-text expression
    pub fn from_string(expr: &str) -> Self {
        Due {
            date: None,
            timezone: None,
            is_recurring: false,
            string: Some(expr.to_string()),
        }
    }
}

/// A single task node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    /// None for top-level tasks
    #[serde(default)]
    pub parent_id: Option<TaskId>,
    /// Display content, including any modifier markers
    pub content: String,
    /// Sibling order key
    #[serde(default)]
    pub child_order: i64,
    #[serde(default, alias = "checked")]
    pub completed: bool,
    #[serde(default)]
    pub due: Option<Due>,
    #[serde(default)]
    pub labels: Vec<LabelId>,
}

impl Task {
    pub fn new(id: &str, project_id: &str, content: &str) -> Self {
        Task {
            id: TaskId::new(id),
            project_id: ProjectId::new(project_id),
            parent_id: None,
            content: content.to_string(),
            child_order: 0,
            completed: false,
            due: None,
            labels: Vec::new(),
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.due.as_ref().is_some_and(|d| d.is_recurring)
    }

    pub fn has_label(&self, label: &LabelId) -> bool {
        self.labels.contains(label)
    }

    pub fn has_any_label(&self, labels: &[LabelId]) -> bool {
        labels.iter().any(|l| self.has_label(l))
    }
}

/// A label definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
}

/// Full pull of the task store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The account's zone, used for due dates without an explicit zone
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl Snapshot {
    /// Tasks belonging to the given project, in store order
    pub fn project_tasks(&self, project: &ProjectId) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| &t.project_id == project)
            .cloned()
            .collect()
    }

    pub fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| &t.id == id)
    }
}
